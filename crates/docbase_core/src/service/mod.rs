//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate form validation and repository calls into use-case APIs.
//! - Keep web/API layers decoupled from storage details.

pub mod source_service;
