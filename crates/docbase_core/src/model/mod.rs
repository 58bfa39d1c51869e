//! Domain model for source provenance records.
//!
//! # Responsibility
//! - Define the canonical source record and its API projection.
//! - Validate caller-supplied form input before it reaches persistence.
//!
//! # Invariants
//! - Every source carries a unique, non-empty `foreign_id`.
//! - User membership is a set; duplicates never survive validation.

pub mod forms;
pub mod source;
