//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for source records.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   DB transport errors.
//! - Multi-row mutations run inside a single immediate transaction.

pub mod source_repo;
