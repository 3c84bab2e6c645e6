//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the task data access contract.
//! - Isolate SQLite query details from the domain service.
//!
//! # Invariants
//! - Repository errors are either `NotFound`, a context outcome, or an
//!   unclassified store error. Classification happens in the service.

pub mod task_repo;
