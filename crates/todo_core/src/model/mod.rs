//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and the requests that mutate it.
//!
//! # Invariants
//! - Status and priority values are enum variants by construction.

pub mod task;
