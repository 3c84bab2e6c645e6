//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation and repository calls into use-case APIs.
//! - Keep the shell decoupled from storage details.

pub mod task_service;
