//! Core domain logic for the personal task list.
//! This crate is the single source of truth for task invariants.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod shell;
pub mod validation;

pub use config::{ConfigError, StoreConfig};
pub use context::{CancelHandle, ContextError, OpContext};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::task::{
    CreateTaskRequest, Task, TaskId, TaskPriority, TaskStatus, UpdateTaskRequest,
};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use service::task_service::TaskService;
pub use shell::{ConfirmPrompt, DeleteOutcome, PromptError, TaskShell};
pub use validation::{FieldError, ValidationErrors};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
