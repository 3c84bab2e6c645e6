//! Shell-facing facade over the task service.
//!
//! # Responsibility
//! - Give the UI shell plain-data entry points for every task use-case.
//! - Ask the user before a destructive delete.
//!
//! # Invariants
//! - `delete_task` only reaches the service after an explicit "yes".
//! - A declined or failed prompt is an outcome, never an error.

use crate::context::OpContext;
use crate::error::ServiceResult;
use crate::model::task::{CreateTaskRequest, Task, UpdateTaskRequest};
use crate::repo::task_repo::TaskRepository;
use crate::service::task_service::TaskService;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure to show or read the confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptError(pub String);

impl Display for PromptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "confirmation prompt failed: {}", self.0)
    }
}

impl Error for PromptError {}

/// Yes/no question shown before deleting a task.
pub trait ConfirmPrompt {
    /// `Ok(true)` only on an explicit affirmative answer.
    fn confirm_delete(&self, task: &Task) -> Result<bool, PromptError>;
}

/// What happened to a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

pub struct TaskShell<R: TaskRepository, P: ConfirmPrompt> {
    service: TaskService<R>,
    prompt: P,
}

impl<R: TaskRepository, P: ConfirmPrompt> TaskShell<R, P> {
    pub fn new(service: TaskService<R>, prompt: P) -> Self {
        Self { service, prompt }
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn get_all_tasks(&self, ctx: &OpContext) -> ServiceResult<Vec<Task>> {
        self.service.get_all(ctx)
    }

    pub fn get_task(&self, ctx: &OpContext, id: &str) -> ServiceResult<Task> {
        self.service.get_by_id(ctx, id)
    }

    pub fn create_task(&self, ctx: &OpContext, request: CreateTaskRequest) -> ServiceResult<Task> {
        self.service.create(ctx, request)
    }

    pub fn update_task(&self, ctx: &OpContext, request: UpdateTaskRequest) -> ServiceResult<Task> {
        self.service.update(ctx, request)
    }

    /// Deletes after confirmation; anything but "yes" counts as "no".
    pub fn delete_task(&self, ctx: &OpContext, id: &str) -> ServiceResult<DeleteOutcome> {
        let task = self.service.get_by_id(ctx, id)?;

        let confirmed = match self.prompt.confirm_delete(&task) {
            Ok(answer) => answer,
            Err(err) => {
                warn!("event=delete_confirm module=shell status=error error={err}");
                false
            }
        };
        if !confirmed {
            info!("event=delete_confirm module=shell status=declined");
            return Ok(DeleteOutcome::Declined);
        }

        self.service.delete(ctx, id)?;
        Ok(DeleteOutcome::Deleted)
    }
}
