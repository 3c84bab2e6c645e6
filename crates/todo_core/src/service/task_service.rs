//! Task use-case service.
//!
//! # Responsibility
//! - Validate requests before they reach storage.
//! - Assign identity and timestamps; apply partial-update merge rules.
//! - Translate repository failures into the service error taxonomy.
//!
//! # Invariants
//! - Invalid requests never reach the repository.
//! - `update` never writes when the fetch fails.
//! - `modified_at` is stamped by the repository at write time.
//!
//! Update is fetch-merge-write without optimistic concurrency: two
//! concurrent updates of one task race and the later write wins.

use crate::context::OpContext;
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::model::task::{
    now_millis, truncate_to_millis, CreateTaskRequest, Task, TaskId, TaskStatus,
    UpdateTaskRequest,
};
use crate::repo::task_repo::TaskRepository;
use crate::validation::{
    normalize_tags, validate_description, validate_due_date, validate_tags, validate_title,
    FieldError, ValidationErrors,
};
use log::{error, info, warn};
use std::time::{Duration, Instant};

/// Upper bound for one mutating call, relative to the caller's context.
pub const MUTATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Use-case service over an injected task repository.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Lists every stored task.
    pub fn get_all(&self, ctx: &OpContext) -> ServiceResult<Vec<Task>> {
        let started_at = Instant::now();
        let result = self.repo.get_all(ctx).map_err(ServiceError::from);
        log_outcome("task_get_all", started_at, &result);
        result
    }

    /// Gets one task by its string id.
    pub fn get_by_id(&self, ctx: &OpContext, id: &str) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let result = parse_task_id(id)
            .map_err(ServiceError::from)
            .and_then(|id| self.repo.get_by_id(ctx, id).map_err(ServiceError::from));
        log_outcome("task_get", started_at, &result);
        result
    }

    /// Validates and persists a new `todo` task.
    pub fn create(&self, ctx: &OpContext, request: CreateTaskRequest) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let result = self.create_inner(ctx, request);
        log_outcome("task_create", started_at, &result);
        result
    }

    /// Applies a partial update; absent fields keep their stored value.
    pub fn update(&self, ctx: &OpContext, request: UpdateTaskRequest) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let result = self.update_inner(ctx, request);
        log_outcome("task_update", started_at, &result);
        result
    }

    /// Deletes a task by id. Confirmation is the caller's responsibility.
    pub fn delete(&self, ctx: &OpContext, id: &str) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = parse_task_id(id)
            .map_err(ServiceError::from)
            .and_then(|id| {
                let ctx = ctx.with_timeout(MUTATION_TIMEOUT);
                self.repo.delete(&ctx, id).map_err(ServiceError::from)
            });
        log_outcome("task_delete", started_at, &result);
        result
    }

    fn create_inner(&self, ctx: &OpContext, request: CreateTaskRequest) -> ServiceResult<Task> {
        let now = now_millis();

        let mut errors = ValidationErrors::new();
        errors.record(validate_title(&request.title));
        errors.record(validate_due_date(request.due_date.as_ref(), now));
        errors.record(validate_description(request.description.as_deref()));
        errors.record(validate_tags(&request.tags));
        errors.into_result()?;

        let task = Task {
            id: TaskId::generate(),
            title: request.title.trim().to_string(),
            description: normalize_description(request.description),
            tags: normalize_tags(&request.tags),
            status: TaskStatus::Todo,
            priority: request.priority,
            due_date: request.due_date.map(truncate_to_millis),
            created_at: now,
            modified_at: now,
        };

        Ok(self.repo.create(ctx, &task)?)
    }

    fn update_inner(&self, ctx: &OpContext, request: UpdateTaskRequest) -> ServiceResult<Task> {
        let now = now_millis();

        let mut errors = ValidationErrors::new();
        let id = parse_task_id(&request.id);
        if let Err(err) = &id {
            errors.push(err.clone());
        }
        if let Some(title) = request.title.as_deref() {
            errors.record(validate_title(title));
        }
        errors.record(validate_due_date(request.due_date.as_ref(), now));
        if let Some(description) = request.description.as_deref() {
            errors.record(validate_description(Some(description)));
        }
        if let Some(tags) = request.tags.as_deref() {
            errors.record(validate_tags(tags));
        }
        errors.into_result()?;
        let id = id?;

        let ctx = ctx.with_timeout(MUTATION_TIMEOUT);
        let mut task = self.repo.get_by_id(&ctx, id)?;
        merge_update(&mut task, request);

        Ok(self.repo.update(&ctx, &task)?)
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, FieldError> {
    if raw.trim().is_empty() {
        return Err(FieldError::new("id", "must not be empty"));
    }
    raw.parse::<TaskId>()
        .map_err(|_| FieldError::new("id", "must be a valid task id"))
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|value| !value.trim().is_empty())
}

fn merge_update(task: &mut Task, request: UpdateTaskRequest) {
    if let Some(title) = request.title {
        task.title = title.trim().to_string();
    }
    if let Some(description) = request.description {
        task.description = normalize_description(Some(description));
    }
    if let Some(tags) = request.tags {
        task.tags = normalize_tags(&tags);
    }
    if let Some(status) = request.status {
        task.status = status;
    }
    if let Some(priority) = request.priority {
        task.priority = priority;
    }
    if let Some(due_date) = request.due_date {
        task.due_date = Some(truncate_to_millis(due_date));
    }
}

fn log_outcome<T>(event: &str, started_at: Instant, result: &ServiceResult<T>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!("event={event} module=service status=ok duration_ms={duration_ms}"),
        Err(err) if err.kind() == ErrorKind::Internal => error!(
            "event={event} module=service status=error duration_ms={duration_ms} error_kind={} error={err}",
            err.kind().as_str()
        ),
        Err(err) => warn!(
            "event={event} module=service status=error duration_ms={duration_ms} error_kind={}",
            err.kind().as_str()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{merge_update, parse_task_id};
    use crate::model::task::{
        now_millis, Task, TaskId, TaskPriority, TaskStatus, UpdateTaskRequest,
    };
    use chrono::Duration;

    fn sample_task() -> Task {
        let now = now_millis();
        Task {
            id: TaskId::generate(),
            title: "Water plants".to_string(),
            description: Some("balcony".to_string()),
            tags: vec!["home".to_string()],
            status: TaskStatus::Todo,
            priority: TaskPriority::Low,
            due_date: Some(now + Duration::days(3)),
            created_at: now,
            modified_at: now,
        }
    }

    #[test]
    fn parse_task_id_rejects_blank_and_garbage() {
        assert_eq!(parse_task_id("  ").unwrap_err().message, "must not be empty");
        assert_eq!(
            parse_task_id("not-a-uuid").unwrap_err().message,
            "must be a valid task id"
        );
        let id = TaskId::generate();
        assert_eq!(parse_task_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn merge_only_touches_supplied_fields() {
        let mut task = sample_task();
        let before = task.clone();

        merge_update(
            &mut task,
            UpdateTaskRequest {
                id: before.id.to_string(),
                status: Some(TaskStatus::Done),
                ..UpdateTaskRequest::default()
            },
        );

        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.title, before.title);
        assert_eq!(task.priority, before.priority);
        assert_eq!(task.due_date, before.due_date);
        assert_eq!(task.tags, before.tags);
        assert_eq!(task.description, before.description);
    }

    #[test]
    fn merge_clears_description_and_tags_when_supplied_empty() {
        let mut task = sample_task();
        merge_update(
            &mut task,
            UpdateTaskRequest {
                description: Some("   ".to_string()),
                tags: Some(Vec::new()),
                priority: Some(TaskPriority::None),
                ..UpdateTaskRequest::default()
            },
        );
        assert_eq!(task.description, None);
        assert!(task.tags.is_empty());
        assert_eq!(task.priority, TaskPriority::None);
    }
}
