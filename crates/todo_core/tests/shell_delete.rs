use std::cell::Cell;
use todo_core::db::open_db_in_memory;
use todo_core::{
    ConfirmPrompt, CreateTaskRequest, DeleteOutcome, ErrorKind, OpContext, PromptError,
    SqliteTaskRepository, Task, TaskService, TaskShell,
};

/// Scripted answer plus a record of how often the user was asked.
struct ScriptedPrompt {
    answer: Result<bool, PromptError>,
    asked: Cell<usize>,
}

impl ScriptedPrompt {
    fn new(answer: Result<bool, PromptError>) -> Self {
        Self {
            answer,
            asked: Cell::new(0),
        }
    }
}

impl ConfirmPrompt for ScriptedPrompt {
    fn confirm_delete(&self, _task: &Task) -> Result<bool, PromptError> {
        self.asked.set(self.asked.get() + 1);
        self.answer.clone()
    }
}

fn create_task(shell: &TaskShell<SqliteTaskRepository<'_>, ScriptedPrompt>) -> Task {
    shell
        .create_task(
            &OpContext::background(),
            CreateTaskRequest {
                title: "Clean garage".to_string(),
                ..CreateTaskRequest::default()
            },
        )
        .unwrap()
}

#[test]
fn confirmed_delete_removes_task() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let shell = TaskShell::new(service, ScriptedPrompt::new(Ok(true)));
    let ctx = OpContext::background();
    let task = create_task(&shell);
    let id = task.id.to_string();

    assert_eq!(shell.delete_task(&ctx, &id).unwrap(), DeleteOutcome::Deleted);

    let err = shell.get_task(&ctx, &id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn declined_delete_keeps_task() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let shell = TaskShell::new(service, ScriptedPrompt::new(Ok(false)));
    let ctx = OpContext::background();
    let task = create_task(&shell);

    let outcome = shell.delete_task(&ctx, &task.id.to_string()).unwrap();

    assert_eq!(outcome, DeleteOutcome::Declined);
    assert_eq!(shell.get_all_tasks(&ctx).unwrap(), vec![task]);
}

#[test]
fn failed_prompt_counts_as_declined() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let prompt = ScriptedPrompt::new(Err(PromptError("terminal closed".to_string())));
    let shell = TaskShell::new(service, prompt);
    let ctx = OpContext::background();
    let task = create_task(&shell);

    let outcome = shell.delete_task(&ctx, &task.id.to_string()).unwrap();

    assert_eq!(outcome, DeleteOutcome::Declined);
    assert_eq!(shell.get_all_tasks(&ctx).unwrap().len(), 1);
}

#[test]
fn delete_of_missing_task_fails_without_prompting() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteTaskRepository::try_new(&conn).unwrap());
    let shell = TaskShell::new(service, ScriptedPrompt::new(Ok(true)));

    let err = shell
        .delete_task(
            &OpContext::background(),
            "00000000-0000-7000-8000-000000000000",
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(shell_prompt_calls(&shell), 0);
}

fn shell_prompt_calls(shell: &TaskShell<SqliteTaskRepository<'_>, ScriptedPrompt>) -> usize {
    shell.prompt().asked.get()
}
