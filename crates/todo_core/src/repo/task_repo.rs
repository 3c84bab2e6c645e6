//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed CRUD over the `tasks` table.
//! - Turn "no row matched" into `NotFound` by checking affected rows.
//! - Honour the caller's cancellation context on every statement.
//!
//! # Invariants
//! - Every successful mutation touches exactly one row.
//! - `update` stamps `modified_at` with the write-time clock, strictly
//!   after the stored value; the caller's `modified_at` is ignored.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::context::{ContextError, OpContext};
use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::task::{now_millis, Task, TaskId, TaskPriority, TaskStatus};
use crate::validation::TAG_DELIMITER;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    tags,
    status,
    priority,
    due_date,
    created_at,
    modified_at
FROM tasks";

/// SQLite VM instructions between two context checks.
const PROGRESS_CHECK_OPS: i32 = 1_000;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    NotFound(TaskId),
    Db(DbError),
    InvalidData(String),
    Cancelled,
    TimedOut,
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::Cancelled => write!(f, "task store operation cancelled"),
            Self::TimedOut => write!(f, "task store operation timed out"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "task repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "task repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ContextError> for RepoError {
    fn from(value: ContextError) -> Self {
        match value {
            ContextError::Cancelled => Self::Cancelled,
            ContextError::DeadlineExceeded => Self::TimedOut,
        }
    }
}

/// Repository interface for task CRUD operations.
pub trait TaskRepository {
    /// All tasks in stable store order; empty store yields an empty vector.
    fn get_all(&self, ctx: &OpContext) -> RepoResult<Vec<Task>>;
    fn get_by_id(&self, ctx: &OpContext, id: TaskId) -> RepoResult<Task>;
    /// Inserts the fully populated record as given.
    fn create(&self, ctx: &OpContext, task: &Task) -> RepoResult<Task>;
    /// Replaces every mutable column of the row keyed by `task.id` and
    /// returns the row as stored, with a fresh `modified_at`.
    fn update(&self, ctx: &OpContext, task: &Task) -> RepoResult<Task>;
    fn delete(&self, ctx: &OpContext, id: TaskId) -> RepoResult<()>;
}

/// SQLite-backed task repository over an injected connection.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// Rejects connections whose schema is behind this binary or that lack
    /// the `tasks` table.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_version(conn)?;
        if actual_version < expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let has_tasks: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'tasks'
            );",
            [],
            |row| row.get(0),
        )?;
        if !has_tasks {
            return Err(RepoError::MissingRequiredTable("tasks"));
        }

        Ok(Self { conn })
    }

    /// Runs `op` while an SQLite progress handler watches `ctx`.
    ///
    /// A failure observed after the context stopped is reported as the
    /// context outcome, since SQLite only sees an interrupt.
    fn guarded<T>(
        &self,
        ctx: &OpContext,
        op: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        ctx.check()?;

        let watched = ctx.clone();
        self.conn
            .progress_handler(PROGRESS_CHECK_OPS, Some(move || watched.check().is_err()));
        let result = op(self.conn);
        self.conn.progress_handler(0, None::<fn() -> bool>);

        match result {
            Err(RepoError::Db(err)) => match ctx.check() {
                Err(stopped) => Err(stopped.into()),
                Ok(()) => Err(RepoError::Db(err)),
            },
            other => other,
        }
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn get_all(&self, ctx: &OpContext) -> RepoResult<Vec<Task>> {
        self.guarded(ctx, |conn| {
            let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} ORDER BY id ASC;"))?;
            let mut rows = stmt.query([])?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                tasks.push(parse_task_row(row)?);
            }
            Ok(tasks)
        })
    }

    fn get_by_id(&self, ctx: &OpContext, id: TaskId) -> RepoResult<Task> {
        self.guarded(ctx, |conn| {
            let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id.to_string()])?;
            if let Some(row) = rows.next()? {
                return parse_task_row(row);
            }
            Err(RepoError::NotFound(id))
        })
    }

    fn create(&self, ctx: &OpContext, task: &Task) -> RepoResult<Task> {
        self.guarded(ctx, |conn| {
            conn.execute(
                "INSERT INTO tasks (
                    id,
                    title,
                    description,
                    tags,
                    status,
                    priority,
                    due_date,
                    created_at,
                    modified_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    task.id.to_string(),
                    task.title.as_str(),
                    task.description.as_deref(),
                    encode_tags(&task.tags),
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.due_date.map(|value| value.timestamp_millis()),
                    task.created_at.timestamp_millis(),
                    task.modified_at.timestamp_millis(),
                ],
            )?;
            Ok(task.clone())
        })
    }

    fn update(&self, ctx: &OpContext, task: &Task) -> RepoResult<Task> {
        self.guarded(ctx, |conn| {
            let stamped = conn
                .query_row(
                    "UPDATE tasks
                     SET
                        title = ?1,
                        description = ?2,
                        tags = ?3,
                        status = ?4,
                        priority = ?5,
                        due_date = ?6,
                        modified_at = MAX(?7, modified_at + 1)
                     WHERE id = ?8
                     RETURNING created_at, modified_at;",
                    params![
                        task.title.as_str(),
                        task.description.as_deref(),
                        encode_tags(&task.tags),
                        task.status.as_str(),
                        task.priority.as_str(),
                        task.due_date.map(|value| value.timestamp_millis()),
                        now_millis().timestamp_millis(),
                        task.id.to_string(),
                    ],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;

            let Some((created_at, modified_at)) = stamped else {
                return Err(RepoError::NotFound(task.id));
            };

            let mut written = task.clone();
            written.created_at = millis_to_datetime(created_at, "created_at")?;
            written.modified_at = millis_to_datetime(modified_at, "modified_at")?;
            Ok(written)
        })
    }

    fn delete(&self, ctx: &OpContext, id: TaskId) -> RepoResult<()> {
        self.guarded(ctx, |conn| {
            let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok(())
        })
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let id = id_text.parse::<TaskId>().map_err(|_| {
        RepoError::InvalidData(format!("invalid id value `{id_text}` in tasks.id"))
    })?;

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;

    let due_date = row
        .get::<_, Option<i64>>("due_date")?
        .map(|millis| millis_to_datetime(millis, "due_date"))
        .transpose()?;
    let created_at = millis_to_datetime(row.get("created_at")?, "created_at")?;
    let modified_at = millis_to_datetime(row.get("modified_at")?, "modified_at")?;
    if created_at > modified_at {
        return Err(RepoError::InvalidData(format!(
            "task {id} has created_at after modified_at"
        )));
    }

    Ok(Task {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        tags: decode_tags(row.get::<_, Option<String>>("tags")?.as_deref()),
        status,
        priority,
        due_date,
        created_at,
        modified_at,
    })
}

fn millis_to_datetime(millis: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{millis}` in tasks.{column}"))
    })
}

fn encode_tags(tags: &[String]) -> String {
    tags.join(TAG_DELIMITER)
}

fn decode_tags(value: Option<&str>) -> Vec<String> {
    match value {
        Some(text) if !text.is_empty() => text.split(TAG_DELIMITER).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}
