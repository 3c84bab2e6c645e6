//! Task domain model.
//!
//! # Responsibility
//! - Define the task record, its identifier and enumerations.
//! - Define the plain-data requests the shell sends to the service.
//!
//! # Invariants
//! - `id` is a time-ordered UUID and never changes after creation.
//! - `created_at <= modified_at`.
//! - Timestamps carry millisecond precision, matching storage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a new UUIDv7 so ids sort roughly by creation time.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

/// Task lifecycle state. Both states are reachable from each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    Done,
}

impl TaskStatus {
    pub const fn all() -> &'static [TaskStatus] {
        &[Self::Todo, Self::Done]
    }

    /// Storage and wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Done => "done",
        }
    }

    /// Label shown by the shell.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Done => "DONE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Task priority. `None` means "no priority set", not absence of a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub const fn all() -> &'static [TaskPriority] {
        &[Self::None, Self::Low, Self::Medium, Self::High]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Trimmed, 3..=250 characters.
    pub title: String,
    pub description: Option<String>,
    /// Ordered, de-duplicated labels.
    pub tags: Vec<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update input. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// `Some("")` clears the description.
    #[serde(default)]
    pub description: Option<String>,
    /// `Some(vec![])` clears all tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Truncates a timestamp to whole milliseconds, the storage precision.
pub fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    let sub_millis = i64::from(value.timestamp_subsec_nanos() % 1_000_000);
    value - Duration::nanoseconds(sub_millis)
}

/// Current time at storage precision.
pub fn now_millis() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}
