use std::{
    fmt::{self, Display},
    num::ParseIntError,
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Full-replace payload carrying forward every mutable field, used to
    /// turn a single-field change into the update the remote service expects.
    pub fn as_draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            priority: self.priority.clone(),
            deadline: self.deadline,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for i64 {
    fn from(task_id: TaskId) -> Self {
        task_id.0
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Ok(Self(id.parse()?))
    }
}

/// Task statuses as stored by the remote service. Values are canonicalized
/// to lowercase; anything outside the known set is kept as `Other` so that
/// decoding and list derivation stay total.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Other(value) => value,
        }
    }

    pub fn is_completed(&self) -> bool {
        *self == TaskStatus::Completed
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl From<&str> for TaskStatus {
    fn from(value: &str) -> Self {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "todo" => TaskStatus::Todo,
            // The web client historically sent "in progress" with a space
            "in_progress" | "in progress" => TaskStatus::InProgress,
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Other(normalized),
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(TaskStatus::from(value.as_str()))
    }
}

/// Task priorities, highest urgency first. Same canonicalization rules as
/// `TaskStatus`.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum TaskPriority {
    Urgent,
    High,
    Medium,
    Low,
    Other(String),
}

impl TaskPriority {
    pub fn as_str(&self) -> &str {
        match self {
            TaskPriority::Urgent => "urgent",
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
            TaskPriority::Other(value) => value,
        }
    }

    /// Fixed ordering rank. Unrecognized priorities sort after `Low`.
    pub fn sort_rank(&self) -> u8 {
        match self {
            TaskPriority::Urgent => 0,
            TaskPriority::High => 1,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 3,
            TaskPriority::Other(_) => u8::MAX,
        }
    }

    pub fn is_pressing(&self) -> bool {
        matches!(self, TaskPriority::Urgent | TaskPriority::High)
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl From<&str> for TaskPriority {
    fn from(value: &str) -> Self {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "urgent" => TaskPriority::Urgent,
            "high" => TaskPriority::High,
            "medium" => TaskPriority::Medium,
            "low" => TaskPriority::Low,
            _ => TaskPriority::Other(normalized),
        }
    }
}

impl Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for TaskPriority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskPriority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(TaskPriority::from(value.as_str()))
    }
}

/// Input payload for task creation and full-replace updates. Server-assigned
/// fields (`id`, `created_at`) are absent.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default, Validate)]
pub struct TaskDraft {
    #[validate(length(min = 1, message = "Task title must not be empty"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn try_new(title: String) -> Result<Self, anyhow::Error> {
        let draft = TaskDraft {
            title,
            ..Default::default()
        };

        draft.validate()?;

        Ok(draft)
    }
}
