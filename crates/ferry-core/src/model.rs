//! Canonical records.
//!
//! These are the shapes the rest of the client works with. They are produced
//! by [`crate::normalize`] from whatever the backend returned and are never
//! deserialized directly from the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend task identity.
pub type TaskId = i64;

// ─────────────────────────────────────────────────────────────────────────────
// Enumerations
// ─────────────────────────────────────────────────────────────────────────────

/// Task workflow status, in board column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Newly opened.
    Opened,
    /// Someone is working on it.
    InProgress,
    /// Waiting for review.
    Review,
    /// Done.
    Completed,
    /// Abandoned.
    Cancelled,
}

impl TaskStatus {
    /// All statuses in board column order.
    pub const ALL: [Self; 5] = [
        Self::Opened,
        Self::InProgress,
        Self::Review,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Wire representation (`OPENED`, `IN_PROGRESS`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "OPENED",
            Self::InProgress => "IN_PROGRESS",
            Self::Review => "REVIEW",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse a wire status, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|s| s.as_str() == key)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority. Canonical form is lowercase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low.
    Low,
    /// Medium (the fallback for anything unrecognized).
    #[default]
    Medium,
    /// High.
    High,
    /// Urgent.
    Urgent,
}

impl Priority {
    /// Lowercase wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

/// A checklist step on a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step identity. Negative for steps not yet confirmed by the server.
    pub id: i64,
    /// Step title.
    pub title: String,
    /// Completion flag.
    pub is_completed: bool,
}

/// A comment on a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Author display name (empty when the backend omitted it).
    pub author: String,
    /// Comment body.
    pub text: String,
    /// Creation timestamp as sent by the backend.
    pub created_at: String,
}

/// A file attached to a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFile {
    /// File identity, if the backend sent one.
    pub id: Option<i64>,
    /// Original file name.
    pub name: String,
    /// Download location, if any.
    pub url: Option<String>,
}

/// A task as shown on the board and in the detail view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identity. Negative for tasks not yet confirmed by the server.
    pub id: TaskId,
    /// Title.
    pub title: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Workflow status. `None` when the backend sent nothing recognizable.
    pub status_code: Option<TaskStatus>,
    /// Priority (defaults to medium).
    pub priority: Priority,
    /// Creation timestamp as sent by the backend.
    pub created_at: String,
    /// Ordered checklist.
    pub steps: Vec<Step>,
    /// Ordered comments.
    pub comments: Vec<Comment>,
    /// Attached files.
    pub files: Vec<TaskFile>,
}

impl Task {
    /// Status used for board placement: missing status sorts under `OPENED`.
    pub fn column(&self) -> TaskStatus {
        self.status_code.unwrap_or(TaskStatus::Opened)
    }
}

/// A department a new task can be addressed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDepartment {
    /// Department identity (never zero).
    pub id: i64,
    /// Display name (never empty).
    pub department_name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

/// A conversation partner on the contact list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact (user) identity.
    pub id: i64,
    /// Name to render: full name, else username, else `#id`.
    pub display_name: String,
    /// Login name.
    pub username: String,
    /// Unread messages from this contact.
    pub unread_count: u32,
    /// Preview of the most recent message.
    pub last_message: Option<String>,
}

/// A chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identity.
    pub id: i64,
    /// Sending user.
    pub sender_id: i64,
    /// Receiving user.
    pub receiver_id: i64,
    /// Body text.
    pub body: String,
    /// Creation timestamp; lexicographically sortable.
    pub created_at: String,
    /// Whether the receiver has read it.
    pub is_read: bool,
}

/// A user from the directory (also used for the signed-in user).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User identity.
    pub id: i64,
    /// Full name, possibly empty.
    pub full_name: String,
    /// Login name.
    pub username: String,
    /// Role label, possibly empty.
    pub role_name: String,
    /// Department label, possibly empty.
    pub department_name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
