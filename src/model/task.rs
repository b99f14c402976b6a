//! Task rows and write payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{Priority, TaskStatus};

/// Opaque task identifier assigned by the row-store.
pub type TaskId = String;

/// A row of the `tasks` relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier. Never changes.
    pub id: TaskId,
    /// Owner. Never changes.
    pub user_id: String,
    /// Non-empty title.
    pub title: String,
    /// Optional details.
    #[serde(default)]
    pub description: Option<String>,
    /// Current status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: Priority,
    /// Deadline, if any.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Creation time, set by the store.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last write time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Owner of the new task.
    pub user_id: String,
    /// Non-empty title.
    pub title: String,
    /// Optional details; `None` when the form field was empty.
    pub description: Option<String>,
    /// Chosen priority.
    pub priority: Priority,
    /// Always [`TaskStatus::Pending`] for tasks built by the create form.
    pub status: TaskStatus,
    /// Combined date and time, if a date was chosen.
    pub due_date: Option<DateTime<Utc>>,
}

/// Full-field update payload produced by the edit dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChanges {
    /// New title.
    pub title: String,
    /// New description.
    pub description: Option<String>,
    /// New priority.
    pub priority: Priority,
    /// New status.
    pub status: TaskStatus,
    /// New deadline; `None` clears it.
    pub due_date: Option<DateTime<Utc>>,
    /// Refreshed write time.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Applies an update payload in place, leaving `id` and `user_id` alone.
    pub fn apply(&mut self, changes: &TaskChanges) {
        self.title.clone_from(&changes.title);
        self.description.clone_from(&changes.description);
        self.priority = changes.priority;
        self.status = changes.status;
        self.due_date = changes.due_date;
        self.updated_at = Some(changes.updated_at);
    }
}
