//! Row-store port for the hosted `tasks` and `profiles` relations.

use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::model::{NewTask, Priority, Profile, Task, TaskChanges, TaskId, TaskStatus};

/// Boxed future type alias used by [`RowStore`] to keep the trait dyn-compatible.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Row ordering applied to every task read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueOrder {
    /// Earliest deadline first; tasks without a deadline last.
    #[default]
    AscendingNullsLast,
}

impl DueOrder {
    /// Compares two tasks under this ordering.
    #[must_use]
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::AscendingNullsLast => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

/// Read description for the `tasks` relation.
///
/// Every bound is a plain predicate the store can evaluate; the filter
/// state decides which ones are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Owner equality. Always present.
    pub user_id: String,
    /// `status = ?`
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// `priority = ?`
    #[serde(default)]
    pub priority: Option<Priority>,
    /// `due_date >= ?`
    #[serde(default)]
    pub due_from: Option<DateTime<Utc>>,
    /// `due_date < ?`
    #[serde(default)]
    pub due_before: Option<DateTime<Utc>>,
    /// `status != ?`
    #[serde(default)]
    pub exclude_status: Option<TaskStatus>,
    /// Result ordering.
    #[serde(default)]
    pub order: DueOrder,
}

impl TaskQuery {
    /// All tasks owned by `user_id`.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            status: None,
            priority: None,
            due_from: None,
            due_before: None,
            exclude_status: None,
            order: DueOrder::default(),
        }
    }

    /// Evaluates the predicates against a row.
    ///
    /// Range bounds follow SQL semantics: a task with no due date never
    /// satisfies a bound on the due date.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if task.user_id != self.user_id {
            return false;
        }
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if self.exclude_status.is_some_and(|s| s == task.status) {
            return false;
        }
        if let Some(from) = self.due_from {
            if task.due_date.is_none_or(|due| due < from) {
                return false;
            }
        }
        if let Some(before) = self.due_before {
            if task.due_date.is_none_or(|due| due >= before) {
                return false;
            }
        }
        true
    }

    /// Sorts rows the way the store would return them.
    pub fn sort(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| self.order.compare(a, b));
    }
}

/// Kind of row change carried by a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

/// Notification that a watched task row changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// The affected row.
    pub task_id: TaskId,
}

/// Standing subscription to change events for one user's tasks.
///
/// Dropping the feed (or calling [`ChangeFeed::close`]) releases the
/// server-side subscription.
pub struct ChangeFeed {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl ChangeFeed {
    /// Wraps an event channel; `on_close` runs exactly once when the feed is released.
    pub fn new(
        events: mpsc::UnboundedReceiver<ChangeEvent>,
        on_close: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self { events, on_close: Some(Box::new(on_close)) }
    }

    /// A feed that never delivers an event.
    #[must_use]
    pub fn idle() -> Self {
        let (_tx, events) = mpsc::unbounded_channel();
        Self { events, on_close: None }
    }

    /// Waits for the next event. Returns `None` once the source has gone away.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Releases the subscription.
    pub fn close(self) {}
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
    }
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed").field("open", &self.on_close.is_some()).finish()
    }
}

/// Query, mutation and change notification over the hosted relations.
///
/// Abstracting the row-store allows the task list to run against the live
/// HTTP backend, an in-memory store, or a recorded cassette.
pub trait RowStore: Send + Sync {
    /// Selects the tasks matching `query`, ordered as `query.order` says.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the read.
    fn select_tasks(&self, query: &TaskQuery) -> StoreFuture<'_, Vec<Task>>;

    /// Inserts a task and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the insert.
    fn insert_task(&self, task: &NewTask) -> StoreFuture<'_, Task>;

    /// Overwrites the editable fields of a task and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not exist or the store rejects the write.
    fn update_task(&self, id: &str, changes: &TaskChanges) -> StoreFuture<'_, Task>;

    /// Sets only the status (and write time) of a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not exist or the store rejects the write.
    fn set_task_status(
        &self,
        id: &str,
        status: TaskStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()>;

    /// Deletes a task by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    fn delete_task(&self, id: &str) -> StoreFuture<'_, ()>;

    /// Opens a change subscription for the tasks owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    fn subscribe(&self, user_id: &str) -> StoreFuture<'_, ChangeFeed>;

    /// Loads a profile row, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the read.
    fn select_profile(&self, id: &str) -> StoreFuture<'_, Option<Profile>>;

    /// Inserts or replaces a profile row keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    fn upsert_profile(&self, profile: &Profile) -> StoreFuture<'_, Profile>;

    /// Sets the bearer token used for subsequent requests.
    ///
    /// Stores without per-user authorization ignore it.
    fn set_access_token(&self, _token: Option<String>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(id: &str, status: TaskStatus, due: Option<DateTime<Utc>>) -> Task {
        Task {
            id: id.into(),
            user_id: "u1".into(),
            title: id.into(),
            description: None,
            status,
            priority: Priority::Medium,
            due_date: due,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn sort_puts_missing_due_dates_last() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let mut tasks = vec![
            task("none", TaskStatus::Pending, None),
            task("late", TaskStatus::Pending, Some(late)),
            task("early", TaskStatus::Pending, Some(early)),
        ];
        TaskQuery::for_user("u1").sort(&mut tasks);
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["early", "late", "none"]);
    }

    #[test]
    fn range_bounds_exclude_tasks_without_due_date() {
        let mut query = TaskQuery::for_user("u1");
        query.due_before = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(!query.matches(&task("none", TaskStatus::Pending, None)));
    }

    #[test]
    fn matches_checks_owner_and_exclusion() {
        let mut query = TaskQuery::for_user("u1");
        query.exclude_status = Some(TaskStatus::Completed);
        assert!(query.matches(&task("a", TaskStatus::Pending, None)));
        assert!(!query.matches(&task("b", TaskStatus::Completed, None)));

        let mut other = task("c", TaskStatus::Pending, None);
        other.user_id = "u2".into();
        assert!(!query.matches(&other));
    }

    #[tokio::test]
    async fn feed_runs_close_hook_once_on_drop() {
        use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
        use std::sync::Arc;

        let closed = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let hook = Arc::clone(&closed);
        let mut feed = ChangeFeed::new(rx, move || {
            hook.fetch_add(1, AtomicOrdering::SeqCst);
        });

        tx.send(ChangeEvent { kind: ChangeKind::Insert, task_id: "t1".into() }).unwrap();
        let event = feed.next().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);

        feed.close();
        assert_eq!(closed.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn idle_feed_ends_immediately() {
        let mut feed = ChangeFeed::idle();
        assert!(feed.next().await.is_none());
    }
}
