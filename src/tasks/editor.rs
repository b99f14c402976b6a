//! Create form and edit dialog state.
//!
//! Both surfaces hold raw field values the way a user typed them and turn
//! them into write payloads only on submit. Submission is guarded so one
//! form instance never has two requests in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use super::due;
use crate::error::TaskError;
use crate::model::{NewTask, Priority, Task, TaskChanges, TaskId, TaskStatus};
use crate::ports::LocalZone;

/// Shared "request in flight" flag for one form instance.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    /// Marks a submission as started.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Busy`] if a submission is already running.
    pub fn begin(&self) -> Result<SubmitGuard, TaskError> {
        if self.0.swap(true, Ordering::AcqRel) {
            return Err(TaskError::Busy);
        }
        Ok(SubmitGuard(Arc::clone(&self.0)))
    }

    /// Whether a submission is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag when dropped.
#[derive(Debug)]
pub struct SubmitGuard(Arc<AtomicBool>);

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Validation message for a blank title.
pub const TITLE_REQUIRED: &str = "Please enter a task title";

fn require_title(title: &str) -> Result<(), TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::Validation(TITLE_REQUIRED.to_string()));
    }
    Ok(())
}

fn optional_text(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Fields of the "new task" form.
#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    /// Title as typed.
    pub title: String,
    /// Description as typed; empty means none.
    pub description: String,
    /// Chosen priority, medium by default.
    pub priority: Priority,
    /// Chosen due date.
    pub date: Option<NaiveDate>,
    /// Time field as typed (`HH:MM`); empty means midnight.
    pub time: String,
    in_flight: InFlight,
}

impl TaskForm {
    /// An empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every field back to its default.
    pub fn reset(&mut self) {
        self.title.clear();
        self.description.clear();
        self.priority = Priority::default();
        self.date = None;
        self.time.clear();
    }

    /// Whether a submission is running.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_active()
    }

    /// Starts a submission.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Busy`] while another submission is in flight.
    pub fn begin_submit(&self) -> Result<SubmitGuard, TaskError> {
        self.in_flight.begin()
    }

    /// Builds the insert payload. New tasks always start pending.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] for a blank title or malformed time.
    pub fn to_new_task(&self, user_id: &str, zone: LocalZone) -> Result<NewTask, TaskError> {
        require_title(&self.title)?;
        let time = due::parse_time(&self.time)?;
        Ok(NewTask {
            user_id: user_id.to_string(),
            title: self.title.clone(),
            description: optional_text(&self.description),
            priority: self.priority,
            status: TaskStatus::Pending,
            due_date: due::combine(self.date, time, zone),
        })
    }
}

/// Fields of the "edit task" dialog.
#[derive(Debug, Clone, Default)]
pub struct TaskEditor {
    task_id: Option<TaskId>,
    /// Title as typed.
    pub title: String,
    /// Description as typed; empty means none.
    pub description: String,
    /// Chosen priority.
    pub priority: Priority,
    /// Chosen status.
    pub status: TaskStatus,
    /// Chosen due date.
    pub date: Option<NaiveDate>,
    /// Time field as typed (`HH:MM`).
    pub time: String,
    in_flight: InFlight,
}

impl TaskEditor {
    /// Opens the dialog pre-populated from `task`.
    ///
    /// An existing deadline is split into its local date and `HH:MM` time.
    #[must_use]
    pub fn open(task: &Task, zone: LocalZone) -> Self {
        let mut editor = Self::default();
        editor.load(task, zone);
        editor
    }

    /// Replaces the dialog contents with `task`.
    pub fn load(&mut self, task: &Task, zone: LocalZone) {
        self.task_id = Some(task.id.clone());
        self.title.clone_from(&task.title);
        self.description = task.description.clone().unwrap_or_default();
        self.priority = task.priority;
        self.status = task.status;
        match task.due_date {
            Some(due) => {
                let (date, time) = due::split(due, zone);
                self.date = Some(date);
                self.time = time;
            }
            None => {
                self.date = None;
                self.time.clear();
            }
        }
    }

    /// The task being edited, while the dialog is open.
    #[must_use]
    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    /// Whether the dialog is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.task_id.is_some()
    }

    /// Closes the dialog.
    pub fn close(&mut self) {
        self.task_id = None;
    }

    /// Whether a submission is running.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_active()
    }

    /// Starts a submission.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Busy`] while another submission is in flight.
    pub fn begin_submit(&self) -> Result<SubmitGuard, TaskError> {
        self.in_flight.begin()
    }

    /// Builds the full-field update payload, stamped with `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] for a blank title or malformed time,
    /// and [`TaskError::NotFound`] if the dialog is not open.
    pub fn to_changes(
        &self,
        now: DateTime<Utc>,
        zone: LocalZone,
    ) -> Result<(TaskId, TaskChanges), TaskError> {
        require_title(&self.title)?;
        let id = self.task_id.clone().ok_or_else(|| TaskError::NotFound("<none>".to_string()))?;
        let time = due::parse_time(&self.time)?;
        Ok((
            id,
            TaskChanges {
                title: self.title.clone(),
                description: optional_text(&self.description),
                priority: self.priority,
                status: self.status,
                due_date: due::combine(self.date, time, zone),
                updated_at: now,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> LocalZone {
        LocalZone::utc()
    }

    fn sample_task() -> Task {
        Task {
            id: "t-9".into(),
            user_id: "u1".into(),
            title: "Water plants".into(),
            description: None,
            status: TaskStatus::InProgress,
            priority: Priority::High,
            due_date: Some(Utc.with_ymd_and_hms(2025, 7, 4, 18, 15, 0).unwrap()),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn blank_titles_are_rejected() {
        let mut form = TaskForm::new();
        for title in ["", "   ", "\t\n"] {
            form.title = title.to_string();
            assert!(matches!(form.to_new_task("u1", utc()), Err(TaskError::Validation(_))));
        }
    }

    #[test]
    fn new_task_defaults() {
        let mut form = TaskForm::new();
        form.title = "Buy milk".into();
        let task = form.to_new_task("u1", utc()).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.description, None);
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn new_task_combines_date_and_time() {
        let mut form = TaskForm::new();
        form.title = "Call".into();
        form.date = NaiveDate::from_ymd_opt(2025, 3, 3);
        form.time = "08:20".into();
        let task = form.to_new_task("u1", utc()).unwrap();
        assert_eq!(task.due_date, Some(Utc.with_ymd_and_hms(2025, 3, 3, 8, 20, 0).unwrap()));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut form = TaskForm::new();
        form.title = "x".into();
        form.description = "y".into();
        form.priority = Priority::High;
        form.date = NaiveDate::from_ymd_opt(2025, 1, 1);
        form.time = "10:00".into();
        form.reset();
        assert!(form.title.is_empty());
        assert!(form.description.is_empty());
        assert_eq!(form.priority, Priority::Medium);
        assert!(form.date.is_none());
        assert!(form.time.is_empty());
    }

    #[test]
    fn second_submit_is_busy_until_guard_drops() {
        let form = TaskForm::new();
        let guard = form.begin_submit().unwrap();
        assert!(form.is_submitting());
        assert!(matches!(form.begin_submit(), Err(TaskError::Busy)));
        drop(guard);
        assert!(!form.is_submitting());
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn editor_prepopulates_and_splits_due_date() {
        let editor = TaskEditor::open(&sample_task(), utc());
        assert_eq!(editor.task_id(), Some("t-9"));
        assert_eq!(editor.title, "Water plants");
        assert_eq!(editor.description, "");
        assert_eq!(editor.status, TaskStatus::InProgress);
        assert_eq!(editor.date, NaiveDate::from_ymd_opt(2025, 7, 4));
        assert_eq!(editor.time, "18:15");
    }

    #[test]
    fn editor_changes_carry_every_field() {
        let mut editor = TaskEditor::open(&sample_task(), utc());
        editor.description = "twice".into();
        editor.time = String::new();
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        let (id, changes) = editor.to_changes(now, utc()).unwrap();
        assert_eq!(id, "t-9");
        assert_eq!(changes.description.as_deref(), Some("twice"));
        assert_eq!(changes.due_date, Some(Utc.with_ymd_and_hms(2025, 7, 4, 0, 0, 0).unwrap()));
        assert_eq!(changes.updated_at, now);
    }

    #[test]
    fn closed_editor_cannot_submit() {
        let mut editor = TaskEditor::open(&sample_task(), utc());
        editor.close();
        assert!(!editor.is_open());
        let now = Utc::now();
        assert!(matches!(editor.to_changes(now, utc()), Err(TaskError::NotFound(_))));
    }
}
