//! `taskdeck edit` command.

use super::{check, open_list, report, resolve_id, short_id};
use crate::cli::EditArgs;
use crate::context::ServiceContext;
use crate::error::TaskError;
use crate::session::SessionContext;
use crate::tasks::{due, Action, TaskEditor};

/// Execute the `edit` command.
///
/// Opens the edit dialog pre-populated from the stored task, overrides the
/// fields given on the command line, and submits it.
///
/// # Errors
///
/// Returns the error notice if the task is unknown, the input is invalid or
/// the update is rejected.
pub async fn run(
    ctx: &ServiceContext,
    session: &mut SessionContext,
    args: &EditArgs,
) -> Result<(), String> {
    let store = open_list(ctx, session, Action::Update).await?;
    let id = check(Action::Update, resolve_id(&store, &args.id))?;
    let mut editor = check(Action::Update, store.edit(&id))?;
    check(Action::Update, apply(&mut editor, args))?;

    let task = report(Action::Update, store.update(&mut editor).await)?;
    println!("{}  {}  {}  {}", short_id(&task.id), task.status, task.priority, task.title);
    Ok(())
}

/// Overrides dialog fields with the flags that were given.
///
/// # Errors
///
/// Returns [`TaskError::Validation`] for a malformed date.
pub fn apply(editor: &mut TaskEditor, args: &EditArgs) -> Result<(), TaskError> {
    if let Some(title) = &args.title {
        editor.title.clone_from(title);
    }
    if let Some(description) = &args.description {
        editor.description.clone_from(description);
    }
    if let Some(priority) = args.priority {
        editor.priority = priority;
    }
    if let Some(status) = args.status {
        editor.status = status;
    }
    if args.clear_due {
        editor.date = None;
        editor.time.clear();
    }
    if let Some(date) = &args.date {
        editor.date = Some(due::parse_date(date)?);
    }
    if let Some(time) = &args.time {
        editor.time.clone_from(time);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::model::{Priority, Task, TaskStatus};
    use crate::ports::LocalZone;

    fn utc() -> LocalZone {
        LocalZone::utc()
    }

    fn editor() -> TaskEditor {
        let task = Task {
            id: "t-1".into(),
            user_id: "u1".into(),
            title: "Buy milk".into(),
            description: Some("2 litres".into()),
            status: TaskStatus::Pending,
            priority: Priority::Low,
            due_date: Some(Utc.with_ymd_and_hms(2025, 3, 10, 8, 15, 0).unwrap()),
            created_at: None,
            updated_at: None,
        };
        TaskEditor::open(&task, utc())
    }

    fn no_changes() -> EditArgs {
        EditArgs {
            id: "t-1".into(),
            title: None,
            description: None,
            priority: None,
            status: None,
            date: None,
            time: None,
            clear_due: false,
        }
    }

    #[test]
    fn unset_flags_keep_current_values() {
        let mut editor = editor();
        apply(&mut editor, &EditArgs { priority: Some(Priority::High), ..no_changes() }).unwrap();

        assert_eq!(editor.title, "Buy milk");
        assert_eq!(editor.description, "2 litres");
        assert_eq!(editor.priority, Priority::High);
        assert_eq!(editor.date, NaiveDate::from_ymd_opt(2025, 3, 10));
        assert_eq!(editor.time, "08:15");
    }

    #[test]
    fn empty_description_clears_it() {
        let mut editor = editor();
        apply(&mut editor, &EditArgs { description: Some(String::new()), ..no_changes() })
            .unwrap();
        let (_, changes) = editor.to_changes(Utc::now(), utc()).unwrap();
        assert_eq!(changes.description, None);
    }

    #[test]
    fn clear_due_removes_deadline() {
        let mut editor = editor();
        apply(&mut editor, &EditArgs { clear_due: true, ..no_changes() }).unwrap();
        let (_, changes) = editor.to_changes(Utc::now(), utc()).unwrap();
        assert_eq!(changes.due_date, None);
    }

    #[test]
    fn new_time_keeps_existing_date() {
        let mut editor = editor();
        apply(&mut editor, &EditArgs { time: Some("17:45".into()), ..no_changes() }).unwrap();
        let (id, changes) = editor.to_changes(Utc::now(), utc()).unwrap();
        assert_eq!(id, "t-1");
        assert_eq!(changes.due_date, Some(Utc.with_ymd_and_hms(2025, 3, 10, 17, 45, 0).unwrap()));
    }
}
