//! `taskdeck add` command.

use super::{check, report, short_id, signed_in};
use crate::cli::AddArgs;
use crate::context::ServiceContext;
use crate::error::TaskError;
use crate::session::SessionContext;
use crate::tasks::{due, Action, FilterState, TaskForm, TaskStore};

/// Execute the `add` command.
///
/// # Errors
///
/// Returns the error notice for invalid input, a missing session or a
/// rejected insert.
pub async fn run(
    ctx: &ServiceContext,
    session: &mut SessionContext,
    args: &AddArgs,
) -> Result<(), String> {
    let mut form = check(Action::Create, form_from(args))?;
    let current = check(Action::Create, signed_in(session).await)?;
    let store = TaskStore::from_context(ctx, current.user.id, FilterState::default());

    let task = report(Action::Create, store.create(&mut form).await)?;
    println!("{}  {}", short_id(&task.id), task.title);
    Ok(())
}

/// Fills the create form from the command line.
///
/// # Errors
///
/// Returns [`TaskError::Validation`] for a malformed date.
pub fn form_from(args: &AddArgs) -> Result<TaskForm, TaskError> {
    let mut form = TaskForm::new();
    form.title.clone_from(&args.title);
    form.description = args.description.clone().unwrap_or_default();
    form.priority = args.priority;
    form.date = args.date.as_deref().map(due::parse_date).transpose()?;
    form.time = args.time.clone().unwrap_or_default();
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::model::Priority;

    fn args(title: &str) -> AddArgs {
        AddArgs {
            title: title.into(),
            description: None,
            priority: Priority::Medium,
            date: None,
            time: None,
        }
    }

    #[test]
    fn form_carries_every_field() {
        let form = form_from(&AddArgs {
            description: Some("2 litres".into()),
            priority: Priority::High,
            date: Some("2025-03-10".into()),
            time: Some("14:30".into()),
            ..args("Buy milk")
        })
        .unwrap();

        assert_eq!(form.title, "Buy milk");
        assert_eq!(form.description, "2 litres");
        assert_eq!(form.priority, Priority::High);
        assert_eq!(form.date, NaiveDate::from_ymd_opt(2025, 3, 10));
        assert_eq!(form.time, "14:30");
    }

    #[test]
    fn malformed_date_is_rejected() {
        let err = form_from(&AddArgs { date: Some("10/03/2025".into()), ..args("x") }).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
    }
}
