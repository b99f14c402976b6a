//! `taskdeck toggle` command.

use super::{check, open_list, report, resolve_id, short_id};
use crate::context::ServiceContext;
use crate::session::SessionContext;
use crate::tasks::Action;

/// Execute the `toggle` command.
///
/// Completed tasks go back to pending; anything else becomes completed.
///
/// # Errors
///
/// Returns the error notice if the task is unknown or the write fails.
pub async fn run(
    ctx: &ServiceContext,
    session: &mut SessionContext,
    id: &str,
) -> Result<(), String> {
    let store = open_list(ctx, session, Action::Update).await?;
    let id = check(Action::Update, resolve_id(&store, id))?;
    let next = store.task(&id).map(|task| task.status.toggled()).unwrap_or_default();

    let status = report(Action::Toggle(next), store.toggle_status(&id).await)?;
    let title = store.task(&id).map(|task| task.title).unwrap_or_default();
    println!("{}  {status}  {title}", short_id(&id));
    Ok(())
}
