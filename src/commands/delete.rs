//! `taskdeck delete` command.

use super::{check, open_list, report, resolve_id, short_id};
use crate::context::ServiceContext;
use crate::session::SessionContext;
use crate::tasks::Action;

/// Execute the `delete` command.
///
/// # Errors
///
/// Returns the error notice if the task is unknown or the delete fails.
pub async fn run(
    ctx: &ServiceContext,
    session: &mut SessionContext,
    id: &str,
) -> Result<(), String> {
    let store = open_list(ctx, session, Action::Delete).await?;
    let id = check(Action::Delete, resolve_id(&store, id))?;
    report(Action::Delete, store.delete(&id).await)?;
    println!("{}  removed", short_id(&id));
    Ok(())
}
