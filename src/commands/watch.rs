//! `taskdeck watch` command.

use tracing::warn;

use super::{check, list, signed_in};
use crate::cli::FilterArgs;
use crate::context::ServiceContext;
use crate::session::SessionContext;
use crate::tasks::{Action, FetchOutcome, Notice, TaskStore};

/// Execute the `watch` command.
///
/// Mounts the list, prints it, and prints it again after every change
/// until Ctrl-C. Failed refreshes are reported and watching continues.
///
/// # Errors
///
/// Returns the error notice if nobody is signed in or the subscription
/// cannot be opened.
pub async fn run(
    ctx: &ServiceContext,
    session: &mut SessionContext,
    filters: &FilterArgs,
) -> Result<(), String> {
    let current = check(Action::Fetch, signed_in(session).await)?;
    let store = TaskStore::from_context(ctx, current.user.id, filters.state());
    let mut mounted = check(Action::Fetch, store.mount().await)?;
    eprintln!("Watching for changes. Press Ctrl-C to stop.");

    loop {
        tokio::select! {
            refresh = mounted.next_refresh() => match refresh {
                Some(Ok(FetchOutcome::Applied { .. })) => {
                    println!("{}", list::render(&store, ctx.clock.now()));
                }
                Some(Ok(FetchOutcome::Superseded)) => {}
                Some(Err(err)) => eprintln!("{}", Notice::for_error(Action::Fetch, &err)),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "cannot listen for Ctrl-C");
                }
                break;
            }
        }
    }

    mounted.unmount().await;
    Ok(())
}
