//! Command dispatch and handlers.
//!
//! Every handler prints the notice for its outcome. Failures come back as
//! the rendered error notice so the binary can print it to stderr.

pub mod add;
pub mod auth;
pub mod delete;
pub mod edit;
pub mod list;
pub mod profile;
pub mod toggle;
pub mod watch;

use std::path::Path;

use crate::cli::{Command, ProfileCommand};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::TaskError;
use crate::ports::Session;
use crate::session::SessionContext;
use crate::tasks::{Action, FilterState, Notice, TaskStore};

/// Dispatch a parsed command to its handler.
///
/// Configuration comes from the environment. When `TASKDECK_RECORD` is set
/// to a directory path, clock and row-store interactions are recorded to
/// per-port cassette files in that directory.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the selected
/// command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let config = Config::from_env().map_err(|e| e.to_string())?;
    let ctx = ServiceContext::from_config(&config).map_err(|e| e.to_string())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;

    let result = runtime.block_on(dispatch_with_context(command, &ctx, &config.session_file));

    // Finish recording after command completes (even on error)
    if let Some(dir) = ctx.finish_recording()? {
        eprintln!("Recording saved to: {}", dir.display());
    }

    result
}

/// Dispatch a command with the given service context, keeping the signed-in
/// session at `session_file`.
///
/// # Errors
///
/// Returns the rendered error notice if the command fails.
pub async fn dispatch_with_context(
    command: &Command,
    ctx: &ServiceContext,
    session_file: &Path,
) -> Result<(), String> {
    let mut session = SessionContext::new(ctx, session_file);
    match command {
        Command::SignIn { email, password } => auth::sign_in(&mut session, email, password).await,
        Command::SignUp { email, password, full_name } => {
            auth::sign_up(&mut session, email, password, full_name.as_deref()).await
        }
        Command::SignOut => auth::sign_out(&mut session).await,
        Command::WhoAmI => auth::who_am_i(ctx, &mut session).await,
        Command::List { filters } => list::run(ctx, &mut session, filters).await,
        Command::Add(args) => add::run(ctx, &mut session, args).await,
        Command::Edit(args) => edit::run(ctx, &mut session, args).await,
        Command::Toggle { id } => toggle::run(ctx, &mut session, id).await,
        Command::Delete { id } => delete::run(ctx, &mut session, id).await,
        Command::Watch { filters } => watch::run(ctx, &mut session, filters).await,
        Command::Profile { action: ProfileCommand::Show } => {
            profile::show(ctx, &mut session).await
        }
        Command::Profile { action: ProfileCommand::Set { full_name, avatar_url } } => {
            profile::set(ctx, &mut session, full_name.as_deref(), avatar_url.as_deref()).await
        }
    }
}

/// Prints the success notice for `action`, or renders the error notice.
pub(crate) fn report<T>(action: Action, result: Result<T, TaskError>) -> Result<T, String> {
    let notice = Notice::for_outcome(action, &result);
    match result {
        Ok(value) => {
            println!("{notice}");
            Ok(value)
        }
        Err(_) => Err(notice.to_string()),
    }
}

/// Renders the error notice for `action` without printing anything on success.
pub(crate) fn check<T>(action: Action, result: Result<T, TaskError>) -> Result<T, String> {
    result.map_err(|err| Notice::for_error(action, &err).to_string())
}

/// Restores the persisted session.
pub(crate) async fn signed_in(session: &mut SessionContext) -> Result<Session, TaskError> {
    session.init().await?;
    session.require().cloned()
}

/// Signs in from the stored session and loads the unfiltered list.
pub(crate) async fn open_list(
    ctx: &ServiceContext,
    session: &mut SessionContext,
    action: Action,
) -> Result<TaskStore, String> {
    let current = check(action, signed_in(session).await)?;
    let store = TaskStore::from_context(ctx, current.user.id, FilterState::default());
    check(Action::Fetch, store.fetch().await)?;
    Ok(store)
}

/// Finds the listed task whose id is `id` or, failing that, the only one
/// whose id starts with it.
pub(crate) fn resolve_id(store: &TaskStore, id: &str) -> Result<String, TaskError> {
    let tasks = store.tasks();
    if tasks.iter().any(|task| task.id == id) {
        return Ok(id.to_string());
    }
    let mut matches = tasks.iter().filter(|task| !id.is_empty() && task.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => {
            Err(TaskError::Validation(format!("Task id prefix {id:?} matches several tasks")))
        }
        (None, _) => Err(TaskError::NotFound(id.to_string())),
    }
}

/// First eight characters of a task id, as printed in listings.
pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::adapters::memory::{ManualClock, MemoryRowStore};
    use crate::model::{NewTask, Priority, TaskStatus};
    use crate::ports::LocalZone;

    fn new_task(title: &str) -> NewTask {
        NewTask {
            user_id: "u1".into(),
            title: title.into(),
            description: None,
            priority: Priority::Medium,
            status: TaskStatus::Pending,
            due_date: None,
        }
    }

    async fn store_with(rows: &Arc<MemoryRowStore>) -> TaskStore {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()));
        let zone = LocalZone::utc();
        let store = TaskStore::new(rows.clone(), clock, zone, "u1", FilterState::default());
        store.fetch().await.unwrap();
        store
    }

    #[tokio::test]
    async fn resolves_exact_and_prefix_ids() {
        let rows = Arc::new(MemoryRowStore::new());
        let milk = rows.seed(new_task("Buy milk"));
        rows.seed(new_task("Walk dog"));
        let store = store_with(&rows).await;

        assert_eq!(resolve_id(&store, &milk.id).unwrap(), milk.id);
        assert_eq!(resolve_id(&store, &short_id(&milk.id)).unwrap(), milk.id);
        assert_eq!(
            resolve_id(&store, "no-such-id").unwrap_err(),
            TaskError::NotFound("no-such-id".into())
        );
    }

    #[tokio::test]
    async fn empty_id_matches_nothing() {
        let rows = Arc::new(MemoryRowStore::new());
        let store = store_with(&rows).await;
        assert!(matches!(resolve_id(&store, ""), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn report_renders_error_notice() {
        let result: Result<(), _> = Err(TaskError::Mutation("row locked".into()));
        assert_eq!(report(Action::Delete, result).unwrap_err(), "Error deleting task: row locked");
    }

    #[test]
    fn short_id_takes_eight_characters() {
        assert_eq!(short_id("0f9a2c4e-1111-2222"), "0f9a2c4e");
        assert_eq!(short_id("abc"), "abc");
    }
}
