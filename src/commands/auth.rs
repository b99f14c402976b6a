//! `taskdeck signin`, `signup`, `signout` and `whoami`.

use super::{check, report, signed_in};
use crate::context::ServiceContext;
use crate::error::TaskError;
use crate::model::initials;
use crate::ports::AuthUser;
use crate::profile::ProfileService;
use crate::session::SessionContext;
use crate::tasks::Action;

/// Execute the `signin` command.
///
/// # Errors
///
/// Returns the error notice if the credentials are rejected.
pub async fn sign_in(
    session: &mut SessionContext,
    email: &str,
    password: &str,
) -> Result<(), String> {
    let current = report(Action::SignIn, session.sign_in(email, password).await)?;
    println!("Signed in as {}", describe(&current.user));
    Ok(())
}

/// Execute the `signup` command.
///
/// # Errors
///
/// Returns the error notice if the service refuses the registration.
pub async fn sign_up(
    session: &mut SessionContext,
    email: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<(), String> {
    let outcome = report(Action::SignUp, session.sign_up(email, password, full_name).await)?;
    if outcome.session.is_some() {
        println!("Signed in as {}", describe(&outcome.user));
    }
    Ok(())
}

/// Execute the `signout` command.
///
/// # Errors
///
/// Returns the error notice if the stored session cannot be removed.
pub async fn sign_out(session: &mut SessionContext) -> Result<(), String> {
    report(Action::SignOut, session.sign_out().await)
}

/// Execute the `whoami` command.
///
/// Prints the user's id and email, plus the profile name when one is saved.
///
/// # Errors
///
/// Returns an error if nobody is signed in or the session cannot be checked.
pub async fn who_am_i(ctx: &ServiceContext, session: &mut SessionContext) -> Result<(), String> {
    let current = signed_in(session).await.map_err(|err| match err {
        TaskError::NotSignedIn => "Not signed in. Run `taskdeck signin` first.".to_string(),
        other => other.to_string(),
    })?;
    println!("{}", describe(&current.user));
    println!("id: {}", current.user.id);

    let profile = ProfileService::new(ctx).load(&current.user.id).await;
    if let Some(name) = check(Action::LoadProfile, profile)?.and_then(|p| p.full_name) {
        println!("name: {name} ({})", initials(&name));
    }
    Ok(())
}

fn describe(user: &AuthUser) -> &str {
    user.email.as_deref().unwrap_or(&user.id)
}
