//! `taskdeck profile show` and `taskdeck profile set`.

use super::{check, report, signed_in};
use crate::context::ServiceContext;
use crate::model::{initials, Profile};
use crate::profile::{ProfileForm, ProfileService};
use crate::session::SessionContext;
use crate::tasks::Action;

/// Execute `profile show`.
///
/// # Errors
///
/// Returns the error notice if nobody is signed in or the read fails.
pub async fn show(ctx: &ServiceContext, session: &mut SessionContext) -> Result<(), String> {
    let current = check(Action::LoadProfile, signed_in(session).await)?;
    let profile = ProfileService::new(ctx).load(&current.user.id).await;
    match check(Action::LoadProfile, profile)? {
        Some(profile) => print!("{}", render(&profile)),
        None => println!("No profile saved yet. Use `taskdeck profile set` to create one."),
    }
    Ok(())
}

/// Execute `profile set`.
///
/// Starts from the stored profile so that unset flags keep their value.
///
/// # Errors
///
/// Returns the error notice if nobody is signed in or the write fails.
pub async fn set(
    ctx: &ServiceContext,
    session: &mut SessionContext,
    full_name: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<(), String> {
    let current = check(Action::SaveProfile, signed_in(session).await)?;
    let service = ProfileService::new(ctx);
    let stored = check(Action::SaveProfile, service.load(&current.user.id).await)?;

    let mut form = ProfileForm::from_profile(stored.as_ref());
    if let Some(name) = full_name {
        form.full_name = name.to_string();
    }
    if let Some(url) = avatar_url {
        form.avatar_url = url.to_string();
    }
    let saved = report(Action::SaveProfile, service.save(&current.user.id, &form).await)?;
    print!("{}", render(&saved));
    Ok(())
}

fn render(profile: &Profile) -> String {
    let name = profile.full_name.as_deref().unwrap_or("-");
    let letters = profile.full_name.as_deref().map(initials).unwrap_or_default();
    let avatar = profile.avatar_url.as_deref().unwrap_or("-");
    let mut out = format!("name:    {name}");
    if !letters.is_empty() {
        out.push_str(&format!(" ({letters})"));
    }
    out.push_str(&format!("\navatar:  {avatar}\n"));
    if let Some(at) = profile.updated_at {
        out.push_str(&format!("updated: {}\n", at.to_rfc3339()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_shows_initials_and_placeholders() {
        let profile = Profile {
            id: "u1".into(),
            full_name: Some("Ada Lovelace".into()),
            avatar_url: None,
            updated_at: None,
        };
        assert_eq!(render(&profile), "name:    Ada Lovelace (AL)\navatar:  -\n");
    }
}
