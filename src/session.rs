//! The signed-in user, held explicitly instead of as ambient global state.
//!
//! A [`SessionContext`] is initialized once per run from the persisted
//! session file, verified against the auth service, and torn down by
//! [`SessionContext::sign_out`]. Everything that needs the current user asks
//! it through [`SessionContext::require`].

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::ServiceContext;
use crate::error::TaskError;
use crate::ports::auth::{AuthService, AuthUser, Session, SignUpOutcome};
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::row_store::RowStore;

/// Statuses with which the auth service rejects a token.
const REJECTED_TOKEN: [u16; 2] = [401, 403];

/// Current-user context.
pub struct SessionContext {
    auth: Arc<dyn AuthService>,
    rows: Arc<dyn RowStore>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    path: PathBuf,
    current: Option<Session>,
}

impl SessionContext {
    /// Creates a signed-out context persisting to `path`.
    pub fn new(ctx: &ServiceContext, path: impl Into<PathBuf>) -> Self {
        Self {
            auth: Arc::clone(&ctx.auth),
            rows: Arc::clone(&ctx.rows),
            fs: Arc::clone(&ctx.fs),
            clock: Arc::clone(&ctx.clock),
            path: path.into(),
            current: None,
        }
    }

    /// Loads the persisted session and verifies it with the auth service.
    ///
    /// A missing, unreadable, expired or rejected session leaves the context
    /// signed out. Expired and rejected sessions are also deleted.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Auth`] if the auth service could not be asked.
    pub async fn init(&mut self) -> Result<Option<&Session>, TaskError> {
        self.current = None;
        let Some(stored) = self.load() else {
            return Ok(None);
        };
        if stored.is_expired(self.clock.now()) {
            info!(user = %stored.user.id, "stored session expired");
            self.forget()?;
            return Ok(None);
        }

        match self.auth.current_user(&stored.access_token).await {
            Ok(user) => {
                debug!(user = %user.id, "session verified");
                self.adopt(Session { user, ..stored });
                Ok(self.current.as_ref())
            }
            Err(err) if err.status.is_some_and(|s| REJECTED_TOKEN.contains(&s)) => {
                info!(error = %err, "stored session rejected");
                self.forget()?;
                Ok(None)
            }
            Err(err) => Err(TaskError::auth(&err)),
        }
    }

    fn load(&self) -> Option<Session> {
        if !self.fs.exists(&self.path) {
            return None;
        }
        let text = match self.fs.read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read session file");
                return None;
            }
        };
        match serde_yaml::from_str(&text) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed session file");
                None
            }
        }
    }

    fn persist(&self, session: &Session) -> Result<(), TaskError> {
        let yaml = serde_yaml::to_string(session)
            .map_err(|e| TaskError::Config(format!("Failed to encode session: {e}")))?;
        self.fs.write(&self.path, &yaml).map_err(|e| {
            TaskError::Config(format!("Failed to write {}: {e}", self.path.display()))
        })
    }

    fn forget(&mut self) -> Result<(), TaskError> {
        self.current = None;
        self.rows.set_access_token(None);
        self.fs.remove(&self.path).map_err(|e| {
            TaskError::Config(format!("Failed to remove {}: {e}", self.path.display()))
        })
    }

    fn adopt(&mut self, session: Session) {
        self.rows.set_access_token(Some(session.access_token.clone()));
        self.current = Some(session);
    }

    /// Signs in with email and password and persists the session.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] for a blank email or password and
    /// [`TaskError::Auth`] if the credentials are rejected.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Session, TaskError> {
        let email = required_email(email)?;
        if password.is_empty() {
            return Err(TaskError::Validation("Password is required".into()));
        }
        let session = self.auth.sign_in(email, password).await.map_err(|e| TaskError::auth(&e))?;
        self.persist(&session)?;
        info!(user = %session.user.id, "signed in");
        self.adopt(session.clone());
        Ok(session)
    }

    /// Registers an account. When the service signs the new user in right
    /// away the session is persisted too.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] for a blank email or password and
    /// [`TaskError::Auth`] if the service refuses the registration.
    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, TaskError> {
        let email = required_email(email)?;
        if password.is_empty() {
            return Err(TaskError::Validation("Password is required".into()));
        }
        let full_name = full_name.map(str::trim).filter(|name| !name.is_empty());
        let outcome =
            self.auth.sign_up(email, password, full_name).await.map_err(|e| TaskError::auth(&e))?;
        info!(user = %outcome.user.id, confirmed = outcome.session.is_some(), "account created");
        if let Some(session) = &outcome.session {
            self.persist(session)?;
            self.adopt(session.clone());
        }
        Ok(outcome)
    }

    /// Revokes the session (best effort) and deletes the persisted copy.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the session file cannot be removed.
    pub async fn sign_out(&mut self) -> Result<(), TaskError> {
        let session = self.current.take().or_else(|| self.load());
        if let Some(session) = session {
            if let Err(e) = self.auth.sign_out(&session.access_token).await {
                warn!(error = %e, "could not revoke session; clearing it locally");
            }
            info!(user = %session.user.id, "signed out");
        }
        self.forget()
    }

    /// The verified session.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotSignedIn`] when nobody is signed in.
    pub fn require(&self) -> Result<&Session, TaskError> {
        self.current.as_ref().ok_or(TaskError::NotSignedIn)
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&AuthUser> {
        self.current.as_ref().map(|session| &session.user)
    }
}

fn required_email(email: &str) -> Result<&str, TaskError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(TaskError::Validation("Email is required".into()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{ManualClock, MemoryAuthService, MemoryFileSystem, MemoryRowStore};
    use crate::ports::LocalZone;
    use chrono::{TimeZone, Utc};
    use std::path::Path;

    const FILE: &str = ".taskdeck/session.yaml";

    struct Fixture {
        ctx: ServiceContext,
        auth: Arc<MemoryAuthService>,
        fs: Arc<MemoryFileSystem>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()));
        let auth = Arc::new(MemoryAuthService::new());
        let fs = Arc::new(MemoryFileSystem::new());
        let ctx = ServiceContext::new(
            clock.clone(),
            Arc::new(MemoryRowStore::new()),
            auth.clone(),
            fs.clone(),
            LocalZone::utc(),
        );
        Fixture { ctx, auth, fs, clock }
    }

    #[tokio::test]
    async fn sign_in_persists_and_init_restores() {
        let f = fixture();
        let user = f.auth.register("ada@example.com", "secret1");

        let mut first = SessionContext::new(&f.ctx, FILE);
        first.sign_in("  ada@example.com ", "secret1").await.unwrap();
        assert!(f.fs.exists(Path::new(FILE)));

        let mut second = SessionContext::new(&f.ctx, FILE);
        let restored = second.init().await.unwrap().cloned().unwrap();
        assert_eq!(restored.user, user);
        assert_eq!(second.require().unwrap().user.id, user.id);
    }

    #[tokio::test]
    async fn require_without_session_is_not_signed_in() {
        let f = fixture();
        let mut session = SessionContext::new(&f.ctx, FILE);
        assert!(session.init().await.unwrap().is_none());
        assert_eq!(session.require().unwrap_err(), TaskError::NotSignedIn);
    }

    #[tokio::test]
    async fn rejected_token_clears_file() {
        let f = fixture();
        f.auth.register("ada@example.com", "secret1");
        let mut session = SessionContext::new(&f.ctx, FILE);
        let signed_in = session.sign_in("ada@example.com", "secret1").await.unwrap();

        // Revoked elsewhere.
        f.auth.sign_out(&signed_in.access_token).await.unwrap();

        let mut later = SessionContext::new(&f.ctx, FILE);
        assert!(later.init().await.unwrap().is_none());
        assert!(!f.fs.exists(Path::new(FILE)));
    }

    #[tokio::test]
    async fn expired_session_is_dropped_without_asking() {
        let f = fixture();
        let stored = Session {
            user: AuthUser { id: "u-1".into(), email: None },
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Some(f.clock.now()),
        };
        f.fs.write(Path::new(FILE), &serde_yaml::to_string(&stored).unwrap()).unwrap();

        let mut session = SessionContext::new(&f.ctx, FILE);
        assert!(session.init().await.unwrap().is_none());
        assert!(!f.fs.exists(Path::new(FILE)));
    }

    #[tokio::test]
    async fn malformed_file_is_ignored() {
        let f = fixture();
        f.fs.write(Path::new(FILE), "not: [a session").unwrap();
        let mut session = SessionContext::new(&f.ctx, FILE);
        assert!(session.init().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_out_revokes_and_clears_even_when_offline() {
        let f = fixture();
        f.auth.register("ada@example.com", "secret1");
        let mut session = SessionContext::new(&f.ctx, FILE);
        session.sign_in("ada@example.com", "secret1").await.unwrap();

        session.sign_out().await.unwrap();
        assert_eq!(f.auth.active_tokens(), 0);
        assert!(!f.fs.exists(Path::new(FILE)));
        assert!(session.user().is_none());

        // Nothing to revoke the second time round.
        session.sign_out().await.unwrap();
    }

    #[tokio::test]
    async fn bad_credentials_are_auth_errors() {
        let f = fixture();
        f.auth.register("ada@example.com", "secret1");
        let mut session = SessionContext::new(&f.ctx, FILE);

        let err = session.sign_in("ada@example.com", "nope").await.unwrap_err();
        assert_eq!(err, TaskError::Auth("Invalid login credentials".into()));
        assert!(matches!(session.sign_in(" ", "x").await, Err(TaskError::Validation(_))));
        assert!(!f.fs.exists(Path::new(FILE)));
    }

    #[tokio::test]
    async fn confirmed_sign_up_signs_in() {
        let f = fixture();
        let mut session = SessionContext::new(&f.ctx, FILE);
        let outcome =
            session.sign_up("bea@example.com", "secret1", Some("  Bea Baker ")).await.unwrap();
        assert!(outcome.session.is_some());
        assert_eq!(f.auth.full_name("bea@example.com").as_deref(), Some("Bea Baker"));
        assert_eq!(session.require().unwrap().user, outcome.user);
    }
}
