//! Auth port for the hosted authentication service.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Boxed future type alias used by [`AuthService`] to keep the trait dyn-compatible.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Identity of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Stable user identifier; owner key for tasks and profiles.
    pub id: String,
    /// Sign-in email, when the service exposes one.
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The signed-in user.
    pub user: AuthUser,
    /// Bearer token for row-store requests.
    pub access_token: String,
    /// Token used to obtain a new access token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token stops being accepted.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpOutcome {
    /// The created user.
    pub user: AuthUser,
    /// Present when the service signs the user in right away; absent when
    /// the email address has to be confirmed first.
    #[serde(default)]
    pub session: Option<Session>,
}

/// Signs users in and out of the hosted backend.
pub trait AuthService: Send + Sync {
    /// Exchanges email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected.
    fn sign_in(&self, email: &str, password: &str) -> AuthFuture<'_, Session>;

    /// Registers a new account, storing `full_name` as user metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the service refuses the registration.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> AuthFuture<'_, SignUpOutcome>;

    /// Revokes the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached.
    fn sign_out(&self, access_token: &str) -> AuthFuture<'_, ()>;

    /// Resolves the user behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    fn current_user(&self, access_token: &str) -> AuthFuture<'_, AuthUser>;
}
