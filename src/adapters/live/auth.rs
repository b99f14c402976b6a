//! Live auth service speaking the backend's GoTrue-style API.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::rest::RestClient;
use crate::error::StoreError;
use crate::ports::auth::{AuthFuture, AuthService, AuthUser, Session, SignUpOutcome};

/// Auth service backed by `{url}/auth/v1`.
pub struct LiveAuthService {
    rest: Arc<RestClient>,
}

impl LiveAuthService {
    /// Creates an auth service sharing `rest`.
    #[must_use]
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }
}

#[derive(Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserBody> for AuthUser {
    fn from(user: UserBody) -> Self {
        Self { id: user.id, email: user.email }
    }
}

/// Token grant, optionally wrapping a user. Sign-up answers with either a
/// full grant or a bare user object when confirmation is pending.
#[derive(Deserialize)]
struct GrantBody {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<UserBody>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl GrantBody {
    fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)))
    }

    fn into_outcome(self, now: DateTime<Utc>) -> Result<SignUpOutcome, StoreError> {
        let expires_at = self.expiry(now);
        let user = match (self.user, self.id) {
            (Some(user), _) => AuthUser::from(user),
            (None, Some(id)) => AuthUser { id, email: self.email },
            (None, None) => return Err(StoreError::new("Auth response carried no user")),
        };
        let session = self.access_token.map(|access_token| Session {
            user: user.clone(),
            access_token,
            refresh_token: self.refresh_token,
            expires_at,
        });
        Ok(SignUpOutcome { user, session })
    }
}

impl AuthService for LiveAuthService {
    fn sign_in(&self, email: &str, password: &str) -> AuthFuture<'_, Session> {
        let body = json!({ "email": email, "password": password });
        Box::pin(async move {
            let request = self
                .rest
                .request(Method::POST, "/auth/v1/token")
                .query(&[("grant_type", "password")])
                .json(&body);
            let grant: GrantBody = self.rest.send_json(request).await?;
            let outcome = grant.into_outcome(Utc::now())?;
            info!(user = %outcome.user.id, "signed in");
            outcome.session.ok_or_else(|| StoreError::new("Sign-in returned no access token"))
        })
    }

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> AuthFuture<'_, SignUpOutcome> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });
        Box::pin(async move {
            let request = self.rest.request(Method::POST, "/auth/v1/signup").json(&body);
            let grant: GrantBody = self.rest.send_json(request).await?;
            grant.into_outcome(Utc::now())
        })
    }

    fn sign_out(&self, access_token: &str) -> AuthFuture<'_, ()> {
        let token = access_token.to_string();
        Box::pin(async move {
            let request = self.rest.request_as(Method::POST, "/auth/v1/logout", &token);
            self.rest.send_empty(request).await
        })
    }

    fn current_user(&self, access_token: &str) -> AuthFuture<'_, AuthUser> {
        let token = access_token.to_string();
        Box::pin(async move {
            let request = self.rest.request_as(Method::GET, "/auth/v1/user", &token);
            let user: UserBody = self.rest.send_json(request).await?;
            Ok(user.into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn password_grant_becomes_session() {
        let grant: GrantBody = serde_json::from_str(
            r#"{"access_token":"jwt","token_type":"bearer","expires_in":3600,
                "refresh_token":"r1","user":{"id":"u-1","email":"a@example.com"}}"#,
        )
        .unwrap();
        let outcome = grant.into_outcome(now()).unwrap();
        let session = outcome.session.unwrap();
        assert_eq!(session.user.id, "u-1");
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.expires_at, Some(now() + Duration::hours(1)));
    }

    #[test]
    fn unconfirmed_sign_up_has_no_session() {
        let body = r#"{"id":"u-2","email":"b@example.com","confirmation_sent_at":"x"}"#;
        let grant: GrantBody = serde_json::from_str(body).unwrap();
        let outcome = grant.into_outcome(now()).unwrap();
        assert_eq!(outcome.user.id, "u-2");
        assert!(outcome.session.is_none());
    }

    #[test]
    fn grant_without_user_is_rejected() {
        let grant: GrantBody = serde_json::from_str(r#"{"access_token":"jwt"}"#).unwrap();
        assert!(grant.into_outcome(now()).is_err());
    }
}
