//! In-memory auth service.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::StoreError;
use crate::ports::auth::{AuthFuture, AuthService, AuthUser, Session, SignUpOutcome};

struct Account {
    user: AuthUser,
    password: String,
    full_name: Option<String>,
    confirmed: bool,
}

#[derive(Default)]
struct AuthState {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, AuthUser>,
    confirm_email: bool,
}

/// Accounts and tokens held in memory.
///
/// By default sign-up signs the new user in immediately. With
/// [`MemoryAuthService::requiring_confirmation`] new accounts cannot sign in
/// until [`MemoryAuthService::confirm`] is called, like a project with email
/// confirmation turned on.
#[derive(Default)]
pub struct MemoryAuthService {
    state: Mutex<AuthState>,
}

impl MemoryAuthService {
    /// Service whose sign-ups are confirmed right away.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Service whose sign-ups wait for [`MemoryAuthService::confirm`].
    #[must_use]
    pub fn requiring_confirmation() -> Self {
        let service = Self::default();
        service.lock().confirm_email = true;
        service
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a confirmed account directly.
    pub fn register(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser { id: Uuid::new_v4().to_string(), email: Some(email.to_string()) };
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
                full_name: None,
                confirmed: true,
            },
        );
        user
    }

    /// Marks the account behind `email` as confirmed.
    pub fn confirm(&self, email: &str) {
        if let Some(account) = self.lock().accounts.get_mut(email) {
            account.confirmed = true;
        }
    }

    /// Full name given at sign-up.
    #[must_use]
    pub fn full_name(&self, email: &str) -> Option<String> {
        self.lock().accounts.get(email).and_then(|account| account.full_name.clone())
    }

    /// Number of tokens that have not been revoked.
    #[must_use]
    pub fn active_tokens(&self) -> usize {
        self.lock().tokens.len()
    }
}

fn issue(state: &mut AuthState, user: &AuthUser) -> Session {
    let access_token = Uuid::new_v4().to_string();
    state.tokens.insert(access_token.clone(), user.clone());
    Session {
        user: user.clone(),
        access_token,
        refresh_token: Some(Uuid::new_v4().to_string()),
        expires_at: None,
    }
}

impl AuthService for MemoryAuthService {
    fn sign_in(&self, email: &str, password: &str) -> AuthFuture<'_, Session> {
        let email = email.to_string();
        let password = password.to_string();
        Box::pin(async move {
            let mut state = self.lock();
            let user = match state.accounts.get(&email) {
                Some(account) if account.password == password => {
                    if !account.confirmed {
                        return Err(StoreError::new("Email not confirmed").with_status(400));
                    }
                    account.user.clone()
                }
                _ => return Err(StoreError::new("Invalid login credentials").with_status(400)),
            };
            Ok(issue(&mut state, &user))
        })
    }

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> AuthFuture<'_, SignUpOutcome> {
        let email = email.to_string();
        let password = password.to_string();
        let full_name = full_name.map(str::to_string);
        Box::pin(async move {
            if password.chars().count() < 6 {
                return Err(StoreError::new("Password should be at least 6 characters")
                    .with_status(422));
            }
            let mut state = self.lock();
            if state.accounts.contains_key(&email) {
                return Err(StoreError::new("User already registered").with_status(422));
            }
            let user = AuthUser { id: Uuid::new_v4().to_string(), email: Some(email.clone()) };
            let confirmed = !state.confirm_email;
            state.accounts.insert(
                email,
                Account { user: user.clone(), password, full_name, confirmed },
            );
            let session = confirmed.then(|| issue(&mut state, &user));
            Ok(SignUpOutcome { user, session })
        })
    }

    fn sign_out(&self, access_token: &str) -> AuthFuture<'_, ()> {
        let token = access_token.to_string();
        Box::pin(async move {
            self.lock().tokens.remove(&token);
            Ok(())
        })
    }

    fn current_user(&self, access_token: &str) -> AuthFuture<'_, AuthUser> {
        let token = access_token.to_string();
        Box::pin(async move {
            self.lock()
                .tokens
                .get(&token)
                .cloned()
                .ok_or_else(|| StoreError::new("invalid JWT").with_status(401))
        })
    }
}
