//! Error taxonomy for task list operations.
//!
//! Port adapters report failures as [`StoreError`], which keeps whatever the
//! collaborator said. The task store normalizes those into [`TaskError`]
//! before anything reaches the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure reported by an external collaborator (row-store or auth service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreError {
    /// Human-readable message from the collaborator.
    pub message: String,
    /// Collaborator-specific error code, when one was provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// HTTP status of the failed request, if the failure came over HTTP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl StoreError {
    /// Creates an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), code: None, status: None }
    }

    /// Attaches an HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a collaborator error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Builds an error from an arbitrary JSON error body.
    ///
    /// Hosted backends disagree on where they put the message, so the
    /// usual keys are tried in order before falling back to the raw text.
    #[must_use]
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|v| {
                ["message", "msg", "error_description", "error"]
                    .iter()
                    .find_map(|key| v.get(*key).and_then(serde_json::Value::as_str))
            })
            .map_or_else(
                || if body.trim().is_empty() { format!("HTTP {status}") } else { body.to_string() },
                String::from,
            );
        let code = parsed.as_ref().and_then(|v| match v.get("code") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });

        Self { message, code, status: Some(status) }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<String> for StoreError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for StoreError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Errors surfaced by task list, session and profile operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Input rejected before any request was issued.
    Validation(String),
    /// The row-store rejected a read.
    Fetch(String),
    /// The row-store rejected a write.
    Mutation(String),
    /// The auth service rejected a sign-in, sign-up or session check.
    Auth(String),
    /// No session is available.
    NotSignedIn,
    /// The referenced task is not in the current list.
    NotFound(String),
    /// A submission for the same form is already in flight.
    Busy,
    /// Configuration is missing or invalid.
    Config(String),
}

impl TaskError {
    /// Normalizes a failed read.
    #[must_use]
    pub fn fetch(err: &StoreError) -> Self {
        Self::Fetch(err.message.clone())
    }

    /// Normalizes a failed write.
    #[must_use]
    pub fn mutation(err: &StoreError) -> Self {
        Self::Mutation(err.message.clone())
    }

    /// Normalizes a failed auth call.
    #[must_use]
    pub fn auth(err: &StoreError) -> Self {
        Self::Auth(err.message.clone())
    }

    /// Message suitable for the description line of a notice.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::Fetch(msg)
            | Self::Mutation(msg)
            | Self::Auth(msg)
            | Self::Config(msg) => msg.clone(),
            Self::NotSignedIn => "Sign in to continue".to_string(),
            Self::NotFound(id) => format!("No task with id {id} in the current list"),
            Self::Busy => "A request is already in progress".to_string(),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation failed: {msg}"),
            Self::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            Self::Mutation(msg) => write!(f, "write failed: {msg}"),
            Self::Auth(msg) => write!(f, "authentication failed: {msg}"),
            Self::NotSignedIn => f.write_str("not signed in"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Busy => f.write_str("a submission is already in flight"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for TaskError {}
