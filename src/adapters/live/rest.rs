//! Shared HTTP plumbing for the hosted backend.

use std::sync::{PoisonError, RwLock};

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::StoreError;

/// HTTP client bound to one backend project.
///
/// Every request carries the project's anon key as `apikey`. The bearer
/// token is the signed-in user's access token when one is set, otherwise the
/// anon key, which the backend treats as an anonymous caller.
pub struct RestClient {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl RestClient {
    /// Creates a client for the project at `base_url`.
    #[must_use]
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: RwLock::new(None),
        }
    }

    /// Project base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replaces the bearer token used for subsequent requests.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    /// Starts a request to `path` (relative to the base URL) with the
    /// project headers and the current bearer token.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_as(method, path, &self.bearer())
    }

    /// Like [`RestClient::request`], but authenticated as `token`.
    pub fn request_as(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "backend request");
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    /// Sends a request and decodes a JSON response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent, the backend answers
    /// with a non-success status, or the body does not decode as `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = checked(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::new(format!("Failed to read backend response: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| StoreError::new(format!("Unexpected backend response: {e}")))
    }

    /// Sends a request whose response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the backend
    /// answers with a non-success status.
    pub async fn send_empty(&self, request: RequestBuilder) -> Result<(), StoreError> {
        checked(request).await.map(drop)
    }
}

async fn checked(request: RequestBuilder) -> Result<Response, StoreError> {
    let response = request
        .send()
        .await
        .map_err(|e| StoreError::new(format!("Backend request failed: {e}")))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::from_body(status.as_u16(), &body))
}
