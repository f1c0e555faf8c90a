//! HTTP auth API adapter.
//!
//! Login and refresh are sent without an access token, straight through
//! the underlying [`HttpClient`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::auth::{LoginResponse, TokenPair};
use crate::error::{AuthError, NetworkError};
use crate::traits::{AuthApi, Headers, HttpClient, Response};

/// [`AuthApi`] over HTTP.
#[derive(Clone)]
pub struct HttpAuthApi {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl std::fmt::Debug for HttpAuthApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuthApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpAuthApi {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<Response, AuthError> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self.http.post(&url, &body.to_string(), &Headers::new()).await?)
    }
}

/// Pull the message out of an HTTP status error.
fn status_error(response: Response) -> (u16, String) {
    let status = response.status;
    match response.error_for_status() {
        Err(NetworkError::HttpStatus { message, .. }) => (status, message),
        _ => (status, format!("HTTP error! status: {}", status)),
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let response = self
            .post(
                "/auth/login",
                json!({ "username": username, "password": password }),
            )
            .await?;

        if response.is_success() {
            return Ok(response.json()?);
        }
        match status_error(response) {
            (401, message) => Err(AuthError::InvalidCredentials { message }),
            (status, message) => Err(AuthError::ApiError { status, message }),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let response = self
            .post("/auth/refresh", json!({ "refresh_token": refresh_token }))
            .await?;

        if response.is_success() {
            return Ok(response.json()?);
        }
        match status_error(response) {
            (400 | 401 | 403, message) => Err(AuthError::RefreshFailed { message }),
            (status, message) => Err(AuthError::ApiError { status, message }),
        }
    }
}
