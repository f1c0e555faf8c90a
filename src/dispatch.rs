//! Authorized request dispatch.
//!
//! [`AuthorizedClient`] sends every request with the coordinator's current
//! access token. A 401 hands the request to
//! [`CredentialCoordinator::on_auth_rejected`], and the request is replayed
//! once with the token it returns.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{CredentialCoordinator, RetryableRequest};
use crate::error::{ClientResult, ErrorContext, NetworkError, ResultExt};
use crate::traits::{Headers, HttpClient, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// HTTP client that authorizes requests and recovers from expired tokens.
#[derive(Clone)]
pub struct AuthorizedClient {
    http: Arc<dyn HttpClient>,
    coordinator: CredentialCoordinator,
    base_url: String,
}

impl fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AuthorizedClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        coordinator: CredentialCoordinator,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            coordinator,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn coordinator(&self) -> &CredentialCoordinator {
        &self.coordinator
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.send(Method::Get, path, None).await?;
        Ok(response.json()?)
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let body = serde_json::to_string(body)?;
        let response = self.send(Method::Post, path, Some(&body)).await?;
        Ok(response.json()?)
    }

    /// Send a request, replaying it once after a 401.
    ///
    /// Non-2xx responses other than the handled 401 are returned as
    /// `NetworkError::HttpStatus`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&str>,
    ) -> ClientResult<Response> {
        let url = self.url(path);
        let mut request = RetryableRequest::new(self.coordinator.access_token());
        let mut token = request.attempted_token.clone();

        loop {
            let response = self
                .dispatch(method, &url, body, token.as_deref())
                .await
                .with_context(|| {
                    ErrorContext::new(format!("{} {}", method, path)).with_component("dispatch")
                })?;

            if response.status != 401 {
                return Ok(response.error_for_status()?);
            }

            tracing::debug!("{} {} rejected as unauthorized", method, url);
            let replacement = self
                .coordinator
                .on_auth_rejected(&mut request)
                .await
                .with_context(|| {
                    ErrorContext::new(format!("{} {}", method, path)).with_component("dispatch")
                })?;
            token = Some(replacement);
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        token: Option<&str>,
    ) -> Result<Response, NetworkError> {
        let mut headers = Headers::new();
        if let Some(token) = token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        match method {
            Method::Get => self.http.get(url, &headers).await,
            Method::Post => self.http.post(url, body.unwrap_or(""), &headers).await,
        }
    }
}
