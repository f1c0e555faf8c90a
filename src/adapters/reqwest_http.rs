//! Reqwest-based HTTP client adapter.
//!
//! This module provides the production HTTP client implementation using
//! reqwest, implementing the [`HttpClient`] trait from `crate::traits`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{classify_reqwest_error, NetworkError};
use crate::traits::{Headers, HttpClient, Response};

/// HTTP client implementation using reqwest.
///
/// Non-2xx responses are returned as-is; only transport failures become
/// errors.
///
/// # Example
///
/// ```ignore
/// use geoarchive::adapters::ReqwestHttpClient;
/// use geoarchive::traits::HttpClient;
///
/// let client = ReqwestHttpClient::with_timeout(Duration::from_secs(30));
/// let response = client.get("http://localhost:8000/api/v1/tasks/J1", &Headers::new()).await?;
/// println!("Status: {}", response.status);
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient with default settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a client that gives up on a request after `timeout`.
    ///
    /// Falls back to the default client if the builder fails.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                reqwest::Client::new()
            });
        Self { client }
    }

    /// Create a new ReqwestHttpClient with a custom reqwest::Client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying reqwest::Client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Convert reqwest headers to our Headers type.
    fn convert_headers(headers: &reqwest::header::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    /// Apply headers to a request builder.
    fn apply_headers(
        builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        let mut builder = builder;
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        url: &str,
        headers: &Headers,
    ) -> Result<Response, NetworkError> {
        let builder = Self::apply_headers(builder, headers);
        let response = builder
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e, url))?;

        let status = response.status().as_u16();
        let response_headers = Self::convert_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e, url))?;

        tracing::trace!("{} -> {} ({} bytes)", url, status, body.len());
        Ok(Response::with_headers(status, response_headers, body))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, NetworkError> {
        self.send(self.client.get(url), url, headers).await
    }

    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, NetworkError> {
        let builder = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        self.send(builder, url, headers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_convert_headers() {
        let mut header_map = reqwest::header::HeaderMap::new();
        header_map.insert(
            reqwest::header::CONTENT_TYPE,
            "application/json".parse().unwrap(),
        );

        let headers = ReqwestHttpClient::convert_headers(&header_map);
        assert_eq!(
            headers.get("content-type"),
            Some(&"application/json".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_sends_headers_and_returns_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks/J1"))
            .and(header("Authorization", "Bearer a1"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"detail":"expired"}"#))
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::new();
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), "Bearer a1".to_string());

        let response = client
            .get(&format!("{}/api/v1/tasks/J1", server.uri()), &headers)
            .await
            .unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(response.text().unwrap(), r#"{"detail":"expired"}"#);
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"refresh_token":"r1"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::with_timeout(Duration::from_secs(5));
        let response = client
            .post(
                &format!("{}/api/v1/auth/refresh", server.uri()),
                r#"{"refresh_token":"r1"}"#,
                &Headers::new(),
            )
            .await
            .unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_get_connection_refused() {
        let client = ReqwestHttpClient::new();
        // Port 1 is never open
        let result = client.get("http://127.0.0.1:1/test", &Headers::new()).await;
        assert!(matches!(
            result,
            Err(NetworkError::ConnectionFailed { .. }) | Err(NetworkError::Other { .. })
        ));
    }
}
