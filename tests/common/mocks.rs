//! Mock adapters and scripted responses shared by the integration tests.

use std::sync::Arc;

pub use geoarchive::adapters::mock::{
    InMemoryCredentialStore, MockAuthApi, MockHttpClient, MockResponse, RefreshGate,
    ScriptedJobApi,
};
use geoarchive::auth::{CredentialCoordinator, LoginResponse, RefreshSettings, TokenPair, User};
use geoarchive::error::{NetworkError, TaskError};
use geoarchive::session::Backend;
use geoarchive::tasks::{JobStatus, TaskState};

pub const BASE_URL: &str = "http://api.test/api/v1";

pub fn running(progress: f64) -> Result<JobStatus, TaskError> {
    Ok(JobStatus::new(TaskState::Running)
        .with_message("Processing")
        .with_progress(progress))
}

pub fn succeeded(result: serde_json::Value) -> Result<JobStatus, TaskError> {
    Ok(JobStatus::new(TaskState::Succeeded)
        .with_progress(100.0)
        .with_result(result))
}

pub fn failed(error: &str) -> Result<JobStatus, TaskError> {
    Ok(JobStatus::new(TaskState::Failed).with_error(error))
}

pub fn unreachable() -> Result<JobStatus, TaskError> {
    Err(TaskError::Transport(NetworkError::ConnectionFailed {
        url: BASE_URL.to_string(),
        message: "connection refused".to_string(),
    }))
}

pub fn token_pair(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }
}

pub fn test_user() -> User {
    User {
        id: "3b241101-e2bb-4255-8caf-4136c566a962".to_string(),
        username: "alice".to_string(),
        email: Some("alice@example.com".to_string()),
        is_admin: false,
    }
}

pub fn login_response(access: &str, refresh: &str) -> LoginResponse {
    LoginResponse {
        access_token: access.to_string(),
        refresh_token: Some(refresh.to_string()),
        token_type: "bearer".to_string(),
        user: test_user(),
        expires_in: Some(1800),
    }
}

/// Coordinator over fresh mocks, holding `access`/`refresh`.
pub async fn coordinator_with(
    access: Option<&str>,
    refresh: Option<&str>,
) -> (CredentialCoordinator, MockAuthApi, InMemoryCredentialStore) {
    let auth = MockAuthApi::new();
    let store = InMemoryCredentialStore::new();
    let coordinator = CredentialCoordinator::new(Arc::new(auth.clone()), Arc::new(store.clone()));
    coordinator
        .set_tokens(access.map(str::to_string), refresh.map(str::to_string))
        .await
        .expect("in-memory store accepts writes");
    (coordinator, auth, store)
}

/// Session backend over the given mocks.
pub fn backend(
    http: &MockHttpClient,
    auth: &MockAuthApi,
    store: &InMemoryCredentialStore,
) -> Backend {
    Backend {
        http: Arc::new(http.clone()),
        auth: Arc::new(auth.clone()),
        store: Arc::new(store.clone()),
        base_url: BASE_URL.to_string(),
        settings: RefreshSettings::default(),
    }
}
