//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`FileCredentialStore`] - JSON file credential storage
//! - [`HttpJobApi`] - job endpoints, through the authorized dispatcher
//! - [`HttpAuthApi`] - login and refresh endpoints
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockHttpClient`] - Configurable HTTP responses
//! - [`mock::InMemoryCredentialStore`] - In-memory credential storage
//! - [`mock::ScriptedJobApi`] - Scripted job status sequences
//! - [`mock::MockAuthApi`] - Configurable auth results

pub mod file_credentials;
pub mod http_auth;
pub mod http_jobs;
pub mod mock;
pub mod reqwest_http;

pub use file_credentials::FileCredentialStore;
pub use http_auth::HttpAuthApi;
pub use http_jobs::HttpJobApi;
pub use mock::{InMemoryCredentialStore, MockAuthApi, MockHttpClient, ScriptedJobApi};
pub use reqwest_http::ReqwestHttpClient;
