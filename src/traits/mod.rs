//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP client operations (GET, POST)
//! - [`CredentialStore`] - durable credential key/value storage
//! - [`JobApi`] - remote job service (start, status, cancel)
//! - [`AuthApi`] - remote auth service (login, refresh)

pub mod auth;
pub mod credentials;
pub mod http;
pub mod jobs;

pub use auth::AuthApi;
pub use credentials::{CredentialKey, CredentialStore, StoreError};
pub use http::{Headers, HttpClient, Response};
pub use jobs::JobApi;
