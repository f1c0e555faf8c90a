//! Mock implementations for testing.
//!
//! This module provides mock implementations of all trait abstractions,
//! enabling unit testing without network dependencies or file system access.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses
//! - [`InMemoryCredentialStore`] - In-memory credential storage
//! - [`ScriptedJobApi`] - Job API replaying scripted status responses
//! - [`MockAuthApi`] - Auth API with configurable results and a refresh gate

pub mod auth;
pub mod credentials;
pub mod http;
pub mod jobs;

pub use auth::{MockAuthApi, RefreshGate};
pub use credentials::InMemoryCredentialStore;
pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use jobs::ScriptedJobApi;
