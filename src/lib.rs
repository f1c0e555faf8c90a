//! geoarchive - client-side task monitoring and credential refresh for the
//! geoarchive API.
//!
//! This library exposes modules for use in integration tests and by the
//! `geoarchive` CLI.

pub mod adapters;
pub mod auth;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod tasks;
pub mod traits;
