//! Authentication for the geoarchive client.
//!
//! This module provides:
//! - Credential pair and auth service payload types
//! - Unverified JWT expiry inspection for proactive renewal
//! - The single-flight [`CredentialCoordinator`]

pub mod coordinator;
pub mod credentials;
pub mod jwt;

pub use coordinator::{
    CredentialCoordinator, RefreshSettings, RetryableRequest, SessionEvent, SweepOutcome,
    PROACTIVE_REFRESH_THRESHOLD, SWEEP_PERIOD,
};
pub use credentials::{CredentialPair, LoginResponse, TokenPair, User};
pub use jwt::{jwt_expiry, jwt_remaining_secs};
