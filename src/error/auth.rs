//! Authentication-related error types.
//!
//! This module defines errors related to login, credential renewal and
//! credential storage.

use std::fmt;

use super::network::NetworkError;

/// Authentication-specific error variants.
///
/// `Clone` is required: a single renewal failure is fanned out to every
/// caller queued behind it.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// A renewal was needed but no refresh token is stored.
    NoRefreshTokenAvailable,

    /// The auth service rejected the refresh token.
    RefreshFailed { message: String },

    /// The in-flight renewal was abandoned before it settled.
    RefreshAbandoned,

    /// Username/password were rejected.
    InvalidCredentials { message: String },

    /// No session exists.
    NotAuthenticated,

    /// The session ended because renewal failed.
    SessionExpired,

    /// The request was already replayed once after a renewal and was rejected again.
    RetryExhausted,

    /// Credentials could not be loaded from the store.
    CredentialsLoadFailed { message: String },

    /// Credentials could not be saved to the store.
    CredentialsSaveFailed { message: String },

    /// Auth service returned an unexpected status.
    ApiError { status: u16, message: String },

    /// The auth service could not be reached.
    Transport(NetworkError),
}

impl AuthError {
    /// Check if this error might be resolved by signing in again.
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::NoRefreshTokenAvailable
                | AuthError::RefreshFailed { .. }
                | AuthError::RefreshAbandoned
                | AuthError::NotAuthenticated
                | AuthError::SessionExpired
                | AuthError::RetryExhausted
                | AuthError::ApiError { status: 401, .. }
        )
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::NoRefreshTokenAvailable | AuthError::SessionExpired => {
                "Your session has expired. Please sign in again.".to_string()
            }
            AuthError::RefreshFailed { .. } | AuthError::RefreshAbandoned => {
                "Failed to renew your session. Please sign in again.".to_string()
            }
            AuthError::InvalidCredentials { .. } => {
                "Invalid username or password.".to_string()
            }
            AuthError::NotAuthenticated => {
                "You are not signed in. Please sign in to continue.".to_string()
            }
            AuthError::RetryExhausted => {
                "The server rejected your session. Please sign in again.".to_string()
            }
            AuthError::CredentialsLoadFailed { .. } => {
                "Could not load your credentials. Please sign in again.".to_string()
            }
            AuthError::CredentialsSaveFailed { .. } => {
                "Could not save your credentials. Please check file permissions.".to_string()
            }
            AuthError::ApiError { status, message } => match *status {
                401 => "Your session has expired. Please sign in again.".to_string(),
                403 => "Access denied. You don't have permission for this action.".to_string(),
                _ => format!("Authentication error: {}", message),
            },
            AuthError::Transport(err) => err.user_message(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NoRefreshTokenAvailable => "E_AUTH_NO_REFRESH",
            AuthError::RefreshFailed { .. } => "E_AUTH_REFRESH_FAIL",
            AuthError::RefreshAbandoned => "E_AUTH_REFRESH_ABANDONED",
            AuthError::InvalidCredentials { .. } => "E_AUTH_INVALID",
            AuthError::NotAuthenticated => "E_AUTH_NOT_AUTH",
            AuthError::SessionExpired => "E_AUTH_EXPIRED",
            AuthError::RetryExhausted => "E_AUTH_RETRY",
            AuthError::CredentialsLoadFailed { .. } => "E_AUTH_CRED_LOAD",
            AuthError::CredentialsSaveFailed { .. } => "E_AUTH_CRED_SAVE",
            AuthError::ApiError { .. } => "E_AUTH_API",
            AuthError::Transport(_) => "E_AUTH_TRANSPORT",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NoRefreshTokenAvailable => write!(f, "No refresh token available"),
            AuthError::RefreshFailed { message } => write!(f, "Token refresh failed: {}", message),
            AuthError::RefreshAbandoned => write!(f, "Token refresh was abandoned"),
            AuthError::InvalidCredentials { message } => {
                write!(f, "Invalid credentials: {}", message)
            }
            AuthError::NotAuthenticated => write!(f, "Not authenticated"),
            AuthError::SessionExpired => write!(f, "Session expired"),
            AuthError::RetryExhausted => write!(f, "Request rejected again after token refresh"),
            AuthError::CredentialsLoadFailed { message } => {
                write!(f, "Failed to load credentials: {}", message)
            }
            AuthError::CredentialsSaveFailed { message } => {
                write!(f, "Failed to save credentials: {}", message)
            }
            AuthError::ApiError { status, message } => {
                write!(f, "Auth API error ({}): {}", status, message)
            }
            AuthError::Transport(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NetworkError> for AuthError {
    fn from(err: NetworkError) -> Self {
        AuthError::Transport(err)
    }
}
