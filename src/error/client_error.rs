//! Unified error type for the geoarchive client.

use std::fmt;

use super::auth::AuthError;
use super::category::ErrorCategory;
use super::context::ErrorContext;
use super::network::NetworkError;
use super::task::TaskError;
use crate::traits::StoreError;

/// Unified error type for the geoarchive client.
///
/// `ClientError` consolidates the domain-specific error types into a single
/// enum so the CLI and embedding applications can categorize and report any
/// failure uniformly.
#[derive(Debug)]
pub enum ClientError {
    /// Network-related errors (connections, HTTP, timeouts).
    Network(NetworkError),

    /// Authentication/session errors.
    Auth(AuthError),

    /// Task monitoring errors.
    Task(TaskError),

    /// Credential store errors.
    Store(StoreError),

    /// Invalid or missing configuration.
    Config { message: String },

    /// Wrapped error with additional context.
    WithContext {
        error: Box<ClientError>,
        context: ErrorContext,
    },
}

impl ClientError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Network(_) => ErrorCategory::Network,
            ClientError::Auth(AuthError::Transport(_)) => ErrorCategory::Network,
            ClientError::Auth(AuthError::CredentialsLoadFailed { .. })
            | ClientError::Auth(AuthError::CredentialsSaveFailed { .. }) => ErrorCategory::System,
            ClientError::Auth(_) => ErrorCategory::Auth,
            ClientError::Task(err) => match err {
                TaskError::Transport(_) => ErrorCategory::Network,
                TaskError::Auth(_) => ErrorCategory::Auth,
                TaskError::RemoteFailure { .. } | TaskError::Timeout { .. } => {
                    ErrorCategory::Server
                }
                TaskError::EmptyJobId
                | TaskError::UnknownTask { .. }
                | TaskError::Cancelled { .. }
                | TaskError::Stopped { .. } => ErrorCategory::Client,
            },
            ClientError::Store(_) => ErrorCategory::System,
            ClientError::Config { .. } => ErrorCategory::Configuration,
            ClientError::WithContext { error, .. } => error.category(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(err) => err.is_retryable(),
            ClientError::WithContext { error, .. } => error.is_retryable(),
            other => other.category().is_retryable(),
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(err) => err.user_message(),
            ClientError::Auth(err) => err.user_message(),
            ClientError::Task(err) => err.user_message(),
            ClientError::Store(err) => format!("Credential storage problem: {}", err),
            ClientError::Config { message } => format!("Configuration problem: {}", message),
            ClientError::WithContext { error, context } => {
                format!("{}\n\nContext: {}", error.user_message(), context)
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Network(err) => err.error_code(),
            ClientError::Auth(err) => err.error_code(),
            ClientError::Task(err) => err.error_code(),
            ClientError::Store(_) => "E_STORE",
            ClientError::Config { .. } => "E_CONFIG",
            ClientError::WithContext { error, .. } => error.error_code(),
        }
    }

    /// Attach context to this error.
    pub fn with_context(self, ctx: ErrorContext) -> Self {
        ClientError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    /// Get the context if this error has one attached.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ClientError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the inner error without context.
    pub fn inner(&self) -> &ClientError {
        match self {
            ClientError::WithContext { error, .. } => error.inner(),
            _ => self,
        }
    }

    /// Consume the error and drop any attached context.
    pub fn into_inner(self) -> ClientError {
        match self {
            ClientError::WithContext { error, .. } => (*error).into_inner(),
            other => other,
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }

    /// Check if this error requires signing in again.
    pub fn requires_reauth(&self) -> bool {
        match self {
            ClientError::Auth(err) => err.requires_reauth(),
            ClientError::Task(TaskError::Auth(err)) => err.requires_reauth(),
            ClientError::Network(err) => err.is_unauthorized(),
            ClientError::WithContext { error, .. } => error.requires_reauth(),
            _ => false,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Network(err) => write!(f, "{}", err),
            ClientError::Auth(err) => write!(f, "{}", err),
            ClientError::Task(err) => write!(f, "{}", err),
            ClientError::Store(err) => write!(f, "{}", err),
            ClientError::Config { message } => write!(f, "Configuration error: {}", message),
            ClientError::WithContext { error, context } => write!(f, "{} ({})", error, context),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Network(err) => Some(err),
            ClientError::Auth(err) => Some(err),
            ClientError::Task(err) => Some(err),
            ClientError::Store(err) => Some(err),
            ClientError::Config { .. } => None,
            ClientError::WithContext { error, .. } => error.source(),
        }
    }
}

// ============================================================================
// From implementations for automatic error conversion
// ============================================================================

impl From<NetworkError> for ClientError {
    fn from(err: NetworkError) -> Self {
        ClientError::Network(err)
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        ClientError::Auth(err)
    }
}

impl From<TaskError> for ClientError {
    fn from(err: TaskError) -> Self {
        ClientError::Task(err)
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        ClientError::Store(err)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Store(StoreError::Io(err.to_string()))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Network(NetworkError::InvalidResponse {
            message: err.to_string(),
        })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        ClientError::Network(super::network::classify_reqwest_error(&err, &url))
    }
}

impl From<ClientError> for TaskError {
    fn from(err: ClientError) -> Self {
        match err.into_inner() {
            ClientError::Network(err) => TaskError::Transport(err),
            ClientError::Auth(err) => TaskError::Auth(err),
            ClientError::Task(err) => err,
            other => TaskError::Transport(NetworkError::Other {
                message: other.to_string(),
            }),
        }
    }
}

impl From<ClientError> for AuthError {
    fn from(err: ClientError) -> Self {
        match err.into_inner() {
            ClientError::Network(err) => AuthError::Transport(err),
            ClientError::Auth(err) => err,
            ClientError::Task(TaskError::Auth(err)) => err,
            other => AuthError::Transport(NetworkError::Other {
                message: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_categories() {
        let unknown: ClientError = TaskError::UnknownTask {
            job_id: "J1".to_string(),
        }
        .into();
        assert_eq!(unknown.category(), ErrorCategory::Client);
        assert!(!unknown.is_retryable());

        let failed: ClientError = TaskError::RemoteFailure {
            job_id: "J1".to_string(),
            message: "gdal crashed".to_string(),
        }
        .into();
        assert_eq!(failed.category(), ErrorCategory::Server);
    }

    #[test]
    fn test_auth_transport_is_network() {
        let err: ClientError = AuthError::Transport(NetworkError::ConnectionFailed {
            url: "http://localhost".to_string(),
            message: "refused".to_string(),
        })
        .into();
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_with_context_delegates() {
        let err: ClientError = AuthError::SessionExpired.into();
        let err = err.with_context(ErrorContext::new("poll_task").with_job_id("J1"));

        assert!(err.context().is_some());
        assert_eq!(err.error_code(), "E_AUTH_EXPIRED");
        assert!(err.requires_reauth());
        assert!(matches!(err.inner(), ClientError::Auth(AuthError::SessionExpired)));
        assert!(err.to_string().contains("[poll_task] job=J1"));
    }

    #[test]
    fn test_into_task_error_strips_context() {
        let err: ClientError = AuthError::SessionExpired.into();
        let err = err.with_context(ErrorContext::new("poll"));
        assert_eq!(TaskError::from(err), TaskError::Auth(AuthError::SessionExpired));
    }

    #[test]
    fn test_unauthorized_network_requires_reauth() {
        let err: ClientError = NetworkError::HttpStatus {
            status: 401,
            message: "token expired".to_string(),
        }
        .into();
        assert!(err.requires_reauth());
    }
}
