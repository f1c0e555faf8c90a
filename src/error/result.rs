//! Result type alias for client operations.

use super::client_error::ClientError;
use super::context::ErrorContext;

/// Type alias for Results using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;

/// Extension trait for Result types to add context to errors.
///
/// # Example
///
/// ```ignore
/// use geoarchive::error::{ErrorContext, ResultExt};
///
/// monitor.cancel(&job_id).await
///     .context(ErrorContext::new("cancel").with_job_id(&job_id))?;
/// ```
pub trait ResultExt<T> {
    /// Add context to an error if the result is Err.
    fn context(self, ctx: ErrorContext) -> ClientResult<T>;

    /// Add context using a closure (only called on error).
    fn with_context<F>(self, f: F) -> ClientResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ClientError>,
{
    fn context(self, ctx: ErrorContext) -> ClientResult<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }

    fn with_context<F>(self, f: F) -> ClientResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
