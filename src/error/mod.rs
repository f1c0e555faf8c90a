//! Unified error handling for the geoarchive client.
//!
//! - **Error Categories**: high-level classification for handling decisions
//! - **Domain-specific Errors**: network, task monitoring and auth errors
//! - **Unified Error Type**: `ClientError` consolidates all error types
//! - **Error Context**: debugging information attached to errors
//! - **Result Type Alias**: `ClientResult<T>`
//!
//! | Error | Surfaced to | Notes |
//! |-------|-------------|-------|
//! | `NetworkError` | caller / task | transport failure reaching a remote |
//! | `TaskError::Timeout` | task `on_error` | `max_wait` exceeded |
//! | `TaskError::RemoteFailure` | task `on_error` | job reported failure |
//! | `TaskError::UnknownTask` | direct caller | id not in the registry |
//! | `AuthError::NoRefreshTokenAvailable` | direct caller | no network call made |
//! | other `AuthError` | every queued waiter + session | forces logout |

mod auth;
mod category;
mod client_error;
mod context;
mod network;
mod result;
mod task;

pub use auth::AuthError;
pub use category::ErrorCategory;
pub use client_error::ClientError;
pub use context::ErrorContext;
pub use network::{classify_reqwest_error, NetworkError};
pub use result::{ClientResult, ResultExt};
pub use task::TaskError;
