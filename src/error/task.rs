//! Task monitoring error types.
//!
//! These errors stay local to a single tracked task. Poll-loop failures are
//! never thrown out of the loop; they end up on the task's `error` field and
//! in its `on_error` notification. Only `EmptyJobId` and `UnknownTask` are
//! returned to a direct caller.

use std::fmt;

use super::auth::AuthError;
use super::network::NetworkError;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskError {
    /// `track` was called with an empty job id.
    EmptyJobId,

    /// The operation referenced an id that is not tracked or no longer active.
    UnknownTask { job_id: String },

    /// The task did not reach a terminal state within `max_wait`.
    Timeout { job_id: String, waited_ms: u64 },

    /// The remote job reported a business failure.
    RemoteFailure { job_id: String, message: String },

    /// Polling or cancelling failed at the transport level.
    Transport(NetworkError),

    /// The request could not be authorized (session expired mid-poll).
    Auth(AuthError),

    /// The task was cancelled, locally or by the service.
    Cancelled { job_id: String },

    /// Monitoring was stopped locally before the task settled.
    Stopped { job_id: String },
}

impl TaskError {
    pub fn user_message(&self) -> String {
        match self {
            TaskError::EmptyJobId => "No task id was provided.".to_string(),
            TaskError::UnknownTask { .. } => {
                "That task is not being monitored anymore.".to_string()
            }
            TaskError::Timeout { .. } => {
                "The task is taking longer than expected. Check back later.".to_string()
            }
            TaskError::RemoteFailure { message, .. } => format!("The task failed: {}", message),
            TaskError::Transport(err) => err.user_message(),
            TaskError::Auth(err) => err.user_message(),
            TaskError::Cancelled { .. } => "The task was cancelled.".to_string(),
            TaskError::Stopped { .. } => "Monitoring of this task was stopped.".to_string(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            TaskError::EmptyJobId => "E_TASK_EMPTY_ID",
            TaskError::UnknownTask { .. } => "E_TASK_UNKNOWN",
            TaskError::Timeout { .. } => "E_TASK_TIMEOUT",
            TaskError::RemoteFailure { .. } => "E_TASK_REMOTE",
            TaskError::Transport(_) => "E_TASK_TRANSPORT",
            TaskError::Auth(_) => "E_TASK_AUTH",
            TaskError::Cancelled { .. } => "E_TASK_CANCELLED",
            TaskError::Stopped { .. } => "E_TASK_STOPPED",
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::EmptyJobId => write!(f, "Job id must not be empty"),
            TaskError::UnknownTask { job_id } => write!(f, "Unknown task: {}", job_id),
            TaskError::Timeout { job_id, waited_ms } => {
                write!(f, "Task {} timed out after {} ms", job_id, waited_ms)
            }
            TaskError::RemoteFailure { job_id, message } => {
                write!(f, "Task {} failed: {}", job_id, message)
            }
            TaskError::Transport(err) => write!(f, "{}", err),
            TaskError::Auth(err) => write!(f, "{}", err),
            TaskError::Cancelled { job_id } => write!(f, "Task {} was cancelled", job_id),
            TaskError::Stopped { job_id } => write!(f, "Monitoring of task {} was stopped", job_id),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::Transport(err) => Some(err),
            TaskError::Auth(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NetworkError> for TaskError {
    fn from(err: NetworkError) -> Self {
        TaskError::Transport(err)
    }
}

impl From<AuthError> for TaskError {
    fn from(err: AuthError) -> Self {
        TaskError::Auth(err)
    }
}
