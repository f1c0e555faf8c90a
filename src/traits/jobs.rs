//! Remote job service trait abstraction.

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::{CancelAck, JobKind, JobStatus};

/// Remote job API: start, inspect and cancel long-running server jobs.
///
/// Errors are reported as [`TaskError`] so the monitor can record them on the
/// task without further mapping; transport problems arrive as
/// `TaskError::Transport`, an expired session as `TaskError::Auth`.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Start a job and return its identifier.
    async fn start_job(&self, kind: &JobKind) -> Result<String, TaskError>;

    /// Fetch the current status of a job.
    async fn get_status(&self, job_id: &str) -> Result<JobStatus, TaskError>;

    /// Ask the service to cancel a job.
    async fn cancel(&self, job_id: &str) -> Result<CancelAck, TaskError>;
}
