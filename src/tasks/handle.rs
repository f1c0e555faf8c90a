//! Caller-side view of a tracked task.

use tokio::sync::{oneshot, watch};

use super::model::{CancelAck, TrackedTask};
use super::monitor::{TaskMonitor, TaskOutcome};
use crate::error::TaskError;

/// Read-only view of a tracked task plus the capability to cancel it.
///
/// Progress is available as a `watch` stream via [`subscribe`](Self::subscribe);
/// the final outcome settles exactly once via [`wait`](Self::wait).
#[derive(Debug)]
pub struct TrackedTaskHandle {
    id: String,
    snapshot: watch::Receiver<TrackedTask>,
    outcome: oneshot::Receiver<TaskOutcome>,
    monitor: TaskMonitor,
}

impl TrackedTaskHandle {
    pub(crate) fn new(
        id: String,
        snapshot: watch::Receiver<TrackedTask>,
        outcome: oneshot::Receiver<TaskOutcome>,
        monitor: TaskMonitor,
    ) -> Self {
        Self {
            id,
            snapshot,
            outcome,
            monitor,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest published state of the task.
    pub fn snapshot(&self) -> TrackedTask {
        self.snapshot.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.snapshot.borrow().is_active()
    }

    /// A progress stream that yields every applied poll.
    pub fn subscribe(&self) -> watch::Receiver<TrackedTask> {
        self.snapshot.clone()
    }

    /// Wait for the task to settle.
    ///
    /// Resolves with the final task on success. Remote failure, timeout and
    /// cancellation resolve with the matching [`TaskError`]; a local `stop`
    /// resolves with `TaskError::Stopped`.
    pub async fn wait(self) -> Result<TrackedTask, TaskError> {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskError::Stopped { job_id: self.id }),
        }
    }

    /// Request remote cancellation and stop monitoring.
    pub async fn cancel(&self) -> Result<CancelAck, TaskError> {
        self.monitor.cancel(&self.id).await
    }

    /// Stop monitoring locally.
    pub fn stop(&self) {
        self.monitor.stop(&self.id);
    }
}
