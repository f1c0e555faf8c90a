//! Task domain types: states, remote status snapshots and job kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message shown for a task that has not been picked up yet.
pub const PENDING_MESSAGE: &str = "Task is waiting to be processed";

/// Error recorded on a task whose `max_wait` elapsed.
pub const TIMEOUT_MESSAGE: &str = "Task monitoring timeout";

/// Lifecycle state of a tracked task.
///
/// `Pending → Running → {Succeeded | Failed | TimedOut | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending | TaskState::Running)
    }

    /// Map a remote (Celery-style) state string onto the enum.
    ///
    /// Unknown states count as running so that the task keeps being polled
    /// until it settles or `max_wait` elapses.
    pub fn from_remote(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "PENDING" => TaskState::Pending,
            "STARTED" | "PROGRESS" | "RETRY" | "RUNNING" => TaskState::Running,
            "SUCCESS" | "SUCCEEDED" => TaskState::Succeeded,
            "FAILURE" | "FAILED" | "ERROR" => TaskState::Failed,
            "REVOKED" | "CANCELLED" => TaskState::Cancelled,
            _ => TaskState::Running,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::TimedOut => "timed_out",
            TaskState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status report from the remote job service.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: TaskState,
    pub message: Option<String>,
    pub progress: Option<f64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            progress: None,
            result: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Acknowledgement returned by a remote cancel request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelAck {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Kinds of long-running server operations the client can start.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    /// Convert a tree item into a geo-referenced raster.
    GeoRasterConversion { item_id: String },
    /// Apply georeferencing control points to an uploaded file.
    Georeferencing {
        file_id: String,
        request: serde_json::Value,
    },
}

impl JobKind {
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::GeoRasterConversion { .. } => "Conversion",
            JobKind::Georeferencing { .. } => "Georeferencing",
        }
    }

    /// Id of the item the job operates on.
    pub fn subject_id(&self) -> &str {
        match self {
            JobKind::GeoRasterConversion { item_id } => item_id,
            JobKind::Georeferencing { file_id, .. } => file_id,
        }
    }
}

/// Read-only view of a monitored background job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedTask {
    pub id: String,
    pub state: TaskState,
    pub status_message: String,
    pub progress: f64,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) registered: bool,
}

impl TrackedTask {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: TaskState::Pending,
            status_message: PENDING_MESSAGE.to_string(),
            progress: 0.0,
            result: None,
            error: None,
            started_at: Utc::now(),
            registered: true,
        }
    }

    /// True while the task is registered and not terminal.
    pub fn is_active(&self) -> bool {
        self.registered && !self.state.is_terminal()
    }

    /// Overwrite the mutable fields from a poll response.
    pub(crate) fn apply(&mut self, status: JobStatus) {
        self.state = status.state;
        self.status_message = status.message.unwrap_or_default();
        self.progress = status.progress.unwrap_or(0.0);
        self.result = status.result;
        self.error = status.error;
    }
}
