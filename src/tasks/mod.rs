//! Background task monitoring.
//!
//! Long-running server operations (raster conversion, georeferencing) run as
//! remote jobs. [`TaskMonitor`] polls each job until it settles and reports
//! progress through callbacks, a `watch` stream and a settle-once outcome.

pub mod handle;
pub mod model;
pub mod monitor;
pub mod options;

pub use handle::TrackedTaskHandle;
pub use model::{
    CancelAck, JobKind, JobStatus, TaskState, TrackedTask, PENDING_MESSAGE, TIMEOUT_MESSAGE,
};
pub use monitor::{TaskMonitor, TaskOutcome};
pub use options::{TaskCallback, TrackOptions, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL};
