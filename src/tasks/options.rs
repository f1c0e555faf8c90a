//! Per-task monitoring options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::model::TrackedTask;
use crate::config::ClientConfig;

/// Default delay between two polls of the same task.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Default time after which a task that never settles is timed out.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(300_000);

/// Callback invoked with a snapshot of the task.
pub type TaskCallback = Arc<dyn Fn(&TrackedTask) + Send + Sync>;

/// Options for [`TaskMonitor::track`](super::TaskMonitor::track).
///
/// `on_progress` fires after every applied poll, including the terminal
/// one. `on_complete` and `on_error` fire at most once, and never both.
#[derive(Clone)]
pub struct TrackOptions {
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub on_progress: Option<TaskCallback>,
    pub on_complete: Option<TaskCallback>,
    pub on_error: Option<TaskCallback>,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            on_progress: None,
            on_complete: None,
            on_error: None,
        }
    }
}

impl fmt::Debug for TrackOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackOptions")
            .field("poll_interval", &self.poll_interval)
            .field("max_wait", &self.max_wait)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl TrackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timing defaults taken from the client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            max_wait: config.max_wait,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TrackedTask) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TrackedTask) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TrackedTask) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TrackOptions::default();
        assert_eq!(options.poll_interval, Duration::from_secs(2));
        assert_eq!(options.max_wait, Duration::from_secs(300));
        assert!(options.on_progress.is_none());
    }

    #[test]
    fn test_from_config() {
        let config = ClientConfig::default()
            .with_poll_interval(Duration::from_millis(500))
            .with_max_wait(Duration::from_secs(10));
        let options = TrackOptions::from_config(&config);
        assert_eq!(options.poll_interval, Duration::from_millis(500));
        assert_eq!(options.max_wait, Duration::from_secs(10));
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let options = TrackOptions::new().on_complete(|_| {});
        let debug = format!("{:?}", options);
        assert!(debug.contains("on_complete: true"));
        assert!(debug.contains("on_error: false"));
    }
}
