//! Polling state machine for remote background jobs.
//!
//! Every tracked job gets one spawned poll loop. The loop polls immediately,
//! applies each response to the task, and then sleeps `poll_interval` before
//! the next poll, so polls of one task never overlap. The loop ends on a
//! terminal state, a timeout, a transport failure, or when the task is
//! stopped or cancelled.
//!
//! Responses are applied under the registry lock and only if the task is
//! still registered under the same generation, so a response that arrives
//! after `stop` is discarded.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::handle::TrackedTaskHandle;
use super::model::{CancelAck, JobKind, JobStatus, TaskState, TrackedTask, TIMEOUT_MESSAGE};
use super::options::{TaskCallback, TrackOptions};
use crate::error::TaskError;
use crate::traits::JobApi;

/// Settle-once result of a tracked task.
pub type TaskOutcome = Result<TrackedTask, TaskError>;

struct TaskEntry {
    generation: u64,
    cancel: CancellationToken,
    snapshot: watch::Sender<TrackedTask>,
    outcome: Option<oneshot::Sender<TaskOutcome>>,
}

impl TaskEntry {
    fn current(&self) -> TrackedTask {
        self.snapshot.borrow().clone()
    }
}

struct MonitorInner {
    api: Arc<dyn JobApi>,
    registry: Mutex<HashMap<String, TaskEntry>>,
    next_generation: AtomicU64,
}

/// A poll response that made it into the registry.
struct Applied {
    task: TrackedTask,
    /// Present when the response was terminal and the task was deregistered.
    outcome: Option<oneshot::Sender<TaskOutcome>>,
}

impl MonitorInner {
    fn registry(&self) -> MutexGuard<'_, HashMap<String, TaskEntry>> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a poll response if the task is still ours.
    fn apply_status(
        &self,
        job_id: &str,
        generation: u64,
        cancel: &CancellationToken,
        status: JobStatus,
    ) -> Option<Applied> {
        let mut registry = self.registry();
        let entry = registry.get(job_id)?;
        if entry.generation != generation || cancel.is_cancelled() {
            return None;
        }

        if !status.state.is_terminal() {
            entry.snapshot.send_modify(|task| task.apply(status));
            return Some(Applied {
                task: entry.current(),
                outcome: None,
            });
        }

        let mut entry = registry.remove(job_id)?;
        entry.snapshot.send_modify(|task| {
            task.apply(status);
            task.registered = false;
        });
        Some(Applied {
            task: entry.current(),
            outcome: entry.outcome.take(),
        })
    }

    /// Force the task into a terminal state and deregister it.
    fn finish(
        &self,
        job_id: &str,
        generation: u64,
        cancel: &CancellationToken,
        mutate: impl FnOnce(&mut TrackedTask),
    ) -> Option<Applied> {
        let mut registry = self.registry();
        match registry.get(job_id) {
            Some(entry) if entry.generation == generation && !cancel.is_cancelled() => {}
            _ => return None,
        }
        let mut entry = registry.remove(job_id)?;
        entry.snapshot.send_modify(|task| {
            mutate(task);
            task.registered = false;
        });
        Some(Applied {
            task: entry.current(),
            outcome: entry.outcome.take(),
        })
    }
}

/// Tracks remote jobs until they settle.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct TaskMonitor {
    inner: Arc<MonitorInner>,
}

impl fmt::Debug for TaskMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskMonitor")
            .field("tracked", &self.inner.registry().len())
            .finish()
    }
}

impl TaskMonitor {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                api,
                registry: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Start monitoring `job_id`. The first poll fires without delay.
    ///
    /// Tracking an id that is already tracked replaces the previous monitor
    /// of that id; its poll loop is stopped and its `wait` resolves with
    /// `TaskError::Stopped`.
    pub fn track(
        &self,
        job_id: impl Into<String>,
        options: TrackOptions,
    ) -> Result<TrackedTaskHandle, TaskError> {
        let job_id = job_id.into();
        if job_id.trim().is_empty() {
            return Err(TaskError::EmptyJobId);
        }

        let (snapshot_tx, snapshot_rx) = watch::channel(TrackedTask::new(job_id.clone()));
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        let replaced = self.inner.registry().insert(
            job_id.clone(),
            TaskEntry {
                generation,
                cancel: cancel.clone(),
                snapshot: snapshot_tx,
                outcome: Some(outcome_tx),
            },
        );
        if let Some(old) = replaced {
            tracing::warn!("Task {} was already tracked, replacing its monitor", job_id);
            deactivate(old);
        }

        tokio::spawn(run_poll_loop(
            self.inner.clone(),
            job_id.clone(),
            generation,
            cancel,
            options,
        ));

        Ok(TrackedTaskHandle::new(
            job_id,
            snapshot_rx,
            outcome_rx,
            self.clone(),
        ))
    }

    /// Start a job on the service and track it.
    pub async fn start_and_track(
        &self,
        kind: &JobKind,
        options: TrackOptions,
    ) -> Result<TrackedTaskHandle, TaskError> {
        let job_id = self.inner.api.start_job(kind).await?;
        tracing::info!(
            "{} job {} started for {}",
            kind.label(),
            job_id,
            kind.subject_id()
        );
        self.track(job_id, options)
    }

    /// Ask the service to cancel the job, then stop monitoring it.
    ///
    /// Local monitoring stops whatever the remote outcome; the remote
    /// outcome is returned. The task ends as `Cancelled` without firing
    /// `on_complete` or `on_error`.
    pub async fn cancel(&self, job_id: &str) -> Result<CancelAck, TaskError> {
        let generation = {
            let registry = self.inner.registry();
            match registry.get(job_id) {
                Some(entry) if entry.current().is_active() => entry.generation,
                _ => {
                    return Err(TaskError::UnknownTask {
                        job_id: job_id.to_string(),
                    })
                }
            }
        };

        let remote = self.inner.api.cancel(job_id).await;
        if let Err(e) = &remote {
            tracing::warn!("Remote cancel of task {} failed: {}", job_id, e);
        }

        let entry = {
            let mut registry = self.inner.registry();
            let same_task = registry
                .get(job_id)
                .is_some_and(|entry| entry.generation == generation);
            if same_task {
                registry.remove(job_id)
            } else {
                None
            }
        };
        if let Some(mut entry) = entry {
            entry.cancel.cancel();
            entry.snapshot.send_modify(|task| {
                task.state = TaskState::Cancelled;
                task.registered = false;
            });
            if let Some(outcome) = entry.outcome.take() {
                let _ = outcome.send(Err(TaskError::Cancelled {
                    job_id: job_id.to_string(),
                }));
            }
            tracing::info!("Cancelled task {}", job_id);
        }

        remote
    }

    /// Stop monitoring locally. Unknown ids are ignored.
    pub fn stop(&self, job_id: &str) {
        let entry = self.inner.registry().remove(job_id);
        if let Some(entry) = entry {
            tracing::debug!("Stopped monitoring task {}", job_id);
            deactivate(entry);
        }
    }

    /// Stop every tracked task.
    pub fn stop_all(&self) {
        let entries: Vec<(String, TaskEntry)> = self.inner.registry().drain().collect();
        if !entries.is_empty() {
            tracing::debug!("Stopping {} tracked task(s)", entries.len());
        }
        for (_, entry) in entries {
            deactivate(entry);
        }
    }

    /// Current state of a tracked task. Settled tasks are no longer tracked.
    pub fn query(&self, job_id: &str) -> Option<TrackedTask> {
        self.inner.registry().get(job_id).map(TaskEntry::current)
    }

    pub fn list_active(&self) -> Vec<TrackedTask> {
        self.inner
            .registry()
            .values()
            .map(TaskEntry::current)
            .filter(TrackedTask::is_active)
            .collect()
    }
}

/// Cancel an entry's loop and mark it inactive. Dropping the outcome
/// sender resolves `wait` with `Stopped`.
fn deactivate(entry: TaskEntry) {
    entry.cancel.cancel();
    entry.snapshot.send_modify(|task| task.registered = false);
}

fn fire(callback: &Option<TaskCallback>, task: &TrackedTask) {
    if let Some(callback) = callback {
        callback(task);
    }
}

async fn run_poll_loop(
    inner: Arc<MonitorInner>,
    job_id: String,
    generation: u64,
    cancel: CancellationToken,
    options: TrackOptions,
) {
    let started = Instant::now();
    tracing::info!(
        "Monitoring task {} (interval: {}ms, max wait: {}ms)",
        job_id,
        options.poll_interval.as_millis(),
        options.max_wait.as_millis()
    );

    loop {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            response = inner.api.get_status(&job_id) => response,
        };

        let status = match response {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Polling task {} failed: {}", job_id, e);
                let message = e.to_string();
                if let Some(applied) = inner.finish(&job_id, generation, &cancel, |task| {
                    task.state = TaskState::Failed;
                    task.error = Some(message);
                }) {
                    fire(&options.on_error, &applied.task);
                    settle(applied.outcome, Err(e));
                }
                break;
            }
        };

        let Some(applied) = inner.apply_status(&job_id, generation, &cancel, status) else {
            tracing::debug!("Discarding poll response for stopped task {}", job_id);
            break;
        };
        let task = applied.task;
        tracing::trace!(
            "Task {} is {} ({:.0}%)",
            job_id,
            task.state,
            task.progress
        );

        if !cancel.is_cancelled() {
            fire(&options.on_progress, &task);
        }

        if task.state.is_terminal() {
            tracing::info!("Task {} finished: {}", job_id, task.state);
            let outcome = match task.state {
                TaskState::Succeeded => {
                    fire(&options.on_complete, &task);
                    Ok(task)
                }
                TaskState::Cancelled => {
                    fire(&options.on_error, &task);
                    Err(TaskError::Cancelled {
                        job_id: job_id.clone(),
                    })
                }
                _ => {
                    fire(&options.on_error, &task);
                    Err(TaskError::RemoteFailure {
                        job_id: job_id.clone(),
                        message: task
                            .error
                            .clone()
                            .unwrap_or_else(|| task.status_message.clone()),
                    })
                }
            };
            settle(applied.outcome, outcome);
            break;
        }

        let waited = started.elapsed();
        if waited > options.max_wait {
            tracing::warn!(
                "Task {} timed out after {}ms",
                job_id,
                waited.as_millis()
            );
            if let Some(applied) = inner.finish(&job_id, generation, &cancel, |task| {
                task.state = TaskState::TimedOut;
                task.error = Some(TIMEOUT_MESSAGE.to_string());
            }) {
                fire(&options.on_error, &applied.task);
                settle(
                    applied.outcome,
                    Err(TaskError::Timeout {
                        job_id: job_id.clone(),
                        waited_ms: waited.as_millis() as u64,
                    }),
                );
            }
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(options.poll_interval) => {}
        }
    }

    tracing::debug!("Poll loop for task {} ended", job_id);
}

fn settle(sender: Option<oneshot::Sender<TaskOutcome>>, outcome: TaskOutcome) {
    if let Some(sender) = sender {
        // The handle may already be gone.
        let _ = sender.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::ScriptedJobApi;
    use crate::error::NetworkError;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn running(progress: f64) -> JobStatus {
        JobStatus::new(TaskState::Running)
            .with_progress(progress)
            .with_message("Processing")
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&TrackedTask) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move |_: &TrackedTask| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_empty_job_id_is_rejected() {
        let monitor = TaskMonitor::new(Arc::new(ScriptedJobApi::new()));
        assert!(matches!(
            monitor.track("", TrackOptions::default()),
            Err(TaskError::EmptyJobId)
        ));
        assert!(monitor.list_active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_is_immediate() {
        let api = Arc::new(ScriptedJobApi::new());
        api.script("J1", vec![Ok(running(10.0))]);
        let monitor = TaskMonitor::new(api.clone());

        let handle = monitor
            .track("J1", TrackOptions::default().with_poll_interval(Duration::from_secs(60)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(api.poll_count("J1"), 1);
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.state, TaskState::Running);
        assert_eq!(snapshot.progress, 10.0);
        assert_eq!(snapshot.status_message, "Processing");
        assert!(snapshot.is_active());
        monitor.stop_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_fires_on_error_once() {
        let api = Arc::new(ScriptedJobApi::new());
        api.script(
            "J2",
            vec![
                Ok(running(20.0)),
                Ok(JobStatus::new(TaskState::Failed).with_error("bad raster")),
            ],
        );
        let monitor = TaskMonitor::new(api.clone());
        let (completes, on_complete) = counter();
        let (errors, on_error) = counter();

        let handle = monitor
            .track(
                "J2",
                TrackOptions::default()
                    .with_poll_interval(Duration::from_millis(100))
                    .on_complete(on_complete)
                    .on_error(on_error),
            )
            .unwrap();

        let result = handle.wait().await;
        assert_eq!(
            result,
            Err(TaskError::RemoteFailure {
                job_id: "J2".to_string(),
                message: "bad raster".to_string()
            })
        );
        assert_eq!(completes.load(Ordering::SeqCst), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(monitor.query("J2").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_stops_without_retry() {
        let api = Arc::new(ScriptedJobApi::new());
        api.script(
            "J3",
            vec![Err(TaskError::Transport(NetworkError::ConnectionFailed {
                url: "http://localhost".to_string(),
                message: "refused".to_string(),
            }))],
        );
        let monitor = TaskMonitor::new(api.clone());
        let failed = Arc::new(Mutex::new(None));
        let slot = failed.clone();

        let handle = monitor
            .track(
                "J3",
                TrackOptions::default().on_error(move |task| {
                    *slot.lock().unwrap() = Some(task.clone());
                }),
            )
            .unwrap();

        assert!(matches!(handle.wait().await, Err(TaskError::Transport(_))));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(api.poll_count("J3"), 1);
        let task = failed.lock().unwrap().clone().unwrap();
        assert_eq!(task.state, TaskState::Failed);
        assert!(task.error.unwrap().contains("refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_revoked_counts_as_error() {
        let api = Arc::new(ScriptedJobApi::new());
        api.script("J4", vec![Ok(JobStatus::new(TaskState::Cancelled))]);
        let monitor = TaskMonitor::new(api);
        let (errors, on_error) = counter();

        let handle = monitor
            .track("J4", TrackOptions::default().on_error(on_error))
            .unwrap();

        assert_eq!(
            handle.wait().await,
            Err(TaskError::Cancelled {
                job_id: "J4".to_string()
            })
        );
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_locally_even_if_remote_fails() {
        let api = Arc::new(ScriptedJobApi::new());
        api.script("J5", vec![Ok(running(5.0))]);
        api.set_cancel_result(Err(TaskError::Transport(NetworkError::HttpStatus {
            status: 500,
            message: "boom".to_string(),
        })));
        let monitor = TaskMonitor::new(api.clone());
        let (errors, on_error) = counter();
        let (completes, on_complete) = counter();

        let handle = monitor
            .track(
                "J5",
                TrackOptions::default()
                    .with_poll_interval(Duration::from_millis(100))
                    .on_error(on_error)
                    .on_complete(on_complete),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        let result = monitor.cancel("J5").await;
        assert!(matches!(result, Err(TaskError::Transport(_))));
        assert_eq!(api.cancel_calls(), vec!["J5".to_string()]);
        assert!(monitor.query("J5").is_none());
        assert_eq!(handle.snapshot().state, TaskState::Cancelled);
        assert!(!handle.is_active());

        let polls = api.poll_count("J5");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.poll_count("J5"), polls);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert_eq!(completes.load(Ordering::SeqCst), 0);
        assert_eq!(
            handle.wait().await,
            Err(TaskError::Cancelled {
                job_id: "J5".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_unknown_or_finished_task() {
        let api = Arc::new(ScriptedJobApi::new());
        api.script("J6", vec![Ok(JobStatus::new(TaskState::Succeeded))]);
        let monitor = TaskMonitor::new(api.clone());

        assert_eq!(
            monitor.cancel("nope").await,
            Err(TaskError::UnknownTask {
                job_id: "nope".to_string()
            })
        );

        let handle = monitor.track("J6", TrackOptions::default()).unwrap();
        assert!(handle.wait().await.is_ok());
        assert!(matches!(
            monitor.cancel("J6").await,
            Err(TaskError::UnknownTask { .. })
        ));
        assert!(api.cancel_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrack_replaces_previous_monitor() {
        let api = Arc::new(ScriptedJobApi::new());
        api.script("J7", vec![Ok(running(1.0))]);
        let monitor = TaskMonitor::new(api.clone());

        let first = monitor
            .track("J7", TrackOptions::default().with_poll_interval(Duration::from_millis(100)))
            .unwrap();
        let second = monitor
            .track("J7", TrackOptions::default().with_poll_interval(Duration::from_millis(100)))
            .unwrap();

        assert_eq!(
            first.wait().await,
            Err(TaskError::Stopped {
                job_id: "J7".to_string()
            })
        );
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(second.is_active());
        assert_eq!(monitor.list_active().len(), 1);
        // Only the second loop polls: at 0, 100 and 200ms.
        assert_eq!(api.poll_count("J7"), 3);
        monitor.stop_all();
        assert!(monitor.list_active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_track() {
        let api = Arc::new(ScriptedJobApi::new());
        api.set_start_result(Ok("J8".to_string()));
        api.script(
            "J8",
            vec![Ok(JobStatus::new(TaskState::Succeeded).with_result(json!({"tile_url": "/t"})))],
        );
        let monitor = TaskMonitor::new(api.clone());
        let kind = JobKind::GeoRasterConversion {
            item_id: "item-1".to_string(),
        };

        let handle = monitor.start_and_track(&kind, TrackOptions::default()).await.unwrap();
        assert_eq!(handle.id(), "J8");
        let task = handle.wait().await.unwrap();
        assert_eq!(task.result, Some(json!({"tile_url": "/t"})));
        assert_eq!(api.started_jobs(), vec![kind]);
    }
}
