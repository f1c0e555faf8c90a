//! Scripted job API for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{NetworkError, TaskError};
use crate::tasks::{CancelAck, JobKind, JobStatus};
use crate::traits::JobApi;

type StatusResult = Result<JobStatus, TaskError>;

/// Job API that replays a per-job script of status responses.
///
/// Each poll consumes the next scripted response; the last one repeats
/// forever. Polls, starts and cancels are recorded.
#[derive(Debug, Clone)]
pub struct ScriptedJobApi {
    scripts: Arc<Mutex<HashMap<String, VecDeque<StatusResult>>>>,
    polls: Arc<Mutex<HashMap<String, usize>>>,
    poll_delay: Arc<Mutex<Option<Duration>>>,
    start_result: Arc<Mutex<Result<String, TaskError>>>,
    started: Arc<Mutex<Vec<JobKind>>>,
    cancel_result: Arc<Mutex<Option<Result<CancelAck, TaskError>>>>,
    cancels: Arc<Mutex<Vec<String>>>,
}

impl Default for ScriptedJobApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedJobApi {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            polls: Arc::new(Mutex::new(HashMap::new())),
            poll_delay: Arc::new(Mutex::new(None)),
            start_result: Arc::new(Mutex::new(Ok("job-1".to_string()))),
            started: Arc::new(Mutex::new(Vec::new())),
            cancel_result: Arc::new(Mutex::new(None)),
            cancels: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the responses for a job.
    pub fn script(&self, job_id: &str, responses: Vec<StatusResult>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), responses.into());
    }

    /// Delay every status response by `delay`.
    pub fn set_poll_delay(&self, delay: Duration) {
        *self.poll_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_start_result(&self, result: Result<String, TaskError>) {
        *self.start_result.lock().unwrap() = result;
    }

    /// Override the cancel response. By default cancels are acknowledged.
    pub fn set_cancel_result(&self, result: Result<CancelAck, TaskError>) {
        *self.cancel_result.lock().unwrap() = Some(result);
    }

    /// Number of `get_status` calls made for a job.
    pub fn poll_count(&self, job_id: &str) -> usize {
        self.polls.lock().unwrap().get(job_id).copied().unwrap_or(0)
    }

    pub fn started_jobs(&self) -> Vec<JobKind> {
        self.started.lock().unwrap().clone()
    }

    pub fn cancel_calls(&self) -> Vec<String> {
        self.cancels.lock().unwrap().clone()
    }

    fn next_response(&self, job_id: &str) -> StatusResult {
        let mut scripts = self.scripts.lock().unwrap();
        let not_found = || {
            Err(TaskError::Transport(NetworkError::HttpStatus {
                status: 404,
                message: format!("No script for job {}", job_id),
            }))
        };
        let Some(script) = scripts.get_mut(job_id) else {
            return not_found();
        };
        if script.len() > 1 {
            if let Some(response) = script.pop_front() {
                return response;
            }
        }
        script.front().cloned().unwrap_or_else(not_found)
    }
}

#[async_trait]
impl JobApi for ScriptedJobApi {
    async fn start_job(&self, kind: &JobKind) -> Result<String, TaskError> {
        self.started.lock().unwrap().push(kind.clone());
        self.start_result.lock().unwrap().clone()
    }

    async fn get_status(&self, job_id: &str) -> Result<JobStatus, TaskError> {
        *self
            .polls
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_insert(0) += 1;

        let delay = *self.poll_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.next_response(job_id)
    }

    async fn cancel(&self, job_id: &str) -> Result<CancelAck, TaskError> {
        self.cancels.lock().unwrap().push(job_id.to_string());
        let configured = self.cancel_result.lock().unwrap().clone();
        configured.unwrap_or_else(|| {
            Ok(CancelAck {
                task_id: job_id.to_string(),
                status: "cancelled".to_string(),
                message: None,
                error: None,
            })
        })
    }
}
