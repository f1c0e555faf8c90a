//! HTTP job API adapter.
//!
//! Talks to the job endpoints through an [`AuthorizedClient`], so polls and
//! cancels are renewed and replayed transparently when the access token
//! expires.

use async_trait::async_trait;
use serde::Deserialize;

use crate::dispatch::AuthorizedClient;
use crate::error::TaskError;
use crate::tasks::{CancelAck, JobKind, JobStatus, TaskState};
use crate::traits::JobApi;

#[derive(Debug, Deserialize)]
struct StartedJob {
    task_id: String,
}

/// Body of `GET /tasks/{task_id}`.
#[derive(Debug, Deserialize)]
struct TaskStatusResponse {
    state: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl From<TaskStatusResponse> for JobStatus {
    fn from(response: TaskStatusResponse) -> Self {
        JobStatus {
            state: TaskState::from_remote(&response.state),
            message: response.status,
            progress: response.progress,
            result: response.result,
            error: response.error,
        }
    }
}

/// [`JobApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpJobApi {
    client: AuthorizedClient,
}

impl HttpJobApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobApi for HttpJobApi {
    async fn start_job(&self, kind: &JobKind) -> Result<String, TaskError> {
        let started: StartedJob = match kind {
            JobKind::GeoRasterConversion { item_id } => {
                self.client
                    .post_json(&format!("/tasks/geo-raster/{}", item_id), &serde_json::json!({}))
                    .await?
            }
            JobKind::Georeferencing { file_id, request } => {
                self.client
                    .post_json(&format!("/files/{}/georeference", file_id), request)
                    .await?
            }
        };
        Ok(started.task_id)
    }

    async fn get_status(&self, job_id: &str) -> Result<JobStatus, TaskError> {
        let response: TaskStatusResponse =
            self.client.get_json(&format!("/tasks/{}", job_id)).await?;
        Ok(response.into())
    }

    async fn cancel(&self, job_id: &str) -> Result<CancelAck, TaskError> {
        Ok(self
            .client
            .post_json(&format!("/tasks/{}/cancel", job_id), &serde_json::json!({}))
            .await?)
    }
}
