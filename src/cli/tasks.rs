//! `convert`, `georeference`, `watch` and `cancel`.

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use crate::config::ClientConfig;
use crate::session::Backend;
use crate::tasks::{JobKind, TaskMonitor, TrackOptions, TrackedTask, TrackedTaskHandle};
use crate::traits::JobApi;

use super::account::require_session;
use super::report;

/// Start a job; follow it unless `detach` is set.
pub async fn handle_start(
    backend: &Backend,
    config: &ClientConfig,
    kind: JobKind,
    detach: bool,
) -> Result<()> {
    let session = require_session(backend).await?;

    if detach {
        let task_id = session
            .job_api()
            .start_job(&kind)
            .await
            .map_err(report)?;
        println!("{} started: {}", kind.label(), task_id);
        return Ok(());
    }

    let monitor = session.task_monitor();
    let handle = monitor
        .start_and_track(&kind, progress_options(config))
        .await
        .map_err(report)?;
    println!("{} started: {}", kind.label(), handle.id());
    follow(&monitor, handle).await
}

pub async fn handle_watch(backend: &Backend, config: &ClientConfig, task_id: &str) -> Result<()> {
    let session = require_session(backend).await?;
    let monitor = session.task_monitor();
    let handle = monitor
        .track(task_id, progress_options(config))
        .map_err(report)?;
    follow(&monitor, handle).await
}

pub async fn handle_cancel(backend: &Backend, task_id: &str) -> Result<()> {
    let session = require_session(backend).await?;
    let ack = session
        .job_api()
        .cancel(task_id)
        .await
        .map_err(report)?;
    println!(
        "{}: {}",
        ack.task_id,
        ack.message.as_deref().unwrap_or(&ack.status)
    );
    Ok(())
}

/// Parse the georeferencing request given on the command line.
pub fn parse_request(file_id: &str, request: &str) -> Result<JobKind> {
    let request: serde_json::Value =
        serde_json::from_str(request).wrap_err("Georeferencing request is not valid JSON")?;
    if !request.is_object() {
        return Err(eyre!("Georeferencing request must be a JSON object"));
    }
    Ok(JobKind::Georeferencing {
        file_id: file_id.to_string(),
        request,
    })
}

fn progress_options(config: &ClientConfig) -> TrackOptions {
    TrackOptions::from_config(config).on_progress(|task| println!("{}", format_progress(task)))
}

/// Wait for the task to settle. Ctrl-C stops watching; the job keeps running.
async fn follow(monitor: &TaskMonitor, handle: TrackedTaskHandle) -> Result<()> {
    let task_id = handle.id().to_string();
    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            monitor.stop(&task_id);
            println!("Stopped watching {}; the task keeps running on the server.", task_id);
            return Ok(());
        }
    };

    match outcome {
        Ok(task) => {
            println!("Task {} succeeded", task.id);
            if let Some(result) = &task.result {
                println!("{}", serde_json::to_string_pretty(result)?);
            }
            Ok(())
        }
        Err(e) => Err(report(e)).wrap_err(format!("Task {} did not succeed", task_id)),
    }
}

pub fn format_progress(task: &TrackedTask) -> String {
    let mut line = format!("{} [{}] {:>3.0}%", task.id, task.state, task.progress);
    if !task.status_message.is_empty() {
        line.push(' ');
        line.push_str(&task.status_message);
    }
    line
}
