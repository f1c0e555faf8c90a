//! Task monitor behaviour against a scripted job API, on paused tokio time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use geoarchive::error::TaskError;
use geoarchive::tasks::{JobKind, TaskMonitor, TaskState, TrackOptions, TIMEOUT_MESSAGE};
use serde_json::json;

fn monitor(api: &ScriptedJobApi) -> TaskMonitor {
    TaskMonitor::new(Arc::new(api.clone()))
}

fn fast_options() -> TrackOptions {
    TrackOptions::new()
        .with_poll_interval(Duration::from_millis(100))
        .with_max_wait(Duration::from_millis(1000))
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_runs_to_success_with_progress_callbacks() {
    let api = ScriptedJobApi::new();
    api.script(
        "J1",
        vec![running(10.0), running(40.0), running(70.0), succeeded(json!("ok"))],
    );
    let progress = CallCounter::new();
    let complete = CallCounter::new();
    let errors = CallCounter::new();
    let (p, c, e) = (progress.clone(), complete.clone(), errors.clone());

    let monitor = monitor(&api);
    let handle = monitor
        .track(
            "J1",
            fast_options()
                .on_progress(move |_| p.hit())
                .on_complete(move |task| {
                    assert_eq!(task.state, TaskState::Succeeded);
                    c.hit();
                })
                .on_error(move |_| e.hit()),
        )
        .unwrap();

    let task = handle.wait().await.unwrap();

    assert_eq!(task.state, TaskState::Succeeded);
    assert_eq!(task.result, Some(json!("ok")));
    assert_eq!(task.progress, 100.0);
    assert_eq!(progress.count(), 4);
    assert_eq!(complete.count(), 1);
    assert_eq!(errors.count(), 0);

    advance(1000).await;
    assert_eq!(api.poll_count("J1"), 4);
    assert!(monitor.query("J1").is_none());
    assert!(monitor.list_active().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_times_out_within_one_interval_after_max_wait() {
    let api = ScriptedJobApi::new();
    api.script("J2", vec![running(5.0)]);
    let errors = CallCounter::new();
    let e = errors.clone();

    let handle = monitor(&api)
        .track("J2", fast_options().on_error(move |_| e.hit()))
        .unwrap();
    let mut snapshots = handle.subscribe();
    let started = tokio::time::Instant::now();

    let err = handle.wait().await.unwrap_err();

    assert!(matches!(err, TaskError::Timeout { ref job_id, .. } if job_id == "J2"));
    let elapsed = started.elapsed();
    assert!(elapsed > Duration::from_millis(1000));
    assert!(elapsed <= Duration::from_millis(1100));
    assert_eq!(errors.count(), 1);

    let last = snapshots.borrow_and_update().clone();
    assert_eq!(last.state, TaskState::TimedOut);
    assert_eq!(last.error.as_deref(), Some(TIMEOUT_MESSAGE));
    assert!(!last.is_active());

    let polls = api.poll_count("J2");
    advance(1000).await;
    assert_eq!(api.poll_count("J2"), polls);
}

#[tokio::test(start_paused = true)]
async fn test_stop_discards_in_flight_response() {
    let api = ScriptedJobApi::new();
    api.script("J3", vec![running(50.0)]);
    api.set_poll_delay(Duration::from_millis(500));
    let progress = CallCounter::new();
    let p = progress.clone();

    let monitor = monitor(&api);
    let handle = monitor
        .track("J3", fast_options().on_progress(move |_| p.hit()))
        .unwrap();
    let snapshots = handle.subscribe();

    advance(100).await;
    assert_eq!(api.poll_count("J3"), 1);
    assert!(handle.is_active());

    monitor.stop("J3");
    monitor.stop("J3");

    assert!(matches!(
        handle.wait().await,
        Err(TaskError::Stopped { .. })
    ));
    advance(2000).await;
    assert_eq!(api.poll_count("J3"), 1);
    assert_eq!(progress.count(), 0);
    assert!(!snapshots.borrow().is_active());
    assert_eq!(snapshots.borrow().state, TaskState::Pending);
}

#[tokio::test(start_paused = true)]
async fn test_remote_failure_reports_error_once() {
    let api = ScriptedJobApi::new();
    api.script("J4", vec![running(20.0), failed("GDAL could not read the file")]);
    let errors = CallCounter::new();
    let e = errors.clone();

    let handle = monitor(&api)
        .track("J4", fast_options().on_error(move |_| e.hit()))
        .unwrap();

    match handle.wait().await {
        Err(TaskError::RemoteFailure { message, .. }) => {
            assert_eq!(message, "GDAL could not read the file")
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    advance(1000).await;
    assert_eq!(errors.count(), 1);
    assert_eq!(api.poll_count("J4"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_is_not_retried() {
    let api = ScriptedJobApi::new();
    api.script("J5", vec![unreachable(), running(10.0)]);

    let handle = monitor(&api).track("J5", fast_options()).unwrap();
    let snapshots = handle.subscribe();

    assert!(matches!(handle.wait().await, Err(TaskError::Transport(_))));
    advance(1000).await;
    assert_eq!(api.poll_count("J5"), 1);
    assert_eq!(snapshots.borrow().state, TaskState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_locally_without_callbacks() {
    let api = ScriptedJobApi::new();
    api.script("J6", vec![running(30.0)]);
    let callbacks = CallCounter::new();
    let (c1, c2) = (callbacks.clone(), callbacks.clone());

    let monitor = monitor(&api);
    let handle = monitor
        .track(
            "J6",
            fast_options()
                .on_complete(move |_| c1.hit())
                .on_error(move |_| c2.hit()),
        )
        .unwrap();
    advance(150).await;

    let ack = handle.cancel().await.unwrap();

    assert_eq!(ack.status, "cancelled");
    assert_eq!(api.cancel_calls(), vec!["J6".to_string()]);
    assert!(matches!(
        handle.wait().await,
        Err(TaskError::Cancelled { .. })
    ));
    let polls = api.poll_count("J6");
    advance(1000).await;
    assert_eq!(api.poll_count("J6"), polls);
    assert_eq!(callbacks.count(), 0);
    assert!(matches!(
        monitor.cancel("J6").await,
        Err(TaskError::UnknownTask { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_tracks_several_tasks_independently() {
    let api = ScriptedJobApi::new();
    api.script("A", vec![running(10.0), succeeded(json!({"tiles": 12}))]);
    api.script("B", vec![running(10.0)]);

    let monitor = monitor(&api);
    let a = monitor.track("A", fast_options()).unwrap();
    let _b = monitor.track("B", fast_options()).unwrap();

    a.wait().await.unwrap();

    let active = monitor.list_active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "B");

    monitor.stop_all();
    assert!(monitor.list_active().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_start_and_track_conversion() {
    let api = ScriptedJobApi::new();
    api.set_start_result(Ok("J7".to_string()));
    api.script("J7", vec![succeeded(json!("done"))]);

    let kind = JobKind::GeoRasterConversion {
        item_id: "item-42".to_string(),
    };
    let handle = monitor(&api)
        .start_and_track(&kind, fast_options())
        .await
        .unwrap();

    assert_eq!(handle.id(), "J7");
    assert_eq!(handle.wait().await.unwrap().result, Some(json!("done")));
    assert_eq!(api.started_jobs(), vec![kind]);
}
