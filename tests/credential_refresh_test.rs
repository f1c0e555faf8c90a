//! Single-flight credential renewal across concurrent callers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common::*;
use futures::future::join_all;
use geoarchive::auth::{CredentialCoordinator, SessionEvent, SweepOutcome};
use geoarchive::dispatch::AuthorizedClient;
use geoarchive::error::AuthError;
use geoarchive::traits::CredentialKey;
use serde_json::json;

fn jwt_expiring_in(secs: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let exp = chrono::Utc::now().timestamp() + secs;
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": "alice", "exp": exp}).to_string());
    format!("{}.{}.signature", header, payload)
}

fn spawn_callers(
    coordinator: &CredentialCoordinator,
    n: usize,
) -> Vec<tokio::task::JoinHandle<Result<String, AuthError>>> {
    (0..n)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.ensure_fresh_token().await })
        })
        .collect()
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let (coordinator, auth, store) = coordinator_with(Some("a1"), Some("r1")).await;
    auth.set_refresh_result(Ok(token_pair("a2", "r2")));
    let gate = auth.gate_refresh();

    let callers = spawn_callers(&coordinator, 5);
    until(|| auth.refresh_calls().len() == 1 && coordinator.waiter_count() == 4).await;
    assert!(coordinator.is_refreshing());

    gate.open();
    for result in join_all(callers).await {
        assert_eq!(result.unwrap().unwrap(), "a2");
    }

    assert_eq!(auth.refresh_calls(), vec!["r1".to_string()]);
    assert!(!coordinator.is_refreshing());
    assert_eq!(coordinator.waiter_count(), 0);
    assert_eq!(coordinator.access_token().as_deref(), Some("a2"));
    assert_eq!(store.value(CredentialKey::AccessToken).as_deref(), Some("a2"));
    assert_eq!(store.value(CredentialKey::RefreshToken).as_deref(), Some("r2"));
}

#[tokio::test]
async fn test_no_refresh_token_fails_without_network() {
    let (coordinator, auth, _store) = coordinator_with(Some("a1"), None).await;

    assert_eq!(
        coordinator.ensure_fresh_token().await,
        Err(AuthError::NoRefreshTokenAvailable)
    );
    assert!(auth.refresh_calls().is_empty());
    assert_eq!(coordinator.waiter_count(), 0);
    assert!(!coordinator.is_refreshing());
}

#[tokio::test]
async fn test_failure_reaches_every_waiter_and_expires_session() {
    let (coordinator, auth, store) = coordinator_with(Some("a1"), Some("r1")).await;
    let failure = AuthError::RefreshFailed {
        message: "refresh token revoked".to_string(),
    };
    auth.set_refresh_result(Err(failure.clone()));
    let gate = auth.gate_refresh();
    let mut events = coordinator.subscribe();

    let callers = spawn_callers(&coordinator, 3);
    until(|| coordinator.waiter_count() == 2).await;
    gate.open();

    for result in join_all(callers).await {
        assert_eq!(result.unwrap(), Err(failure.clone()));
    }
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Expired(failure));
    assert_eq!(coordinator.access_token(), None);
    assert_eq!(coordinator.refresh_token(), None);
    assert!(store.is_empty());
    assert_eq!(auth.refresh_calls().len(), 1);
}

#[tokio::test]
async fn test_next_renewal_after_settle_starts_fresh() {
    let (coordinator, auth, _store) = coordinator_with(Some("a1"), Some("r1")).await;
    auth.set_refresh_result(Ok(token_pair("a2", "r2")));
    assert_eq!(coordinator.ensure_fresh_token().await.unwrap(), "a2");

    auth.set_refresh_result(Ok(token_pair("a3", "r3")));
    assert_eq!(coordinator.ensure_fresh_token().await.unwrap(), "a3");

    assert_eq!(auth.refresh_calls(), vec!["r1".to_string(), "r2".to_string()]);
}

#[tokio::test]
async fn test_concurrent_401s_trigger_one_refresh() {
    let (coordinator, auth, _store) = coordinator_with(Some("a1"), Some("r1")).await;
    auth.set_refresh_result(Ok(token_pair("a2", "r2")));
    let gate = auth.gate_refresh();
    let http = MockHttpClient::new();
    http.set_handler(|request| match request.bearer_token() {
        Some("a2") => Some(MockResponse::json(200, &json!({"ok": true}))),
        _ => Some(MockResponse::status(401)),
    });
    let client = AuthorizedClient::new(Arc::new(http.clone()), coordinator.clone(), BASE_URL);

    let requests: Vec<_> = ["/tasks/A", "/tasks/B", "/tasks/C"]
        .into_iter()
        .map(|path| {
            let client = client.clone();
            tokio::spawn(async move { client.get_json::<serde_json::Value>(path).await })
        })
        .collect();
    until(|| coordinator.waiter_count() == 2).await;
    gate.open();

    for request in requests {
        assert_eq!(request.await.unwrap().unwrap()["ok"], true);
    }
    assert_eq!(auth.refresh_calls().len(), 1);
    assert_eq!(http.get_requests().len(), 6);
}

#[tokio::test]
async fn test_proactive_sweep_renews_expiring_token() {
    let (coordinator, auth, _store) =
        coordinator_with(Some(&jwt_expiring_in(60)), Some("r1")).await;
    auth.set_refresh_result(Ok(token_pair(&jwt_expiring_in(1800), "r2")));

    assert_eq!(coordinator.run_proactive_sweep().await, SweepOutcome::Renewed);
    assert_eq!(auth.refresh_calls(), vec!["r1".to_string()]);

    match coordinator.run_proactive_sweep().await {
        SweepOutcome::Fresh { remaining_secs } => assert!(remaining_secs > 1700),
        other => panic!("unexpected sweep outcome: {:?}", other),
    }
    assert_eq!(auth.refresh_calls().len(), 1);
}

#[tokio::test]
async fn test_armed_sweep_renews_in_background() {
    let (coordinator, auth, _store) =
        coordinator_with(Some(&jwt_expiring_in(30)), Some("r1")).await;
    auth.set_refresh_result(Ok(token_pair("a2", "r2")));
    let mut events = coordinator.subscribe();

    coordinator.arm_sweep();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("sweep should renew promptly")
        .unwrap();
    assert_eq!(event, SessionEvent::Renewed);
    assert_eq!(coordinator.access_token().as_deref(), Some("a2"));

    coordinator.disarm_sweep();
    assert!(!coordinator.is_sweep_armed());
}
