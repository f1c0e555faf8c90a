//! Mock auth API for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::auth::{LoginResponse, TokenPair};
use crate::error::AuthError;
use crate::traits::AuthApi;

/// Holds refresh calls until opened or dropped.
#[derive(Debug)]
pub struct RefreshGate {
    tx: watch::Sender<bool>,
}

impl RefreshGate {
    /// Let held and future refresh calls through.
    pub fn open(self) {
        let _ = self.tx.send(true);
    }
}

/// Mock auth API with configurable results and call recording.
///
/// Clones share the same configuration and call log.
#[derive(Debug, Clone)]
pub struct MockAuthApi {
    refresh_result: Arc<Mutex<Result<TokenPair, AuthError>>>,
    login_result: Arc<Mutex<Result<LoginResponse, AuthError>>>,
    refresh_calls: Arc<Mutex<Vec<String>>>,
    login_calls: Arc<Mutex<Vec<String>>>,
    gate: Arc<Mutex<Option<watch::Receiver<bool>>>>,
}

impl Default for MockAuthApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self {
            refresh_result: Arc::new(Mutex::new(Err(AuthError::RefreshFailed {
                message: "No mock refresh result".to_string(),
            }))),
            login_result: Arc::new(Mutex::new(Err(AuthError::InvalidCredentials {
                message: "No mock login result".to_string(),
            }))),
            refresh_calls: Arc::new(Mutex::new(Vec::new())),
            login_calls: Arc::new(Mutex::new(Vec::new())),
            gate: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_refresh_result(&self, result: Result<TokenPair, AuthError>) {
        *self.refresh_result.lock().unwrap() = result;
    }

    pub fn set_login_result(&self, result: Result<LoginResponse, AuthError>) {
        *self.login_result.lock().unwrap() = result;
    }

    /// Refresh tokens passed to `refresh`, in call order.
    pub fn refresh_calls(&self) -> Vec<String> {
        self.refresh_calls.lock().unwrap().clone()
    }

    /// Usernames passed to `login`, in call order.
    pub fn login_calls(&self) -> Vec<String> {
        self.login_calls.lock().unwrap().clone()
    }

    /// Make `refresh` block until the returned gate is opened or dropped.
    pub fn gate_refresh(&self) -> RefreshGate {
        let (tx, rx) = watch::channel(false);
        *self.gate.lock().unwrap() = Some(rx);
        RefreshGate { tx }
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn login(&self, username: &str, _password: &str) -> Result<LoginResponse, AuthError> {
        self.login_calls.lock().unwrap().push(username.to_string());
        self.login_result.lock().unwrap().clone()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.refresh_calls
            .lock()
            .unwrap()
            .push(refresh_token.to_string());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(mut rx) = gate {
            while !*rx.borrow() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }

        self.refresh_result.lock().unwrap().clone()
    }
}
