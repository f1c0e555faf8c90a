//! Single-flight credential renewal.
//!
//! [`CredentialCoordinator`] owns the session's [`CredentialPair`] and makes
//! sure at most one refresh call is in flight at any time. Callers arriving
//! while a renewal is running are queued and released, in arrival order, with
//! the outcome of that renewal.
//!
//! A background sweep renews the access token shortly before it expires so
//! that most requests never see a 401 in the first place.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::credentials::CredentialPair;
use super::jwt::jwt_remaining_secs;
use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::traits::{AuthApi, CredentialKey, CredentialStore, StoreError};

/// Renew when the access token has less than this many seconds left (5 minutes).
pub const PROACTIVE_REFRESH_THRESHOLD: Duration = Duration::from_secs(300);

/// How often the proactive sweep runs while a session is authenticated.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(300);

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session was established by login.
    LoggedIn,
    /// The credential pair was renewed.
    Renewed,
    /// Renewal failed; the pair has been cleared and the session is over.
    Expired(AuthError),
    /// The session was ended by the user.
    LoggedOut,
}

/// Result of one proactive sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    /// No access token is held.
    NoSession,
    /// The token carries no readable expiry; nothing to schedule against.
    UnknownExpiry,
    /// The token has enough lifetime left.
    Fresh { remaining_secs: i64 },
    /// The token was close to expiry and has been renewed.
    Renewed,
    /// Renewal was attempted and failed.
    Failed(AuthError),
}

/// A request that may be replayed once after a renewal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryableRequest {
    /// Access token the request was sent with.
    pub attempted_token: Option<String>,
    /// Set once the request has been handed a replacement token.
    pub retried: bool,
}

impl RetryableRequest {
    pub fn new(attempted_token: Option<String>) -> Self {
        Self {
            attempted_token,
            retried: false,
        }
    }
}

/// Timing knobs for renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    pub refresh_threshold: Duration,
    pub sweep_period: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            refresh_threshold: PROACTIVE_REFRESH_THRESHOLD,
            sweep_period: SWEEP_PERIOD,
        }
    }
}

impl RefreshSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            refresh_threshold: config.refresh_threshold,
            sweep_period: config.sweep_period,
        }
    }
}

type RefreshResult = Result<String, AuthError>;

struct CoordinatorState {
    pair: CredentialPair,
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshResult>>,
}

struct SweepHandle {
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

struct CoordinatorInner {
    auth: Arc<dyn AuthApi>,
    store: Arc<dyn CredentialStore>,
    settings: RefreshSettings,
    state: Mutex<CoordinatorState>,
    /// Serializes store writes so the store always converges on the latest pair.
    persist_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
    sweep: Mutex<Option<SweepHandle>>,
}

impl CoordinatorInner {
    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sweep(&self) -> MutexGuard<'_, Option<SweepHandle>> {
        self.sweep.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        if let Some(sweep) = self.sweep().take() {
            sweep.cancel.cancel();
        }
    }
}

/// Releases queued waiters if the renewal task panics or is torn down mid-renewal.
struct InFlightGuard<'a> {
    inner: &'a CoordinatorInner,
    settled: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let waiters = {
            let mut state = self.inner.state();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        tracing::warn!(
            "Token refresh abandoned, releasing {} waiter(s)",
            waiters.len()
        );
        for waiter in waiters {
            let _ = waiter.send(Err(AuthError::RefreshAbandoned));
        }
    }
}

enum RefreshEntry {
    Join(oneshot::Receiver<RefreshResult>),
    Initiate(String),
}

/// Owner of the session's credential pair.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct CredentialCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl std::fmt::Debug for CredentialCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("CredentialCoordinator")
            .field("has_access_token", &state.pair.access_token.is_some())
            .field("has_refresh_token", &state.pair.refresh_token.is_some())
            .field("in_flight", &state.in_flight)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

impl CredentialCoordinator {
    pub fn new(auth: Arc<dyn AuthApi>, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_settings(auth, store, RefreshSettings::default())
    }

    pub fn with_settings(
        auth: Arc<dyn AuthApi>,
        store: Arc<dyn CredentialStore>,
        settings: RefreshSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CoordinatorInner {
                auth,
                store,
                settings,
                state: Mutex::new(CoordinatorState {
                    pair: CredentialPair::default(),
                    in_flight: false,
                    waiters: VecDeque::new(),
                }),
                persist_lock: tokio::sync::Mutex::new(()),
                events,
                sweep: Mutex::new(None),
            }),
        }
    }

    /// Current access token. Never blocks on a renewal.
    pub fn access_token(&self) -> Option<String> {
        self.inner.state().pair.access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.state().pair.refresh_token.clone()
    }

    pub fn credential_pair(&self) -> CredentialPair {
        self.inner.state().pair.clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.state().in_flight
    }

    /// Number of callers queued behind the in-flight renewal.
    pub fn waiter_count(&self) -> usize {
        self.inner.state().waiters.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Replace the pair and mirror it into the credential store.
    ///
    /// The in-memory pair is always replaced; a store failure is reported
    /// as `CredentialsSaveFailed`. `None` clears that half of the pair.
    pub async fn set_tokens(
        &self,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Result<(), AuthError> {
        self.inner.state().pair = CredentialPair::new(access_token, refresh_token);
        self.persist_current()
            .await
            .map_err(|e| AuthError::CredentialsSaveFailed {
                message: e.to_string(),
            })
    }

    /// Load the pair from the credential store into memory.
    pub async fn load_persisted(&self) -> Result<CredentialPair, AuthError> {
        let load = |e: StoreError| AuthError::CredentialsLoadFailed {
            message: e.to_string(),
        };
        let access_token = self.inner.store.get(CredentialKey::AccessToken).await.map_err(load)?;
        let refresh_token = self.inner.store.get(CredentialKey::RefreshToken).await.map_err(load)?;
        let pair = CredentialPair::new(access_token, refresh_token);
        self.inner.state().pair = pair.clone();
        tracing::debug!(
            "Loaded persisted credentials (access: {}, refresh: {})",
            pair.access_token.is_some(),
            pair.refresh_token.is_some()
        );
        Ok(pair)
    }

    /// Return a freshly renewed access token.
    ///
    /// If a renewal is already running the caller is queued behind it and
    /// receives the same outcome. Otherwise this call performs the renewal
    /// itself. Fails immediately with `NoRefreshTokenAvailable`, without a
    /// network call, when no refresh token is held.
    ///
    /// The renewal runs on its own task: dropping the initiating caller does
    /// not cancel it, and queued waiters still receive its outcome.
    ///
    /// A failed renewal clears the pair and ends the session.
    pub async fn ensure_fresh_token(&self) -> Result<String, AuthError> {
        let entry = {
            let mut state = self.inner.state();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                tracing::debug!(
                    "Token refresh in flight, queued as waiter #{}",
                    state.waiters.len()
                );
                RefreshEntry::Join(rx)
            } else {
                match state.pair.refresh_token.clone() {
                    Some(token) => {
                        state.in_flight = true;
                        RefreshEntry::Initiate(token)
                    }
                    None => return Err(AuthError::NoRefreshTokenAvailable),
                }
            }
        };

        match entry {
            RefreshEntry::Join(rx) => rx.await.unwrap_or(Err(AuthError::RefreshAbandoned)),
            RefreshEntry::Initiate(refresh_token) => {
                let this = self.clone();
                let renewal =
                    tokio::spawn(async move { this.perform_refresh(&refresh_token).await });
                match renewal.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!("Token refresh task failed: {}", e);
                        Err(AuthError::RefreshAbandoned)
                    }
                }
            }
        }
    }

    async fn perform_refresh(&self, refresh_token: &str) -> RefreshResult {
        let mut guard = InFlightGuard {
            inner: &self.inner,
            settled: false,
        };

        tracing::info!("Refreshing access token");
        let outcome = self.inner.auth.refresh(refresh_token).await;

        let (result, waiters) = {
            let mut state = self.inner.state();
            let result = match outcome {
                Ok(pair) => {
                    let token = pair.access_token.clone();
                    state.pair = pair.into();
                    Ok(token)
                }
                Err(e) => {
                    state.pair = CredentialPair::default();
                    Err(e)
                }
            };
            state.in_flight = false;
            (result, std::mem::take(&mut state.waiters))
        };
        guard.settled = true;

        match &result {
            Ok(_) => tracing::info!(
                "Token refresh succeeded, releasing {} waiter(s)",
                waiters.len()
            ),
            Err(e) => tracing::warn!(
                "Token refresh failed ({}), releasing {} waiter(s)",
                e,
                waiters.len()
            ),
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }

        match &result {
            Ok(_) => {
                if let Err(e) = self.persist_current().await {
                    tracing::warn!("Failed to persist renewed credentials: {}", e);
                }
                self.emit(SessionEvent::Renewed);
            }
            Err(e) => self.expire_session(e.clone()).await,
        }

        result
    }

    /// Called by the dispatcher when a request was rejected as unauthorized.
    ///
    /// Returns the token to replay the request with. A request is handed a
    /// replacement at most once. If the pair was already replaced since the
    /// request was sent, the current token is returned without a new renewal.
    pub async fn on_auth_rejected(
        &self,
        request: &mut RetryableRequest,
    ) -> Result<String, AuthError> {
        if request.retried {
            tracing::warn!("Request rejected again after token refresh");
            return Err(AuthError::RetryExhausted);
        }
        request.retried = true;

        if let Some(current) = self.access_token() {
            if request.attempted_token.as_deref() != Some(current.as_str()) {
                tracing::debug!("Rejected with a superseded token, replaying with current token");
                return Ok(current);
            }
        }

        if self.credential_pair().is_empty() {
            tracing::debug!("Rejected after the session already ended");
            return Err(AuthError::NoRefreshTokenAvailable);
        }

        match self.ensure_fresh_token().await {
            Ok(token) => Ok(token),
            Err(AuthError::NoRefreshTokenAvailable) => {
                self.expire_session(AuthError::NoRefreshTokenAvailable).await;
                Err(AuthError::NoRefreshTokenAvailable)
            }
            Err(e) => Err(e),
        }
    }

    /// Renew the access token if it expires within the refresh threshold.
    ///
    /// The expiry is read from the token without verifying it.
    pub async fn run_proactive_sweep(&self) -> SweepOutcome {
        let Some(token) = self.access_token() else {
            return SweepOutcome::NoSession;
        };

        let now = chrono::Utc::now().timestamp();
        let Some(remaining_secs) = jwt_remaining_secs(&token, now) else {
            tracing::trace!("Access token has no readable expiry, skipping sweep");
            return SweepOutcome::UnknownExpiry;
        };

        let threshold = self.inner.settings.refresh_threshold.as_secs() as i64;
        if remaining_secs >= threshold {
            tracing::trace!("Access token valid for {}s, no refresh needed", remaining_secs);
            return SweepOutcome::Fresh { remaining_secs };
        }

        tracing::info!(
            "Access token expires in {}s, refreshing proactively",
            remaining_secs
        );
        match self.ensure_fresh_token().await {
            Ok(_) => SweepOutcome::Renewed,
            Err(e) => SweepOutcome::Failed(e),
        }
    }

    /// Start the periodic sweep. No-op if it is already running.
    ///
    /// The first sweep runs immediately.
    pub fn arm_sweep(&self) {
        let mut slot = self.inner.sweep();
        if slot.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let weak: Weak<CoordinatorInner> = Arc::downgrade(&self.inner);
        let period = self.inner.settings.sweep_period;

        let task = tokio::spawn(async move {
            tracing::info!("Credential sweep started (period: {}s)", period.as_secs());
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                // Runs to completion so a failed renewal always finishes expiring the session.
                let coordinator = CredentialCoordinator { inner };
                if let SweepOutcome::Failed(e) = coordinator.run_proactive_sweep().await {
                    tracing::warn!("Proactive refresh failed: {}", e);
                }
            }

            tracing::debug!("Credential sweep stopped");
        });

        *slot = Some(SweepHandle { cancel, _task: task });
    }

    /// Stop the periodic sweep. Idempotent.
    pub fn disarm_sweep(&self) {
        if let Some(sweep) = self.inner.sweep().take() {
            sweep.cancel.cancel();
        }
    }

    pub fn is_sweep_armed(&self) -> bool {
        self.inner.sweep().is_some()
    }

    /// Drop the pair, stop the sweep and wipe the store.
    pub async fn clear(&self) -> Result<(), AuthError> {
        self.disarm_sweep();
        self.inner.state().pair = CredentialPair::default();
        self.persist_current()
            .await
            .map_err(|e| AuthError::CredentialsSaveFailed {
                message: e.to_string(),
            })
    }

    async fn expire_session(&self, reason: AuthError) {
        tracing::warn!("Session expired: {}", reason);
        if let Err(e) = self.clear().await {
            tracing::warn!("Failed to clear stored credentials: {}", e);
        }
        self.emit(SessionEvent::Expired(reason));
    }

    /// Write the current pair to the store.
    ///
    /// The pair is read after the persist lock is taken, so concurrent
    /// writers always leave the latest pair behind. An empty pair also
    /// removes the stored user profile.
    async fn persist_current(&self) -> Result<(), StoreError> {
        let _lock = self.inner.persist_lock.lock().await;
        let pair = self.credential_pair();
        let store = &self.inner.store;

        match &pair.access_token {
            Some(token) => store.set(CredentialKey::AccessToken, token).await?,
            None => store.delete(CredentialKey::AccessToken).await?,
        }
        match &pair.refresh_token {
            Some(token) => store.set(CredentialKey::RefreshToken, token).await?,
            None => store.delete(CredentialKey::RefreshToken).await?,
        }
        if pair.is_empty() {
            store.delete(CredentialKey::User).await?;
        }
        Ok(())
    }
}
