//! Authenticated session facade.
//!
//! A [`Session`] is created by [`Session::login`] or [`Session::restore`]
//! and torn down by [`Session::logout`]. While it lives, the credential
//! sweep is armed and a listener turns a session-expired notification into
//! a forced logout.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::adapters::{FileCredentialStore, HttpAuthApi, HttpJobApi, ReqwestHttpClient};
use crate::auth::{CredentialCoordinator, RefreshSettings, SessionEvent, User};
use crate::config::ClientConfig;
use crate::dispatch::AuthorizedClient;
use crate::error::AuthError;
use crate::tasks::TaskMonitor;
use crate::traits::{AuthApi, CredentialKey, CredentialStore, HttpClient};

/// The collaborators a session is built from.
#[derive(Clone)]
pub struct Backend {
    pub http: Arc<dyn HttpClient>,
    pub auth: Arc<dyn AuthApi>,
    pub store: Arc<dyn CredentialStore>,
    pub base_url: String,
    pub settings: RefreshSettings,
}

impl Backend {
    /// Production adapters for `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        let http: Arc<dyn HttpClient> =
            Arc::new(ReqwestHttpClient::with_timeout(config.request_timeout));
        Self {
            auth: Arc::new(HttpAuthApi::new(http.clone(), config.base_url.clone())),
            store: Arc::new(FileCredentialStore::with_path(config.credentials_path.clone())),
            http,
            base_url: config.base_url.clone(),
            settings: RefreshSettings::from_config(config),
        }
    }

    fn coordinator(&self) -> CredentialCoordinator {
        CredentialCoordinator::with_settings(self.auth.clone(), self.store.clone(), self.settings)
    }
}

/// A signed-in user's session.
pub struct Session {
    client: AuthorizedClient,
    store: Arc<dyn CredentialStore>,
    user: Arc<Mutex<Option<User>>>,
    listener: CancellationToken,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("user", &self.current_user().map(|u| u.username))
            .finish()
    }
}

impl Session {
    /// Sign in with username and password.
    ///
    /// The credential pair and user profile are persisted. A persistence
    /// failure is logged; the session still works in memory.
    pub async fn login(
        backend: &Backend,
        username: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let response = backend.auth.login(username, password).await?;
        tracing::info!("Logged in as {}", response.user.username);

        let coordinator = backend.coordinator();
        let pair = response.credential_pair();
        if let Err(e) = coordinator
            .set_tokens(pair.access_token, pair.refresh_token)
            .await
        {
            tracing::warn!("{}", e);
        }
        if response.refresh_token.is_none() {
            tracing::debug!("No refresh token issued; the session ends when the access token expires");
        }

        let session = Session::start(backend, coordinator, Some(response.user));
        session.persist_user().await;
        session.client.coordinator().emit(SessionEvent::LoggedIn);
        Ok(session)
    }

    /// Resume the session held in the credential store, if any.
    pub async fn restore(backend: &Backend) -> Result<Option<Session>, AuthError> {
        let coordinator = backend.coordinator();
        let pair = coordinator.load_persisted().await?;
        if !pair.has_token() {
            tracing::debug!("No stored session");
            return Ok(None);
        }

        let user = match backend.store.get(CredentialKey::User).await {
            Ok(Some(json)) => serde_json::from_str::<User>(&json)
                .map_err(|e| tracing::warn!("Ignoring unreadable stored user: {}", e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read stored user: {}", e);
                None
            }
        };

        tracing::info!("Restored stored session");
        Ok(Some(Session::start(backend, coordinator, user)))
    }

    fn start(backend: &Backend, coordinator: CredentialCoordinator, user: Option<User>) -> Session {
        let user = Arc::new(Mutex::new(user));
        let listener = CancellationToken::new();
        spawn_expiry_listener(coordinator.subscribe(), user.clone(), listener.clone());
        coordinator.arm_sweep();

        Session {
            client: AuthorizedClient::new(backend.http.clone(), coordinator, backend.base_url.clone()),
            store: backend.store.clone(),
            user,
            listener,
        }
    }

    /// End the session and wipe stored credentials.
    pub async fn logout(self) -> Result<(), AuthError> {
        self.listener.cancel();
        *self.user_slot() = None;
        let result = self.coordinator().clear().await;
        self.coordinator().emit(SessionEvent::LoggedOut);
        tracing::info!("Logged out");
        result
    }

    pub fn is_authenticated(&self) -> bool {
        self.coordinator().access_token().is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.user_slot().clone()
    }

    /// Reload the user profile from `GET /auth/me`.
    ///
    /// A failure that requires signing in again ends the session.
    pub async fn refresh_user(&self) -> Result<User, AuthError> {
        match self.client.get_json::<User>("/auth/me").await {
            Ok(user) => {
                *self.user_slot() = Some(user.clone());
                self.persist_user().await;
                Ok(user)
            }
            Err(e) => {
                let reauth = e.requires_reauth();
                let err = AuthError::from(e);
                if reauth && self.is_authenticated() {
                    tracing::warn!("Failed to refresh user, logging out: {}", err);
                    *self.user_slot() = None;
                    if let Err(e) = self.coordinator().clear().await {
                        tracing::warn!("{}", e);
                    }
                    self.coordinator().emit(SessionEvent::LoggedOut);
                }
                Err(err)
            }
        }
    }

    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.coordinator().subscribe()
    }

    pub fn client(&self) -> &AuthorizedClient {
        &self.client
    }

    pub fn coordinator(&self) -> &CredentialCoordinator {
        self.client.coordinator()
    }

    pub fn job_api(&self) -> HttpJobApi {
        HttpJobApi::new(self.client.clone())
    }

    /// A task monitor whose polls are authorized by this session.
    pub fn task_monitor(&self) -> TaskMonitor {
        TaskMonitor::new(Arc::new(self.job_api()))
    }

    fn user_slot(&self) -> MutexGuard<'_, Option<User>> {
        self.user.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn persist_user(&self) {
        let Some(user) = self.current_user() else {
            return;
        };
        let result = match serde_json::to_string(&user) {
            Ok(json) => self.store.set(CredentialKey::User, &json).await,
            Err(e) => {
                tracing::warn!("Failed to encode user: {}", e);
                return;
            }
        };
        if let Err(e) = result {
            tracing::warn!("Failed to persist user: {}", e);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.listener.cancel();
        self.client.coordinator().disarm_sweep();
    }
}

/// Forget the user when the coordinator reports an expired session.
fn spawn_expiry_listener(
    mut events: broadcast::Receiver<SessionEvent>,
    user: Arc<Mutex<Option<User>>>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(SessionEvent::Expired(reason)) => {
                    tracing::warn!("Session expired, signing out: {}", reason);
                    *user.lock().unwrap_or_else(|e| e.into_inner()) = None;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Session listener skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
