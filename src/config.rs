//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default API root of a local deployment.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

const CREDENTIALS_DIR: &str = ".geoarchive";
const CREDENTIALS_FILE: &str = ".credentials.json";

/// Configuration for the geoarchive client.
///
/// Use the builder pattern to customize.
///
/// # Example
///
/// ```ignore
/// use geoarchive::config::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::from_env()
///     .with_poll_interval(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root, without trailing slash (default: http://localhost:8000/api/v1)
    pub base_url: String,
    /// Delay between two polls of one task (default: 2s)
    pub poll_interval: Duration,
    /// Time after which an unsettled task is timed out (default: 300s)
    pub max_wait: Duration,
    /// Period of the proactive credential sweep (default: 300s)
    pub sweep_period: Duration,
    /// Renew the access token when it has less than this left (default: 300s)
    pub refresh_threshold: Duration,
    /// Per-request HTTP timeout (default: 30s)
    pub request_timeout: Duration,
    /// Credential file (default: ~/.geoarchive/.credentials.json)
    pub credentials_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(300),
            sweep_period: Duration::from_secs(300),
            refresh_threshold: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            credentials_path: default_credentials_path(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_sweep_period(mut self, period: Duration) -> Self {
        self.sweep_period = period;
        self
    }

    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    /// Create config from environment variables.
    ///
    /// - `GEOARCHIVE_API_URL` overrides the API root
    /// - `GEOARCHIVE_POLL_INTERVAL_MS` / `GEOARCHIVE_MAX_WAIT_MS` set task timing
    /// - `GEOARCHIVE_CREDENTIALS` overrides the credential file
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("GEOARCHIVE_API_URL") {
            if !url.trim().is_empty() {
                config = config.with_base_url(url.trim());
            }
        }
        if let Some(ms) = env_millis("GEOARCHIVE_POLL_INTERVAL_MS") {
            config.poll_interval = ms;
        }
        if let Some(ms) = env_millis("GEOARCHIVE_MAX_WAIT_MS") {
            config.max_wait = ms;
        }
        if let Ok(path) = std::env::var("GEOARCHIVE_CREDENTIALS") {
            if !path.trim().is_empty() {
                config.credentials_path = PathBuf::from(path);
            }
        }

        config
    }

    /// Absolute URL for an API path such as `/tasks/J1`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}

/// `~/.geoarchive/.credentials.json`, or relative to the working directory
/// when no home directory is known.
pub fn default_credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CREDENTIALS_DIR)
        .join(CREDENTIALS_FILE)
}
