//! Licensing server client configuration.
//!
//! The server address is the only required value. Timeout and retry
//! schedule default to 60s and 2s/8s/30s; tests shrink them. A zero
//! timeout is rejected when the client is built.

use std::time::Duration;

use url::Url;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Delays between attempts: one initial request plus one retry per entry.
pub const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(2),
    Duration::from_secs(8),
    Duration::from_secs(30),
];

/// Configuration for the licensing server client.
#[derive(Debug, Clone)]
pub struct LicensingServerConfig {
    /// Endpoint the license request is POSTed to.
    pub server_url: Url,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Backoff before each retry, in order.
    pub retry_delays: Vec<Duration>,
}

impl LicensingServerConfig {
    /// Configuration for `server_url` with default timeout and retry schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingServerUrl`] for a blank address and
    /// [`ConfigError::InvalidUrl`] if it does not parse.
    pub fn new(server_url: &str) -> Result<Self, ConfigError> {
        if server_url.trim().is_empty() {
            return Err(ConfigError::MissingServerUrl);
        }
        let server_url = Url::parse(server_url.trim())
            .map_err(|e| ConfigError::InvalidUrl(server_url.to_string(), e.to_string()))?;
        Ok(Self {
            server_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        })
    }

    /// Replace the retry schedule.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Replace the request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("LICENSING_SERVER_URL is null or blank")]
    MissingServerUrl,
    #[error("invalid licensing server URL {0:?}: {1}")]
    InvalidUrl(String, String),
    #[error("licensing request timeout must be greater than zero")]
    ZeroTimeout,
}
