//! License fetch error types.

/// Errors from fetching a license token.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP transport error (connect, TLS, timeout, body read).
    #[error("HTTP error calling {endpoint}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The licensing server returned a non-2xx status.
    #[error("licensing server {endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The licensing server returned 2xx with an empty body.
    #[error("licensing server {endpoint} returned an empty license")]
    EmptyLicense { endpoint: String },
    /// The fetch was cancelled before it completed.
    #[error("license fetch cancelled")]
    Cancelled,
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
    /// Configuration error.
    #[error("invalid licensing server configuration")]
    Config(#[from] super::config::ConfigError),
}

impl FetchError {
    /// Whether this error is the cooperative cancellation path.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status for [`FetchError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
