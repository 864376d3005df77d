//! Where license tokens come from.
//!
//! The enforcement loop only needs "give me a token for this key";
//! [`LicenseClient`](crate::LicenseClient) answers online, and
//! [`StaticLicenseSource`] replays a pre-provisioned token for offline
//! deployments and tests.

use async_trait::async_trait;
use edgelic_core::CancelSignal;
use zeroize::Zeroizing;

use crate::error::FetchError;

/// A raw token together with the nonce it must echo.
#[derive(Clone)]
pub struct FetchedLicense {
    /// Compact JWS as returned by the source.
    pub token: Zeroizing<String>,
    /// Nonce sent with the request; `None` when the source cannot bind one.
    pub nonce: Option<String>,
}

impl std::fmt::Debug for FetchedLicense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedLicense")
            .field("token", &"[REDACTED]")
            .field("nonce", &self.nonce)
            .finish()
    }
}

/// Produces license tokens for a license key.
#[async_trait]
pub trait LicenseSource: Send + Sync {
    /// Obtain a token for `license_key`.
    ///
    /// Implementations must return [`FetchError::Cancelled`] promptly once
    /// `cancel` fires.
    async fn fetch(
        &self,
        license_key: &str,
        cancel: &CancelSignal,
    ) -> Result<FetchedLicense, FetchError>;
}

/// Always yields the same pre-provisioned token, without a nonce.
///
/// Replay detection is therefore disabled for static licenses; the
/// signature, lifetime and identity checks still apply.
#[derive(Clone)]
pub struct StaticLicenseSource {
    token: Zeroizing<String>,
}

impl StaticLicenseSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Zeroizing::new(token.into().trim().to_string()),
        }
    }
}

impl std::fmt::Debug for StaticLicenseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticLicenseSource")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl LicenseSource for StaticLicenseSource {
    async fn fetch(
        &self,
        _license_key: &str,
        cancel: &CancelSignal,
    ) -> Result<FetchedLicense, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        Ok(FetchedLicense {
            token: self.token.clone(),
            nonce: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgelic_core::cancel_pair;

    #[tokio::test]
    async fn static_source_returns_trimmed_token_without_nonce() {
        let (_handle, signal) = cancel_pair();
        let source = StaticLicenseSource::new("  header.payload.sig\n");
        let fetched = source.fetch("key", &signal).await.unwrap();
        assert_eq!(fetched.token.as_str(), "header.payload.sig");
        assert!(fetched.nonce.is_none());
    }

    #[tokio::test]
    async fn static_source_honours_cancellation() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        let source = StaticLicenseSource::new("t");
        assert!(source.fetch("key", &signal).await.unwrap_err().is_cancelled());
    }

    #[test]
    fn debug_redacts_token() {
        let source = StaticLicenseSource::new("secret.token.value");
        assert!(!format!("{source:?}").contains("secret"));
        let fetched = FetchedLicense {
            token: Zeroizing::new("secret.token.value".into()),
            nonce: Some("n".into()),
        };
        assert!(!format!("{fetched:?}").contains("secret"));
    }
}
