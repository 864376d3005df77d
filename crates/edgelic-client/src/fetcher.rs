//! Online license fetcher.

use std::time::Duration;

use async_trait::async_trait;
use edgelic_core::CancelSignal;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::config::{ConfigError, LicensingServerConfig};
use crate::error::FetchError;
use crate::retry::retry_with_delays;
use crate::source::{FetchedLicense, LicenseSource};

/// Media type of a compact JWS response.
pub const APPLICATION_JWT: &str = "application/jwt";

/// Client for the licensing authority.
///
/// Holds one pooled `reqwest::Client`; clones share it.
#[derive(Debug, Clone)]
pub struct LicenseClient {
    http: reqwest::Client,
    server_url: url::Url,
    retry_delays: Vec<Duration>,
}

impl LicenseClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// [`FetchError::Config`] for a zero timeout, [`FetchError::ClientBuild`]
    /// if the TLS backend cannot be initialised.
    pub fn new(config: LicensingServerConfig) -> Result<Self, FetchError> {
        if config.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout.into());
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JWT));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(FetchError::ClientBuild)?;

        Ok(Self {
            http,
            server_url: config.server_url,
            retry_delays: config.retry_delays,
        })
    }

    /// The licensing server endpoint.
    pub fn server_url(&self) -> &url::Url {
        &self.server_url
    }

    /// Fetch a fresh license for `license_key`.
    ///
    /// A new nonce is generated per call and reused across retries of that
    /// call; the returned [`FetchedLicense::nonce`] is the value the token id
    /// must echo.
    pub async fn fetch_license(
        &self,
        license_key: &str,
        cancel: &CancelSignal,
    ) -> Result<FetchedLicense, FetchError> {
        let nonce = Uuid::new_v4().hyphenated().to_string();
        tracing::trace!(endpoint = %self.server_url, "requesting license");

        let token = retry_with_delays(&self.retry_delays, cancel, || {
            self.request_once(&nonce, license_key)
        })
        .await?;

        Ok(FetchedLicense {
            token,
            nonce: Some(nonce),
        })
    }

    /// One POST to the licensing server.
    async fn request_once(
        &self,
        nonce: &str,
        license_key: &str,
    ) -> Result<Zeroizing<String>, FetchError> {
        let endpoint = self.server_url.as_str();
        let form = [("nonce", nonce), ("key", license_key)];

        let resp = self
            .http
            .post(self.server_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = Zeroizing::new(resp.text().await.map_err(|source| FetchError::Http {
            endpoint: endpoint.to_string(),
            source,
        })?);
        let token = body.trim();
        if token.is_empty() {
            return Err(FetchError::EmptyLicense {
                endpoint: endpoint.to_string(),
            });
        }
        Ok(Zeroizing::new(token.to_string()))
    }
}

#[async_trait]
impl LicenseSource for LicenseClient {
    async fn fetch(
        &self,
        license_key: &str,
        cancel: &CancelSignal,
    ) -> Result<FetchedLicense, FetchError> {
        self.fetch_license(license_key, cancel).await
    }
}
