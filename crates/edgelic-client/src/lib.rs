//! # edgelic-client: Licensing Authority Client
//!
//! Fetches signed license tokens from the licensing authority. Each fetch
//! sends the module's license key together with a fresh single-use nonce;
//! the authority echoes the nonce as the token id so a previously issued
//! token cannot be replayed.
//!
//! ## Wire Contract
//!
//! `POST {server_url}` with form fields `nonce` and `key`, header
//! `Accept: application/jwt`. A 2xx response body is the compact JWS;
//! anything else is a failure.
//!
//! ## Retry
//!
//! Transport failures and non-2xx responses are retried after fixed delays
//! (2s, 8s, 30s by default). Every request and delay races the caller's
//! [`CancelSignal`](edgelic_core::CancelSignal); once cancelled, no further
//! attempt is made.

pub mod config;
pub mod error;
pub mod fetcher;
pub(crate) mod retry;
pub mod source;

pub use config::{ConfigError, LicensingServerConfig};
pub use error::FetchError;
pub use fetcher::LicenseClient;
pub use source::{FetchedLicense, LicenseSource, StaticLicenseSource};
