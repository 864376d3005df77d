//! Enforcement configuration.
//!
//! On an IoT Edge device the identity and license key come from the module
//! environment:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `IOTEDGE_MODULEID` | module instance name | required |
//! | `IOTEDGE_DEVICEID` | edge device (host) name | required |
//! | `IOTEDGE_IOTHUBHOSTNAME` | IoT Hub name | required |
//! | `MODULE_LICENSE_KEY` | license key sent to the server | required |
//! | `LICENSE_CHECK_INTERVAL_SECS` | delay between checks | 3600 |
//! | `LICENSE_MAX_CONSECUTIVE_FAILURES` | tolerated failures in a row | 36 |

use std::time::Duration;

use edgelic_core::{identity::require_non_blank, IdentityError, ModuleIdentity};
use zeroize::Zeroizing;

/// Delay between license checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Failed checks tolerated in a row after a successful startup check.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 36;

pub const ENV_MODULE_ID: &str = "IOTEDGE_MODULEID";
pub const ENV_DEVICE_ID: &str = "IOTEDGE_DEVICEID";
pub const ENV_IOTHUB_HOSTNAME: &str = "IOTEDGE_IOTHUBHOSTNAME";
pub const ENV_LICENSE_KEY: &str = "MODULE_LICENSE_KEY";
pub const ENV_CHECK_INTERVAL_SECS: &str = "LICENSE_CHECK_INTERVAL_SECS";
pub const ENV_MAX_CONSECUTIVE_FAILURES: &str = "LICENSE_MAX_CONSECUTIVE_FAILURES";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Everything the enforcement loop needs besides its collaborators.
#[derive(Clone)]
pub struct EnforcementConfig {
    /// License key sent to the licensing server.
    pub license_key: Zeroizing<String>,
    pub identity: ModuleIdentity,
    /// Audience the token must carry.
    pub valid_audience: String,
    /// Issuer the token must carry.
    pub valid_issuer: String,
    pub check_interval: Duration,
    pub max_consecutive_failures: u32,
}

impl std::fmt::Debug for EnforcementConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnforcementConfig")
            .field("license_key", &"[REDACTED]")
            .field("identity", &self.identity)
            .field("valid_audience", &self.valid_audience)
            .field("valid_issuer", &self.valid_issuer)
            .field("check_interval", &self.check_interval)
            .field("max_consecutive_failures", &self.max_consecutive_failures)
            .finish()
    }
}

impl EnforcementConfig {
    /// Configuration with the default interval and failure budget.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Identity`] naming the first blank value among
    /// the license key, audience and issuer.
    pub fn new(
        license_key: impl Into<String>,
        identity: ModuleIdentity,
        valid_audience: impl Into<String>,
        valid_issuer: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let license_key = Zeroizing::new(license_key.into());
        let valid_audience = valid_audience.into();
        let valid_issuer = valid_issuer.into();

        require_non_blank("license key", &license_key)?;
        require_non_blank("valid audience", &valid_audience)?;
        require_non_blank("valid issuer", &valid_issuer)?;

        Ok(Self {
            license_key,
            identity,
            valid_audience,
            valid_issuer,
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        })
    }

    /// Load identity, license key and tuning from the process environment.
    /// Audience and issuer are decided by the host application.
    pub fn from_env(
        valid_audience: impl Into<String>,
        valid_issuer: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), valid_audience, valid_issuer)
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(
        lookup: F,
        valid_audience: impl Into<String>,
        valid_issuer: impl Into<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));

        let identity = ModuleIdentity::new(
            required(ENV_MODULE_ID)?,
            required(ENV_DEVICE_ID)?,
            required(ENV_IOTHUB_HOSTNAME)?,
        )?;
        let mut config = Self::new(
            required(ENV_LICENSE_KEY)?,
            identity,
            valid_audience,
            valid_issuer,
        )?;

        if let Some(raw) = lookup(ENV_CHECK_INTERVAL_SECS) {
            let secs = parse_positive(ENV_CHECK_INTERVAL_SECS, &raw)?;
            config.check_interval = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_MAX_CONSECUTIVE_FAILURES) {
            config.max_consecutive_failures = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    name: ENV_MAX_CONSECUTIVE_FAILURES,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(config)
    }

    /// Replace the delay between checks.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Replace the tolerated number of consecutive failures.
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
        reason,
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(invalid("must be greater than zero".into())),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(e.to_string())),
    }
}
