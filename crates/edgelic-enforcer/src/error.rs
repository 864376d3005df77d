//! Enforcement error types.

use edgelic_client::FetchError;
use edgelic_core::ValidationOutcome;

/// Why a single license check failed.
#[derive(Debug, thiserror::Error)]
pub enum CheckFailure {
    /// A token was obtained but did not validate.
    #[error("license rejected: {0}")]
    Rejected(ValidationOutcome),
    /// No token could be obtained.
    #[error("license fetch failed")]
    Fetch(#[source] FetchError),
}

impl CheckFailure {
    /// The validation outcome, for rejected tokens.
    pub fn outcome(&self) -> Option<ValidationOutcome> {
        match self {
            Self::Rejected(outcome) => Some(*outcome),
            Self::Fetch(_) => None,
        }
    }
}

/// Terminal errors of the enforcement task.
///
/// Every variant means the module is no longer licensed to run.
#[derive(Debug, thiserror::Error)]
pub enum EnforcementError {
    /// The check performed at startup failed.
    #[error("startup license check failed")]
    StartupLicenseInvalid(#[source] CheckFailure),

    /// More than the tolerated number of checks failed in a row.
    #[error("license check failed {failures} consecutive times (max {max})")]
    ConsecutiveFailuresExceeded {
        failures: u32,
        max: u32,
        #[source]
        cause: CheckFailure,
    },

    /// The enforcement task panicked or was aborted.
    #[error("enforcement task terminated abnormally: {0}")]
    TaskFailed(String),
}

impl EnforcementError {
    /// The failure that triggered escalation, if any.
    pub fn cause(&self) -> Option<&CheckFailure> {
        match self {
            Self::StartupLicenseInvalid(cause) => Some(cause),
            Self::ConsecutiveFailuresExceeded { cause, .. } => Some(cause),
            Self::TaskFailed(_) => None,
        }
    }
}
