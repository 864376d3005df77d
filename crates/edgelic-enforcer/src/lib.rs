//! # edgelic-enforcer
//!
//! Keeps a module licensed. A [`LicenseEnforcer`] fetches and validates a
//! license once at startup and then every check interval. The first check
//! must pass; afterwards up to `max_consecutive_failures` failed checks in a
//! row are tolerated before the enforcer gives up.
//!
//! The loop runs on its own tokio task. [`EnforcementHandle::stop`] cancels
//! it cooperatively; fatal escalation ends the task with an
//! [`EnforcementError`] that the host process turns into a non-zero exit.

pub mod config;
pub mod enforcer;
pub mod error;
pub mod metrics;
pub mod state;

pub use config::{ConfigError, EnforcementConfig};
pub use enforcer::{EnforcementHandle, LicenseEnforcer};
pub use error::{CheckFailure, EnforcementError};
pub use metrics::{LicensingMetrics, MetricsError};
pub use state::{EnforcementPhase, EnforcementState, EnforcementStatus, FailureDisposition};
