//! # edgelic-cli
//!
//! Bootstrap for the `edgelic` binary.
//!
//! - `edgelic run` starts the license enforcer for the current IoT Edge
//!   module, serves `/metrics`, and exits non-zero once the license is lost.
//! - `edgelic validate` checks a single token file offline and prints the
//!   outcome as JSON.

pub mod key;
pub mod metrics_server;
pub mod run;
pub mod telemetry;
pub mod validate;

/// Exit code for a license that failed validation or was lost at runtime.
pub const EXIT_LICENSE_INVALID: u8 = 2;
