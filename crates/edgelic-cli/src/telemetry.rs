//! Process-wide tracing setup.
//!
//! The subscriber is installed at most once per process; later calls are
//! no-ops. `RUST_LOG` overrides the default filter.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// How log output is produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryConfig {
    /// Development hosts log at `trace` instead of `debug`.
    pub development: bool,
    /// Emit one JSON object per event.
    pub json: bool,
}

impl TelemetryConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> &'static str {
        if self.development {
            "trace"
        } else {
            "debug"
        }
    }
}

/// Whether an environment name denotes a development host.
pub fn is_development(environment: &str) -> bool {
    environment.trim().eq_ignore_ascii_case("development")
}

/// Install the global subscriber. Timestamps are UTC RFC 3339.
pub fn init(config: TelemetryConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

        // try_init: a test harness may already own the global dispatcher.
        let _ = if config.json {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(false)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .try_init()
        };
    });
}
