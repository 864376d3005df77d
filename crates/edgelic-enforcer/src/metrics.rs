//! # Licensing Metrics
//!
//! Prometheus gauges describing how close the module is to losing its
//! license, plus a histogram of check durations. All series carry the
//! `device_id` and `module_id` const labels of the enforcing module.
//!
//! The metrics are registered in a caller-owned [`Registry`] so that the
//! host process can export them next to its own series.

use std::collections::HashMap;
use std::sync::Arc;

use edgelic_core::ModuleIdentity;
use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

pub const CONSECUTIVE_FAILURES: &str = "edgelicensing_consecutive_failures";
pub const REMAINING_CONSECUTIVE_FAILURES: &str = "edgelicensing_remaining_consecutive_failures";
pub const CHECK_DURATION_SECONDS: &str = "edgelicensing_check_duration_seconds";

/// Errors from registering or encoding metrics.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics encoding produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Handles to the licensing series. Clones share the same series.
#[derive(Clone)]
pub struct LicensingMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    consecutive_failures: Gauge,
    remaining_consecutive_failures: Gauge,
    check_duration_seconds: Histogram,
}

impl std::fmt::Debug for LicensingMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicensingMetrics")
            .field("consecutive_failures", &self.consecutive_failures())
            .field(
                "remaining_consecutive_failures",
                &self.remaining_consecutive_failures(),
            )
            .finish()
    }
}

impl LicensingMetrics {
    /// Create the licensing series for `identity` and register them.
    ///
    /// # Errors
    ///
    /// Fails if the series already exist in `registry`.
    pub fn register(registry: &Registry, identity: &ModuleIdentity) -> Result<Self, MetricsError> {
        let labels: HashMap<String, String> = [
            ("device_id".to_string(), identity.host_name().to_string()),
            ("module_id".to_string(), identity.module_instance_name().to_string()),
        ]
        .into_iter()
        .collect();

        let consecutive_failures = Gauge::with_opts(
            Opts::new(
                CONSECUTIVE_FAILURES,
                "Number of consecutive failed license checks",
            )
            .const_labels(labels.clone()),
        )?;
        let remaining_consecutive_failures = Gauge::with_opts(
            Opts::new(
                REMAINING_CONSECUTIVE_FAILURES,
                "Failed license checks remaining before the module stops",
            )
            .const_labels(labels.clone()),
        )?;
        let check_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                CHECK_DURATION_SECONDS,
                "Duration of one license check in seconds",
            )
            .const_labels(labels)
            .buckets(prometheus::exponential_buckets(0.0001, 10.0, 7)?),
        )?;

        registry.register(Box::new(consecutive_failures.clone()))?;
        registry.register(Box::new(remaining_consecutive_failures.clone()))?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry: registry.clone(),
                consecutive_failures,
                remaining_consecutive_failures,
                check_duration_seconds,
            }),
        })
    }

    /// Publish the failure counters. `remaining` is `max - failures` and goes
    /// negative once the budget is exceeded.
    pub fn set_failures(&self, failures: u32, max: u32) {
        self.inner.consecutive_failures.set(f64::from(failures));
        self.inner
            .remaining_consecutive_failures
            .set(f64::from(max) - f64::from(failures));
    }

    pub fn observe_check_duration(&self, seconds: f64) {
        self.inner.check_duration_seconds.observe(seconds);
    }

    pub fn consecutive_failures(&self) -> f64 {
        self.inner.consecutive_failures.get()
    }

    pub fn remaining_consecutive_failures(&self) -> f64 {
        self.inner.remaining_consecutive_failures.get()
    }

    /// Number of checks observed by the duration histogram.
    pub fn checks_observed(&self) -> u64 {
        self.inner.check_duration_seconds.get_sample_count()
    }

    /// Gather the whole registry in the Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, MetricsError> {
        encode_registry(&self.inner.registry)
    }
}

/// Encode every metric family in `registry` in the Prometheus text format.
pub fn encode_registry(registry: &Registry) -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
