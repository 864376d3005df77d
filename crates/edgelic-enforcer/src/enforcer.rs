//! The periodic enforcement task.

use std::sync::Arc;

use chrono::Utc;
use edgelic_client::LicenseSource;
use edgelic_core::{cancel_pair, CancelHandle, CancelSignal, TokenValidator, ValidationRequest};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::EnforcementConfig;
use crate::error::{CheckFailure, EnforcementError};
use crate::metrics::LicensingMetrics;
use crate::state::{EnforcementState, EnforcementStatus, FailureDisposition};

/// Result of one check cycle.
enum CheckResult {
    Valid,
    Failed(CheckFailure),
    Cancelled,
}

/// Validates the module license at startup and then periodically.
pub struct LicenseEnforcer {
    source: Arc<dyn LicenseSource>,
    validator: TokenValidator,
    config: EnforcementConfig,
    metrics: LicensingMetrics,
}

impl std::fmt::Debug for LicenseEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseEnforcer")
            .field("validator", &self.validator)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LicenseEnforcer {
    pub fn new(
        source: Arc<dyn LicenseSource>,
        validator: TokenValidator,
        config: EnforcementConfig,
        metrics: LicensingMetrics,
    ) -> Self {
        Self {
            source,
            validator,
            config,
            metrics,
        }
    }

    /// Spawn the enforcement task on the current tokio runtime.
    ///
    /// The first check starts immediately. Gauges are reset to zero failures
    /// before this returns.
    pub fn start(self) -> EnforcementHandle {
        let max = self.config.max_consecutive_failures;
        let state = EnforcementState::new(max);
        self.metrics.set_failures(0, max);

        let identity = &self.config.identity;
        tracing::info!(
            module = identity.module_instance_name(),
            host = identity.host_name(),
            hub = identity.hub_name(),
            audience = %self.config.valid_audience,
            issuer = %self.config.valid_issuer,
            interval_secs = self.config.check_interval.as_secs(),
            max_consecutive_failures = max,
            "beginning periodic license validation"
        );

        let (cancel, signal) = cancel_pair();
        let (status_tx, status_rx) = watch::channel(state.status());
        let task = tokio::spawn(self.run(state, signal, status_tx));

        EnforcementHandle {
            cancel,
            status: status_rx,
            task,
        }
    }

    async fn run(
        self,
        mut state: EnforcementState,
        cancel: CancelSignal,
        status: watch::Sender<EnforcementStatus>,
    ) -> Result<(), EnforcementError> {
        let max = state.max_consecutive_failures();

        loop {
            state.begin_check();
            status.send_replace(state.status());
            tracing::trace!(first_check = state.is_first_check(), "performing license check");

            let started = Instant::now();
            let result = self.check_once(&cancel).await;

            match result {
                CheckResult::Cancelled => break,
                CheckResult::Valid => {
                    self.metrics
                        .observe_check_duration(started.elapsed().as_secs_f64());
                    state.record_success();
                    self.metrics.set_failures(0, max);
                    tracing::trace!("license check passed");
                }
                CheckResult::Failed(failure) => {
                    self.metrics
                        .observe_check_duration(started.elapsed().as_secs_f64());
                    let disposition = state.record_failure();
                    let failures = state.consecutive_failures();
                    self.metrics.set_failures(failures, max);
                    status.send_replace(state.status());

                    match disposition {
                        FailureDisposition::Tolerated => {
                            tracing::error!(
                                failures,
                                max,
                                error = &failure as &dyn std::error::Error,
                                "license check failed {failures} consecutive time(s) of max {max}"
                            );
                        }
                        FailureDisposition::FatalAtStartup => {
                            tracing::error!(
                                error = &failure as &dyn std::error::Error,
                                "startup license check failed"
                            );
                            return Err(EnforcementError::StartupLicenseInvalid(failure));
                        }
                        FailureDisposition::FatalBudgetExceeded => {
                            tracing::error!(
                                failures,
                                max,
                                error = &failure as &dyn std::error::Error,
                                "license check failed {failures} consecutive times, exceeding max {max}"
                            );
                            return Err(EnforcementError::ConsecutiveFailuresExceeded {
                                failures,
                                max,
                                cause: failure,
                            });
                        }
                    }
                }
            }
            status.send_replace(state.status());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.check_interval) => {}
            }
        }

        tracing::debug!("cancelled periodic license checks");
        state.begin_stopping();
        status.send_replace(state.status());
        state.mark_stopped();
        status.send_replace(state.status());
        Ok(())
    }

    /// Fetch and validate one token.
    async fn check_once(&self, cancel: &CancelSignal) -> CheckResult {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CheckResult::Cancelled,
            fetched = self.source.fetch(&self.config.license_key, cancel) => fetched,
        };

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) if e.is_cancelled() || cancel.is_cancelled() => return CheckResult::Cancelled,
            Err(e) => return CheckResult::Failed(CheckFailure::Fetch(e)),
        };
        if cancel.is_cancelled() {
            return CheckResult::Cancelled;
        }

        let request = ValidationRequest::for_identity(
            &self.config.identity,
            &self.config.valid_audience,
            &self.config.valid_issuer,
            Utc::now(),
        )
        .expecting_token_id(fetched.nonce.as_deref());

        let outcome = self.validator.validate(&fetched.token, &request);
        if outcome.is_valid() {
            CheckResult::Valid
        } else {
            CheckResult::Failed(CheckFailure::Rejected(outcome))
        }
    }
}

/// Owner of a running enforcement task.
///
/// Dropping the handle cancels the task; use [`stop`](Self::stop) or
/// [`join`](Self::join) to observe its result.
#[derive(Debug)]
pub struct EnforcementHandle {
    cancel: CancelHandle,
    status: watch::Receiver<EnforcementStatus>,
    task: JoinHandle<Result<(), EnforcementError>>,
}

impl EnforcementHandle {
    /// Latest status published by the task.
    pub fn status(&self) -> EnforcementStatus {
        *self.status.borrow()
    }

    /// A receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<EnforcementStatus> {
        self.status.clone()
    }

    /// A handle that stops the task without consuming `self`.
    pub fn canceller(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Request cancellation and wait for the task to exit.
    pub async fn stop(self) -> Result<(), EnforcementError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the task to exit on its own (fatal escalation) or after a
    /// cancellation raised elsewhere.
    pub async fn join(self) -> Result<(), EnforcementError> {
        let Self { cancel, task, .. } = self;
        let result = task.await;
        // Held until the task exits; dropping it earlier would cancel the loop.
        drop(cancel);
        match result {
            Ok(result) => result,
            Err(e) => Err(EnforcementError::TaskFailed(e.to_string())),
        }
    }
}
