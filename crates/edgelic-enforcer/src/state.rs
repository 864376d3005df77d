//! Enforcement state machine.
//!
//! ```text
//! Starting -> Checking -> Healthy | Degraded -> Checking -> ... -> Fatal
//!        any state -- cancel --> Stopping -> Stopped
//! ```
//!
//! The state is owned by the enforcement task. Observers see it through
//! [`EnforcementStatus`] snapshots.

use serde::Serialize;

/// Lifecycle phase of an enforcer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementPhase {
    Starting,
    Checking,
    /// Last check passed.
    Healthy,
    /// Last check failed but the failure budget is not exhausted.
    Degraded,
    /// The license was lost; the task has ended with an error.
    Fatal,
    Stopping,
    Stopped,
}

/// What the loop must do after a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Keep running.
    Tolerated,
    /// The very first check failed.
    FatalAtStartup,
    /// The failure budget is exhausted.
    FatalBudgetExceeded,
}

impl FailureDisposition {
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::Tolerated)
    }
}

/// Point-in-time view of an enforcer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnforcementStatus {
    pub phase: EnforcementPhase,
    pub consecutive_failures: u32,
    pub max_consecutive_failures: u32,
    /// Checks that ran to a verdict (cancelled checks are not counted).
    pub checks_completed: u64,
}

impl EnforcementStatus {
    /// Failures left before escalation; negative once exceeded.
    pub fn remaining_failures(&self) -> i64 {
        i64::from(self.max_consecutive_failures) - i64::from(self.consecutive_failures)
    }
}

/// Mutable enforcement state.
#[derive(Debug, Clone)]
pub struct EnforcementState {
    phase: EnforcementPhase,
    consecutive_failures: u32,
    max_consecutive_failures: u32,
    is_first_check: bool,
    checks_completed: u64,
}

impl EnforcementState {
    pub fn new(max_consecutive_failures: u32) -> Self {
        Self {
            phase: EnforcementPhase::Starting,
            consecutive_failures: 0,
            max_consecutive_failures,
            is_first_check: true,
            checks_completed: 0,
        }
    }

    pub fn phase(&self) -> EnforcementPhase {
        self.phase
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn max_consecutive_failures(&self) -> u32 {
        self.max_consecutive_failures
    }

    pub fn is_first_check(&self) -> bool {
        self.is_first_check
    }

    pub fn begin_check(&mut self) {
        self.phase = EnforcementPhase::Checking;
    }

    /// A check passed: the failure count resets.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.is_first_check = false;
        self.checks_completed += 1;
        self.phase = EnforcementPhase::Healthy;
    }

    /// A check failed. The first check of a run is never tolerated; later
    /// failures are tolerated while the count stays within the budget.
    pub fn record_failure(&mut self) -> FailureDisposition {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.checks_completed += 1;
        let first = std::mem::replace(&mut self.is_first_check, false);

        let disposition = if first {
            FailureDisposition::FatalAtStartup
        } else if self.consecutive_failures > self.max_consecutive_failures {
            FailureDisposition::FatalBudgetExceeded
        } else {
            FailureDisposition::Tolerated
        };

        self.phase = if disposition.is_fatal() {
            EnforcementPhase::Fatal
        } else {
            EnforcementPhase::Degraded
        };
        disposition
    }

    pub fn begin_stopping(&mut self) {
        self.phase = EnforcementPhase::Stopping;
    }

    pub fn mark_stopped(&mut self) {
        self.phase = EnforcementPhase::Stopped;
    }

    pub fn status(&self) -> EnforcementStatus {
        EnforcementStatus {
            phase: self.phase,
            consecutive_failures: self.consecutive_failures,
            max_consecutive_failures: self.max_consecutive_failures,
            checks_completed: self.checks_completed,
        }
    }
}
