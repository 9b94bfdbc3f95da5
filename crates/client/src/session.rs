// crates/client/src/session.rs
//! Per-session polling state machine.
//!
//! `SessionState` owns every mutable counter for one polling lifecycle
//! and `apply` encodes the transition rules as a pure function of
//! (probe outcome, now). The supervisor in `monitor.rs` drives it from
//! a timer and performs the I/O the returned `Step` asks for; nothing
//! here touches the network or the clock, which is what makes the rule
//! precedence independently testable.

use std::fmt;
use std::time::{Duration, Instant};

use hirewatch_types::{JobId, JobStatus, StatusSnapshot};

use crate::backoff::backoff_interval;
use crate::config::MonitorConfig;
use crate::error::ProbeError;

/// Why a session was aborted.
///
/// A fixed set rather than free text so callers can branch on the
/// reason; `message()` is the human-readable rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The server does not know the job id. Cannot self-heal.
    JobNotFound,
    /// Status probes failed repeatedly and the health probe agrees the
    /// backend is gone.
    BackendDown,
    /// Retry budget exhausted with no success inside the staleness
    /// window.
    ConnectionLost,
}

impl AbortReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::JobNotFound => "job not found, start a new analysis",
            Self::BackendDown => "backend server is down",
            Self::ConnectionLost => "connection lost too long, refresh and retry",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Terminal outcome of a polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    /// The server ran the job and reported it failed.
    Failed,
    /// The monitor gave up; the job itself may still be running.
    Aborted(AbortReason),
}

impl SessionOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Completed => "analysis complete",
            Self::Failed => "job processing failed",
            Self::Aborted(reason) => reason.message(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What the supervisor should do after one probe outcome.
#[derive(Debug)]
pub(crate) enum Step {
    /// Publish the snapshot and keep polling.
    Publish(StatusSnapshot),
    /// Publish the final snapshot, then terminate with `Completed`.
    Complete(StatusSnapshot),
    /// Terminate with the given outcome.
    Terminate(SessionOutcome),
    /// Unreachable streak hit the limit: consult the health probe. If
    /// the backend is also dead, terminate with `BackendDown`;
    /// otherwise keep polling under backoff.
    CheckBackend,
    /// Recoverable failure: keep polling, backoff already folded into
    /// `current_interval`.
    Retry,
}

/// Mutable state for one polling lifecycle.
///
/// Exclusively owned by the poll task: every mutation happens between
/// two awaits of the same task, so there is nothing to lock.
pub(crate) struct SessionState {
    pub(crate) job_id: JobId,
    config: MonitorConfig,
    pub(crate) started_at: Instant,
    consecutive_failures: u32,
    retry_attempts: u32,
    pub(crate) current_interval: Duration,
    last_success: Instant,
    terminal: bool,
}

impl SessionState {
    pub(crate) fn new(job_id: JobId, config: MonitorConfig, now: Instant) -> Self {
        let current_interval = config.poll_interval;
        Self {
            job_id,
            config,
            started_at: now,
            consecutive_failures: 0,
            retry_attempts: 0,
            current_interval,
            last_success: now,
            terminal: false,
        }
    }

    /// Fold one probe outcome into the session and decide the next step.
    ///
    /// Precedence: terminal job states first, then the fatal `NotFound`,
    /// then the recoverable failures with their escalation rules.
    pub(crate) fn apply(
        &mut self,
        outcome: Result<StatusSnapshot, ProbeError>,
        now: Instant,
    ) -> Step {
        debug_assert!(!self.terminal, "apply() after terminal transition");

        match outcome {
            Ok(snapshot) => {
                self.record_success(now);
                match snapshot.status {
                    JobStatus::Completed => {
                        self.terminal = true;
                        Step::Complete(snapshot)
                    }
                    JobStatus::Failed => {
                        self.terminal = true;
                        Step::Terminate(SessionOutcome::Failed)
                    }
                    JobStatus::CompletedWithErrors => {
                        // Informational only: keep polling until the
                        // server settles on completed or failed.
                        tracing::warn!(
                            job_id = self.job_id,
                            "job completed with partial failures, continuing to poll"
                        );
                        Step::Publish(snapshot)
                    }
                    JobStatus::Running => Step::Publish(snapshot),
                }
            }
            Err(ProbeError::NotFound) => {
                self.terminal = true;
                Step::Terminate(SessionOutcome::Aborted(AbortReason::JobNotFound))
            }
            Err(ProbeError::Unreachable) => {
                self.record_failure();
                if self.consecutive_failures >= self.config.max_consecutive_failures {
                    Step::CheckBackend
                } else {
                    Step::Retry
                }
            }
            Err(error @ (ProbeError::Timeout | ProbeError::ServerError(_))) => {
                self.record_failure();
                tracing::debug!(
                    job_id = self.job_id,
                    attempts = self.retry_attempts,
                    error = %error,
                    "status probe failed"
                );
                if self.retry_attempts >= self.config.max_retries
                    && now.duration_since(self.last_success) > self.config.staleness_window
                {
                    self.terminal = true;
                    Step::Terminate(SessionOutcome::Aborted(AbortReason::ConnectionLost))
                } else {
                    Step::Retry
                }
            }
        }
    }

    /// Mark the backend dead after a failed escalation check.
    pub(crate) fn abort_backend_down(&mut self) -> SessionOutcome {
        self.terminal = true;
        SessionOutcome::Aborted(AbortReason::BackendDown)
    }

    fn record_success(&mut self, now: Instant) {
        self.consecutive_failures = 0;
        self.retry_attempts = 0;
        self.last_success = now;
        self.current_interval = self.config.poll_interval;
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.retry_attempts += 1;
        self.current_interval = backoff_interval(&self.config, self.consecutive_failures);
    }
}
