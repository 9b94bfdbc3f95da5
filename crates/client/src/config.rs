// crates/client/src/config.rs
//! Monitor configuration.

use std::time::Duration;

/// Configuration for the job monitor.
///
/// Defaults carry the production values; tests shrink the intervals to
/// keep wall-clock time down.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Backend base URL, no trailing slash (e.g. `http://127.0.0.1:8000`).
    pub base_url: String,
    /// Per-request bound on the status probe.
    pub status_timeout: Duration,
    /// Per-request bound on the health probe. Short, since the health
    /// probe is a tie-breaker, never the primary signal.
    pub health_timeout: Duration,
    /// Baseline poll interval while the backend is healthy.
    pub poll_interval: Duration,
    /// Ceiling the backoff curve flattens against.
    pub max_poll_interval: Duration,
    /// Consecutive failures below this count do not slow polling down.
    pub backoff_threshold: u32,
    /// Geometric growth factor once past the threshold.
    pub backoff_factor: f64,
    /// Unreachable streak length that triggers a health-probe check.
    pub max_consecutive_failures: u32,
    /// Retry budget since the last successful probe.
    pub max_retries: u32,
    /// How long without a success before the retry budget becomes fatal.
    pub staleness_window: Duration,
    /// Sampling interval of the standalone liveness monitor.
    pub liveness_interval: Duration,
}

impl MonitorConfig {
    /// Config pointed at the given backend, defaults everywhere else.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            status_timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_secs(3),
            max_poll_interval: Duration::from_secs(15),
            backoff_threshold: 2,
            backoff_factor: 1.5,
            max_consecutive_failures: 5,
            max_retries: 10,
            staleness_window: Duration::from_secs(30),
            liveness_interval: Duration::from_secs(30),
        }
    }
}
