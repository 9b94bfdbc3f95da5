// crates/client/src/lib.rs
//! Client-side monitor for server-side batch analysis jobs.
//!
//! The backend exposes three endpoints: job submission, per-job status,
//! and a liveness check. There is no push channel, so completion is
//! observed by polling. This crate owns the polling control loop
//! (failure classification, geometric backoff, backend-death detection,
//! clean cancellation) and publishes progress to subscribers.

pub mod backoff;
pub mod config;
pub mod error;
pub mod monitor;
pub mod probe;
mod session;
pub mod submit;

pub use config::MonitorConfig;
pub use error::{ProbeError, SubmitError};
pub use monitor::{Availability, JobMonitor, MonitorEvent};
pub use probe::{HealthProbe, StatusProbe};
pub use session::{AbortReason, SessionOutcome};
pub use submit::SubmitClient;
