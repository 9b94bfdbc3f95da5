// crates/client/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Outcome classification for a failed status or health probe.
///
/// `Unreachable`, `Timeout` and `ServerError` are recoverable; the poll
/// loop absorbs them through retry and backoff. `NotFound` is fatal: a
/// job the server does not know about cannot self-heal.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("backend unreachable")]
    Unreachable,

    #[error("status request timed out")]
    Timeout,

    #[error("job not found")]
    NotFound,

    #[error("server error: {0}")]
    ServerError(String),
}

impl ProbeError {
    /// Classify a transport-level failure from the HTTP client.
    pub(crate) fn from_transport(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout
        } else {
            // Connection refused, DNS failure, TLS teardown: all read as
            // "could not reach the backend" to the poll loop.
            Self::Unreachable
        }
    }
}

/// Errors surfaced by job submission.
///
/// None of these are retried: they indicate the request itself, not the
/// network's mood, is at fault. `Unreachable`/`Timeout` are the
/// exception and the caller may resubmit manually.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limited, try again later")]
    RateLimited,

    #[error("backend unreachable")]
    Unreachable,

    #[error("submission timed out")]
    Timeout,

    #[error("server error: {0}")]
    ServerError(String),

    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SubmitError {
    pub(crate) fn attachment(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Attachment {
            path: path.into(),
            source,
        }
    }
}
