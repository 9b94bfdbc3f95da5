//! Status and health probes.
//!
//! Each probe is one bounded-time round trip with no internal retries;
//! retry policy belongs entirely to the poll loop. Probes never leave
//! partially-applied state behind: they either return a value or an
//! error classification.

use std::time::Duration;

use hirewatch_types::{JobId, StatusSnapshot};

use crate::config::MonitorConfig;
use crate::error::ProbeError;

/// Queries the job-status endpoint for one job.
#[derive(Debug, Clone)]
pub struct StatusProbe {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl StatusProbe {
    pub fn new(client: reqwest::Client, config: &MonitorConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            timeout: config.status_timeout,
        }
    }

    /// Fetch the current status snapshot for `job_id`.
    pub async fn fetch(&self, job_id: JobId) -> Result<StatusSnapshot, ProbeError> {
        let url = format!("{}/job-status/{job_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ProbeError::from_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProbeError::NotFound);
        }
        if !status.is_success() {
            return Err(ProbeError::ServerError(error_detail(response).await));
        }

        // A 2xx with an undecodable body reads as a server fault, not a
        // fatal condition. Proxies serving error pages with 200 exist.
        response
            .json::<StatusSnapshot>()
            .await
            .map_err(|e| ProbeError::ServerError(format!("malformed status payload: {e}")))
    }
}

/// Liveness check against the backend root endpoint.
///
/// Returns a bare bool: `true` only on a 2xx response within the short
/// timeout, `false` on anything else. Idempotent and side-effect-free;
/// used as a tie-breaker when status probes fail, and by the liveness
/// monitor as a periodic sampler.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(client: reqwest::Client, config: &MonitorConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            timeout: config.health_timeout,
        }
    }

    pub async fn check(&self) -> bool {
        let url = format!("{}/", self.base_url);
        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "health probe failed");
                false
            }
        }
    }
}

/// Pull the `detail` field out of an error body, falling back to the
/// status code. The backend wraps all error responses in `{"detail": …}`.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<serde_json::Value>().await {
        Ok(body) => body
            .get("detail")
            .and_then(|d| d.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {status}")),
        Err(_) => format!("HTTP {status}"),
    }
}
