// crates/client/src/submit.rs
//! Job submission.
//!
//! One request/response operation, deliberately outside the poll loop:
//! submission errors indicate the request itself is at fault and are
//! surfaced immediately, never retried.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hirewatch_types::SubmitReceipt;

use crate::config::MonitorConfig;
use crate::error::SubmitError;

/// Server-side limit on attachments per job, enforced here too so an
/// oversized batch fails before any bytes move.
pub const MAX_ATTACHMENTS: usize = 20;

const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// Submits analysis jobs to the backend.
#[derive(Debug, Clone)]
pub struct SubmitClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SubmitClient {
    pub fn new(config: &MonitorConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &MonitorConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            // Uploads carry file payloads; the bound is far looser than
            // a status probe's.
            timeout: Duration::from_secs(60),
        }
    }

    /// Submit a job: requirement text plus 1–20 resume attachments.
    ///
    /// Validation mirrors the server's own rules and fails fast without
    /// a round trip. On success the returned receipt carries the job id
    /// to hand to [`crate::JobMonitor::start_session`].
    pub async fn submit(
        &self,
        requirement: &str,
        attachments: &[PathBuf],
    ) -> Result<SubmitReceipt, SubmitError> {
        validate(requirement, attachments)?;

        let mut form = reqwest::multipart::Form::new().text("jd", requirement.to_string());
        for path in attachments {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| SubmitError::attachment(path, e))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "resume".to_string());
            form = form.part(
                "files",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );
        }

        tracing::info!(
            files = attachments.len(),
            requirement_chars = requirement.len(),
            "submitting analysis job"
        );

        let response = self
            .client
            .post(format!("{}/start-job", self.base_url))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Timeout
                } else {
                    SubmitError::Unreachable
                }
            })?;

        let status = response.status();
        match status {
            s if s.is_success() => response
                .json::<SubmitReceipt>()
                .await
                .map_err(|e| SubmitError::ServerError(format!("malformed submit response: {e}"))),
            reqwest::StatusCode::BAD_REQUEST => {
                Err(SubmitError::InvalidInput(error_detail(response).await))
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(SubmitError::RateLimited),
            _ => Err(SubmitError::ServerError(error_detail(response).await)),
        }
    }
}

fn validate(requirement: &str, attachments: &[PathBuf]) -> Result<(), SubmitError> {
    if requirement.trim().is_empty() {
        return Err(SubmitError::InvalidInput(
            "requirement text cannot be empty".to_string(),
        ));
    }
    if attachments.is_empty() {
        return Err(SubmitError::InvalidInput(
            "at least one resume file is required".to_string(),
        ));
    }
    if attachments.len() > MAX_ATTACHMENTS {
        return Err(SubmitError::InvalidInput(format!(
            "at most {MAX_ATTACHMENTS} files per job, got {}",
            attachments.len()
        )));
    }
    for path in attachments {
        if !has_allowed_extension(path) {
            return Err(SubmitError::InvalidInput(format!(
                "unsupported file format: {} (allowed: .pdf, .doc, .docx)",
                path.display()
            )));
        }
    }
    Ok(())
}

fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

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

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_validate_empty_requirement() {
        let err = validate("   ", &paths(&["a.pdf"])).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_no_files() {
        let err = validate("rust engineer", &[]).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_too_many_files() {
        let many: Vec<PathBuf> = (0..21).map(|i| PathBuf::from(format!("{i}.pdf"))).collect();
        let err = validate("rust engineer", &many).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_extension_allowlist() {
        assert!(validate("jd", &paths(&["a.pdf", "b.DOCX", "c.doc"])).is_ok());
        let err = validate("jd", &paths(&["resume.txt"])).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidInput(_)));
        let err = validate("jd", &paths(&["noext"])).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_submit_success() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/start-job")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"job_id": 12, "message": "Processing started", "total_files": 1}"#)
            .create_async()
            .await;

        let dir = std::env::temp_dir();
        let resume = dir.join("hirewatch_submit_test.pdf");
        std::fs::write(&resume, b"%PDF-1.4 stub").unwrap();

        let client = SubmitClient::new(&MonitorConfig::new(server.url()));
        let receipt = client.submit("rust engineer", &[resume.clone()]).await.unwrap();
        assert_eq!(receipt.job_id, 12);
        assert_eq!(receipt.total_files, 1);

        let _ = std::fs::remove_file(resume);
    }

    #[tokio::test]
    async fn test_submit_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/start-job")
            .with_status(429)
            .create_async()
            .await;

        let dir = std::env::temp_dir();
        let resume = dir.join("hirewatch_ratelimit_test.pdf");
        std::fs::write(&resume, b"%PDF-1.4 stub").unwrap();

        let client = SubmitClient::new(&MonitorConfig::new(server.url()));
        let err = client.submit("jd", &[resume.clone()]).await.unwrap_err();
        assert!(matches!(err, SubmitError::RateLimited));

        let _ = std::fs::remove_file(resume);
    }

    #[tokio::test]
    async fn test_submit_bad_request_detail() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/start-job")
            .with_status(400)
            .with_body(r#"{"detail":"Job description cannot be empty"}"#)
            .create_async()
            .await;

        let dir = std::env::temp_dir();
        let resume = dir.join("hirewatch_badreq_test.pdf");
        std::fs::write(&resume, b"%PDF-1.4 stub").unwrap();

        // Client-side validation passes ("jd" is non-empty); the server
        // still rejects and its detail is surfaced.
        let client = SubmitClient::new(&MonitorConfig::new(server.url()));
        match client.submit("jd", &[resume.clone()]).await.unwrap_err() {
            SubmitError::InvalidInput(detail) => {
                assert_eq!(detail, "Job description cannot be empty")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }

        let _ = std::fs::remove_file(resume);
    }

    #[tokio::test]
    async fn test_submit_missing_attachment() {
        let client = SubmitClient::new(&MonitorConfig::default());
        let err = client
            .submit("jd", &paths(&["/nonexistent/resume.pdf"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Attachment { .. }));
    }
}
