// crates/types/src/lib.rs
//! Wire contract for the analysis backend.
//!
//! Everything here mirrors the JSON shapes served by the job-status and
//! submission endpoints. Pure data: no I/O, no clocks.

use serde::{Deserialize, Serialize};

/// Unique identifier for a server-side analysis job.
///
/// Assigned by the server at submission; opaque to the monitor beyond
/// being embeddable in a URL path.
pub type JobId = u64;

/// Server-reported lifecycle phase of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is still being processed. Older backends report `processing`.
    #[serde(alias = "processing")]
    Running,
    Completed,
    /// Some items failed but the job ran to the end. Candidate records
    /// for the failed items may be missing or carry placeholder scores.
    CompletedWithErrors,
    Failed,
}

/// Quality tier assigned to a candidate by the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Excellent,
    Strong,
    Partial,
    Weak,
}

/// Deserialize a tier label, mapping anything off-taxonomy to `Partial`,
/// the server's own default when the model emits a label it doesn't
/// recognize.
fn classification_or_partial<'de, D>(deserializer: D) -> Result<Classification, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let label = String::deserialize(deserializer)?;
    Ok(match label.as_str() {
        "Excellent" => Classification::Excellent,
        "Strong" => Classification::Strong,
        "Weak" => Classification::Weak,
        _ => Classification::Partial,
    })
}

/// One evaluated candidate.
///
/// Candidates have no identity beyond their position in the snapshot:
/// each snapshot fully replaces the previous sequence, and entries may
/// be revised between snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    /// Match score in 0–100.
    pub score: f64,
    #[serde(deserialize_with = "classification_or_partial")]
    pub classification: Classification,
    #[serde(default)]
    pub summary: String,
    /// Requirement terms found in the resume. Absent on older backends.
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    /// Terms extracted from the requirement text.
    #[serde(default)]
    pub jd_keywords: Vec<String>,
    /// Fraction of required terms matched, in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_ratio: Option<f64>,
}

/// Result of one successful status probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub total: u64,
    pub processed: u64,
    pub status: JobStatus,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl StatusSnapshot {
    /// Progress percentage in `[0, 100]`.
    ///
    /// A zero total yields 0 (nothing to divide by), and a server that
    /// reports `processed > total` is clamped rather than trusted.
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        ((self.processed as f64 / self.total as f64) * 100.0).clamp(0.0, 100.0)
    }

    /// True once the server will not report further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Response to a successful job submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub job_id: JobId,
    /// Number of attachments the server accepted for processing.
    pub total_files: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
