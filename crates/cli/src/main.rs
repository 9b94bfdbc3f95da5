// crates/cli/src/main.rs
//! hirewatch binary.
//!
//! Submits a batch resume-analysis job, then rides the monitor's event
//! stream: progress on an indicatif bar, availability warnings inline,
//! and a ranked candidate table once the job completes.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use hirewatch_client::{
    Availability, JobMonitor, MonitorConfig, MonitorEvent, SessionOutcome, SubmitClient,
};
use hirewatch_types::{Candidate, Classification, StatusSnapshot};

#[derive(Parser)]
#[command(name = "hirewatch", version, about = "Submit and monitor resume-analysis jobs")]
struct Cli {
    /// Backend base URL.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server: String,

    /// File containing the job requirement text.
    #[arg(long, value_name = "FILE", conflicts_with = "jd_text")]
    jd: Option<PathBuf>,

    /// Requirement text given inline instead of a file.
    #[arg(long, value_name = "TEXT")]
    jd_text: Option<String>,

    /// Resume files to analyze (.pdf, .doc, .docx), at most 20.
    #[arg(required = true, value_name = "RESUME")]
    resumes: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Quiet by default; the progress UX owns the terminal. RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let cli = Cli::parse();

    let requirement = match (&cli.jd, &cli.jd_text) {
        (Some(path), None) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read requirement file {}", path.display()))?,
        (None, Some(text)) => text.clone(),
        _ => bail!("provide the requirement via --jd <FILE> or --jd-text <TEXT>"),
    };

    eprintln!("\n\u{1f50d} hirewatch v{}\n", env!("CARGO_PKG_VERSION"));

    let config = MonitorConfig::new(cli.server.clone());
    let submitter = SubmitClient::new(&config);
    let receipt = submitter
        .submit(&requirement, &cli.resumes)
        .await
        .context("job submission failed")?;
    tracing::debug!(job_id = receipt.job_id, server = %cli.server, "job accepted");
    eprintln!(
        "Submitted job {} ({} file{})",
        receipt.job_id,
        receipt.total_files,
        if receipt.total_files == 1 { "" } else { "s" }
    );

    let monitor = JobMonitor::new(config);
    let mut events = monitor.subscribe();
    monitor.start_session(receipt.job_id);

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .expect("static progress template")
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message("analyzing resumes...");

    let mut last_snapshot: Option<StatusSnapshot> = None;
    let outcome = loop {
        match events.recv().await {
            Ok(MonitorEvent::Progress {
                percent, snapshot, ..
            }) => {
                bar.set_position(percent.round() as u64);
                last_snapshot = Some(snapshot);
            }
            Ok(MonitorEvent::Availability { state }) => match state {
                Availability::Unavailable => {
                    bar.println("\u{26a0} backend unreachable, expect degraded (fallback) results")
                }
                Availability::Available => bar.set_message("analyzing resumes..."),
                Availability::Checking => {}
            },
            Ok(MonitorEvent::Terminal { outcome, .. }) => break outcome,
            // Skipped events only drop intermediate snapshots; the next
            // one fully replaces them anyway.
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                bail!("monitor event stream closed unexpectedly")
            }
        }
    };

    match outcome {
        SessionOutcome::Completed => {
            bar.finish_with_message("analysis complete");
            if let Some(snapshot) = last_snapshot {
                render_results(&snapshot);
            }
            Ok(())
        }
        other => {
            bar.abandon_with_message(other.message());
            bail!("{}", other.message())
        }
    }
}

fn tier_tag(classification: Classification) -> &'static str {
    match classification {
        Classification::Excellent => "[EXCELLENT]",
        Classification::Strong => "[STRONG]   ",
        Classification::Partial => "[PARTIAL]  ",
        Classification::Weak => "[WEAK]     ",
    }
}

fn render_results(snapshot: &StatusSnapshot) {
    if snapshot.candidates.is_empty() {
        println!("\nNo candidates returned.");
        return;
    }

    // The server already orders by score, but don't depend on it.
    let mut ranked: Vec<&Candidate> = snapshot.candidates.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    println!("\nCandidates ({}):", ranked.len());
    for (rank, candidate) in ranked.iter().enumerate() {
        println!(
            "{:>3}. {} {:>5.1}%  {}",
            rank + 1,
            tier_tag(candidate.classification),
            candidate.score,
            candidate.name
        );
        if !candidate.summary.is_empty() {
            println!("     {}", candidate.summary);
        }
        if !candidate.matched_keywords.is_empty() {
            let shown: Vec<&str> = candidate
                .matched_keywords
                .iter()
                .take(8)
                .map(String::as_str)
                .collect();
            let extra = candidate.matched_keywords.len().saturating_sub(shown.len());
            if extra > 0 {
                println!("     matched: {} (+{extra} more)", shown.join(", "));
            } else {
                println!("     matched: {}", shown.join(", "));
            }
        }
        if let Some(ratio) = candidate.match_ratio {
            println!("     requirement coverage: {:.0}%", ratio * 100.0);
        }
    }
}
