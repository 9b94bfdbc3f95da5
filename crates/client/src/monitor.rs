//! Poll-loop supervisor and liveness monitor.
//!
//! `JobMonitor` owns at most one active polling session at a time plus a
//! standalone liveness sampler. Subscribers receive progress snapshots,
//! terminal outcomes, and availability transitions over a broadcast
//! channel; the current availability value is always readable directly.
//!
//! Cancellation is two-layered. A oneshot wakes the poll task so it
//! stops scheduling work, and a session epoch guards every publication:
//! `start_session`/`cancel_session` bump the epoch before signalling, so
//! a probe that resolves after its session was torn down publishes
//! nothing, even if the task had already left its select.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{broadcast, oneshot};
use tokio::time::{self, MissedTickBehavior};

use hirewatch_types::{JobId, StatusSnapshot};

use crate::config::MonitorConfig;
use crate::probe::{HealthProbe, StatusProbe};
use crate::session::{SessionOutcome, SessionState, Step};

/// Backend reachability, owned by the liveness monitor.
///
/// Independent of any job: `Unavailable` warns the caller to expect
/// degraded (fallback) results, it does not stop an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// No liveness tick has resolved yet.
    Checking,
    Available,
    Unavailable,
}

impl Availability {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Available,
            2 => Self::Unavailable,
            _ => Self::Checking,
        }
    }
}

/// Events published to subscribers.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A fresh status snapshot. The candidate sequence fully replaces
    /// anything received earlier.
    Progress {
        job_id: JobId,
        percent: f64,
        snapshot: StatusSnapshot,
    },
    /// The session reached a terminal state; no further events follow
    /// for this job.
    Terminal {
        job_id: JobId,
        outcome: SessionOutcome,
    },
    /// The liveness monitor observed an availability transition.
    Availability { state: Availability },
}

struct ActiveSession {
    job_id: JobId,
    cancel_tx: oneshot::Sender<()>,
}

struct MonitorInner {
    config: MonitorConfig,
    status_probe: StatusProbe,
    health_probe: HealthProbe,
    events_tx: broadcast::Sender<MonitorEvent>,
    availability: AtomicU8,
    /// Bumped on every session start or cancel; publications carry the
    /// epoch they were spawned under and are dropped on mismatch.
    epoch: AtomicU64,
    active: Mutex<Option<ActiveSession>>,
}

impl MonitorInner {
    fn epoch_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::Acquire) == epoch
    }

    fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Take the active session out, if any. Taking (rather than
    /// reading) is what makes supersession cancel exactly once.
    fn take_active(&self) -> Option<ActiveSession> {
        match self.active.lock() {
            Ok(mut guard) => guard.take(),
            Err(e) => {
                tracing::error!("active-session mutex poisoned: {e}");
                None
            }
        }
    }

    fn store_active(&self, session: ActiveSession) {
        match self.active.lock() {
            Ok(mut guard) => *guard = Some(session),
            Err(e) => tracing::error!("active-session mutex poisoned: {e}"),
        }
    }

    fn publish_progress(&self, epoch: u64, job_id: JobId, snapshot: StatusSnapshot) {
        if !self.epoch_current(epoch) {
            tracing::debug!(job_id, "discarding snapshot for superseded session");
            return;
        }
        let percent = snapshot.progress_percent();
        // Ignore send errors (no subscribers is fine).
        let _ = self.events_tx.send(MonitorEvent::Progress {
            job_id,
            percent,
            snapshot,
        });
    }

    fn publish_terminal(
        &self,
        epoch: u64,
        job_id: JobId,
        outcome: SessionOutcome,
        started_at: Instant,
    ) {
        if !self.epoch_current(epoch) {
            tracing::debug!(job_id, "discarding terminal outcome for superseded session");
            return;
        }
        tracing::info!(
            job_id,
            outcome = %outcome,
            elapsed_secs = started_at.elapsed().as_secs_f64(),
            "polling session finished"
        );
        let _ = self.events_tx.send(MonitorEvent::Terminal { job_id, outcome });
    }

    fn set_availability(&self, next: Availability) {
        let prev = self.availability.swap(next as u8, Ordering::AcqRel);
        if prev != next as u8 {
            tracing::info!(?next, "backend availability changed");
            let _ = self.events_tx.send(MonitorEvent::Availability { state: next });
        }
    }
}

/// Client-side monitor for one backend.
///
/// Construct inside a tokio runtime: the liveness sampler is spawned
/// immediately and runs until the monitor is dropped. Not `Clone`: the
/// monitor is the owner of its sessions, and dropping it releases every
/// scheduled task.
pub struct JobMonitor {
    inner: Arc<MonitorInner>,
    liveness_cancel: Option<oneshot::Sender<()>>,
}

impl JobMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let client = reqwest::Client::new();
        let status_probe = StatusProbe::new(client.clone(), &config);
        let health_probe = HealthProbe::new(client, &config);
        let (events_tx, _) = broadcast::channel(256);

        let inner = Arc::new(MonitorInner {
            config,
            status_probe,
            health_probe,
            events_tx,
            availability: AtomicU8::new(Availability::Checking as u8),
            epoch: AtomicU64::new(0),
            active: Mutex::new(None),
        });

        let (liveness_tx, liveness_rx) = oneshot::channel();
        tokio::spawn(run_liveness(Arc::clone(&inner), liveness_rx));

        Self {
            inner,
            liveness_cancel: Some(liveness_tx),
        }
    }

    /// Subscribe to progress, terminal, and availability events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Current backend availability as last sampled.
    pub fn availability(&self) -> Availability {
        Availability::from_u8(self.inner.availability.load(Ordering::Acquire))
    }

    /// Begin polling `job_id`, superseding any active session.
    ///
    /// The old session's schedule is cancelled (exactly once) and its
    /// pending publications are invalidated before the new session
    /// starts polling.
    pub fn start_session(&self, job_id: JobId) {
        let epoch = self.inner.bump_epoch();
        if let Some(prev) = self.inner.take_active() {
            tracing::debug!(
                old_job_id = prev.job_id,
                new_job_id = job_id,
                "superseding active session"
            );
            let _ = prev.cancel_tx.send(());
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let state = SessionState::new(job_id, self.inner.config.clone(), Instant::now());
        tokio::spawn(poll_session(
            Arc::clone(&self.inner),
            state,
            epoch,
            cancel_rx,
        ));
        self.inner.store_active(ActiveSession { job_id, cancel_tx });
        tracing::info!(job_id, "polling session started");
    }

    /// Stop the active session, if any. Synchronous: by the time this
    /// returns, no further events for that session will be published,
    /// even from a probe already in flight.
    pub fn cancel_session(&self) {
        self.inner.bump_epoch();
        if let Some(prev) = self.inner.take_active() {
            tracing::debug!(job_id = prev.job_id, "session cancelled");
            let _ = prev.cancel_tx.send(());
        }
    }
}

impl Drop for JobMonitor {
    fn drop(&mut self) {
        self.cancel_session();
        if let Some(tx) = self.liveness_cancel.take() {
            let _ = tx.send(());
        }
    }
}

/// One polling session: tick, probe, transition, repeat.
///
/// The loop serializes tick → probe → state transition, so at most one
/// probe is ever in flight; ticks that fire mid-probe are skipped, not
/// queued. Every exit path runs through a terminal transition or a
/// cancellation, and the ticker dies with the task; no scheduled work
/// outlives the session.
async fn poll_session(
    inner: Arc<MonitorInner>,
    mut state: SessionState,
    epoch: u64,
    mut cancel: oneshot::Receiver<()>,
) {
    let job_id = state.job_id;
    let mut ticker = time::interval(state.current_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut cancel => {
                tracing::debug!(job_id, "polling session cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        let armed_interval = state.current_interval;
        let outcome = tokio::select! {
            biased;
            _ = &mut cancel => {
                tracing::debug!(job_id, "cancelled with probe in flight, discarding result");
                return;
            }
            result = inner.status_probe.fetch(job_id) => result,
        };

        match state.apply(outcome, Instant::now()) {
            Step::Publish(snapshot) => {
                inner.publish_progress(epoch, job_id, snapshot);
            }
            Step::Complete(snapshot) => {
                inner.publish_progress(epoch, job_id, snapshot);
                inner.publish_terminal(epoch, job_id, SessionOutcome::Completed, state.started_at);
                return;
            }
            Step::Terminate(outcome) => {
                inner.publish_terminal(epoch, job_id, outcome, state.started_at);
                return;
            }
            Step::CheckBackend => {
                let healthy = tokio::select! {
                    biased;
                    _ = &mut cancel => return,
                    up = inner.health_probe.check() => up,
                };
                if !healthy {
                    let outcome = state.abort_backend_down();
                    inner.publish_terminal(epoch, job_id, outcome, state.started_at);
                    return;
                }
                // Backend answers its health endpoint: the job status
                // route is struggling, not the process. Keep polling
                // under backoff.
            }
            Step::Retry => {}
        }

        // Re-arm at the new cadence when backoff (or a success reset)
        // moved the interval, replacing the schedule rather than
        // stacking another.
        if state.current_interval != armed_interval {
            ticker = time::interval_at(
                time::Instant::now() + state.current_interval,
                state.current_interval,
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }
    }
}

/// Standalone availability sampler.
///
/// Runs from construction until the monitor drops, one health probe per
/// tick, first tick immediate. A plain periodic sampler: no backoff, no
/// escalation, no termination of its own.
async fn run_liveness(inner: Arc<MonitorInner>, mut shutdown: oneshot::Receiver<()>) {
    let mut ticker = time::interval(inner.config.liveness_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => return,
            _ = ticker.tick() => {}
        }
        let up = tokio::select! {
            biased;
            _ = &mut shutdown => return,
            up = inner.health_probe.check() => up,
        };
        inner.set_availability(if up {
            Availability::Available
        } else {
            Availability::Unavailable
        });
    }
}
