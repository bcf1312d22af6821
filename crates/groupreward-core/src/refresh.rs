//! Background refresh of the membership cache.
//!
//! The [`RefreshScheduler`] owns the cache writer and runs one
//! fetch → parse → swap cycle at a time:
//!
//! ```text
//! Idle --> Fetching --> Parsing --> Swapping --> Idle
//! ```
//!
//! Cycles run `initial_delay` after start (and after every lifecycle
//! trigger such as a map load), then every `interval`. A trigger that
//! arrives while a cycle is in flight is ignored; triggers that arrive while
//! idle coalesce into one rescheduling.
//!
//! A failed cycle never touches the cache. Stale membership is preferred to
//! no membership, so fetch and parse failures are logged and the previous
//! generation stays authoritative.
//!
//! Shutdown abandons an in-flight cycle by dropping its future; the swap
//! is the last step of a cycle, so nothing partial can leak.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{MembershipCache, MembershipReader};
use crate::config::SyncConfig;
use crate::fetch::{DirectorySource, FetchError};
use crate::parse::{ParseError, parse_member_list};

/// Why a refresh cycle failed.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The member list could not be retrieved.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The member list document could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Stage of the refresh state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RefreshState {
    /// No cycle in flight.
    Idle = 0,
    /// Waiting on the remote directory.
    Fetching = 1,
    /// Parsing the retrieved document.
    Parsing = 2,
    /// Publishing the new generation.
    Swapping = 3,
}

impl RefreshState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Fetching,
            2 => Self::Parsing,
            3 => Self::Swapping,
            _ => Self::Idle,
        }
    }
}

/// How a single refresh cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// A new generation was published.
    Replaced {
        /// Number of the published generation.
        generation: u64,
        /// Members in the published generation.
        members: usize,
        /// Entries skipped as invalid.
        skipped: usize,
    },
    /// The fetch failed; the previous generation was kept.
    FetchFailed {
        /// Description of the failure.
        reason: String,
    },
    /// The document was malformed; the previous generation was kept.
    ParseFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl CycleOutcome {
    /// Whether the cycle published a new generation.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }
}

/// Record of one completed refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// How the cycle ended.
    pub outcome: CycleOutcome,
    /// When the cycle finished.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration of the cycle in milliseconds.
    pub duration_ms: u64,
}

/// Result of asking the scheduler for an out-of-band refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// A refresh was scheduled after the initial delay.
    Scheduled,
    /// A trigger was already pending; this one was merged into it.
    Coalesced,
    /// A cycle is in flight; the trigger was ignored.
    InFlight,
    /// The scheduler has stopped.
    Stopped,
}

/// Cadence of scheduled refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTimings {
    /// Delay between start or a lifecycle trigger and the next cycle.
    pub initial_delay: Duration,
    /// Interval between subsequent cycles.
    pub interval: Duration,
}

impl From<&SyncConfig> for RefreshTimings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            interval: config.refresh_interval(),
        }
    }
}

/// Observable scheduler state shared with [`RefreshHandle`]s.
#[derive(Debug)]
struct RefreshStatus {
    state: AtomicU8,
    successes: AtomicU64,
    failures: AtomicU64,
    last_report: Mutex<Option<CycleReport>>,
}

impl RefreshStatus {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(RefreshState::Idle as u8),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            last_report: Mutex::new(None),
        }
    }

    fn state(&self) -> RefreshState {
        RefreshState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: RefreshState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Point-in-time view of the scheduler for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Current stage of the state machine.
    pub state: RefreshState,
    /// Cycles that published a generation.
    pub successful_cycles: u64,
    /// Cycles that kept the previous generation.
    pub failed_cycles: u64,
    /// The most recent completed cycle, if any.
    pub last_report: Option<CycleReport>,
}

/// Control handle for a running [`RefreshScheduler`].
///
/// Cheap to clone. When every handle is dropped the scheduler stops.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    status: Arc<RefreshStatus>,
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    reader: MembershipReader,
}

impl RefreshHandle {
    /// Request a refresh after the initial delay, e.g. on map start.
    pub fn trigger(&self) -> TriggerOutcome {
        if self.status.state() != RefreshState::Idle {
            debug!(state = ?self.status.state(), "refresh trigger ignored, cycle in flight");
            return TriggerOutcome::InFlight;
        }
        match self.trigger_tx.try_send(()) {
            Ok(()) => TriggerOutcome::Scheduled,
            Err(mpsc::error::TrySendError::Full(())) => TriggerOutcome::Coalesced,
            Err(mpsc::error::TrySendError::Closed(())) => TriggerOutcome::Stopped,
        }
    }

    /// Stop the scheduler, abandoning any in-flight cycle.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Current stage of the state machine.
    pub fn state(&self) -> RefreshState {
        self.status.state()
    }

    /// Read handle onto the cache this scheduler maintains.
    pub fn reader(&self) -> MembershipReader {
        self.reader.clone()
    }

    /// Snapshot of counters and the last cycle report.
    pub async fn summary(&self) -> RefreshSummary {
        RefreshSummary {
            state: self.status.state(),
            successful_cycles: self.status.successes.load(Ordering::Relaxed),
            failed_cycles: self.status.failures.load(Ordering::Relaxed),
            last_report: self.status.last_report.lock().await.clone(),
        }
    }
}

/// Runs refresh cycles; the only owner of the cache writer.
struct RefreshWorker<S> {
    source: S,
    cache: MembershipCache,
    status: Arc<RefreshStatus>,
}

impl<S: DirectorySource> RefreshWorker<S> {
    /// Run one cycle and record its report.
    ///
    /// Leaves the state at the stage the cycle stopped in; the caller
    /// returns it to `Idle` once it is ready to accept triggers again.
    async fn cycle(&self) -> CycleReport {
        let started = Instant::now();
        let result = self.refresh().await;

        let outcome = match result {
            Ok(outcome) => {
                self.status.successes.fetch_add(1, Ordering::Relaxed);
                outcome
            }
            Err(e) => {
                self.status.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    kept_generation = self.cache.snapshot().number(),
                    "member list refresh failed, keeping previous generation"
                );
                match e {
                    RefreshError::Fetch(e) => CycleOutcome::FetchFailed {
                        reason: e.to_string(),
                    },
                    RefreshError::Parse(e) => CycleOutcome::ParseFailed {
                        reason: e.to_string(),
                    },
                }
            }
        };

        let report = CycleReport {
            outcome,
            finished_at: Utc::now(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        *self.status.last_report.lock().await = Some(report.clone());
        report
    }

    async fn refresh(&self) -> Result<CycleOutcome, RefreshError> {
        self.status.set_state(RefreshState::Fetching);
        let raw = self.source.fetch().await?;

        self.status.set_state(RefreshState::Parsing);
        let parsed = parse_member_list(&raw)?;
        drop(raw);

        if parsed.has_more_pages {
            warn!(
                parsed = parsed.members.len(),
                reported = parsed.reported_count,
                "member list spans several pages, only the first page is used"
            );
        }

        self.status.set_state(RefreshState::Swapping);
        let members = parsed.members.len();
        let skipped = parsed.skipped;
        let generation = self.cache.replace(parsed.members);

        info!(generation, members, skipped, "membership cache refreshed");
        Ok(CycleOutcome::Replaced {
            generation,
            members,
            skipped,
        })
    }
}

/// Timer-driven owner of the membership cache writer.
pub struct RefreshScheduler<S> {
    worker: RefreshWorker<S>,
    timings: RefreshTimings,
    trigger_rx: mpsc::Receiver<()>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S> RefreshScheduler<S>
where
    S: DirectorySource + 'static,
{
    /// Create a scheduler that feeds `cache` from `source`.
    ///
    /// Takes ownership of the cache writer; use the returned handle's
    /// [`reader`](RefreshHandle::reader) for queries.
    pub fn new(source: S, cache: MembershipCache, timings: RefreshTimings) -> (Self, RefreshHandle) {
        let status = Arc::new(RefreshStatus::new());
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = RefreshHandle {
            status: Arc::clone(&status),
            trigger_tx,
            shutdown_tx: Arc::new(shutdown_tx),
            reader: cache.reader(),
        };
        let scheduler = Self {
            worker: RefreshWorker {
                source,
                cache,
                status,
            },
            timings,
            trigger_rx,
            shutdown_rx,
        };
        (scheduler, handle)
    }

    /// Run a single cycle immediately, outside the timer.
    pub async fn run_cycle(&self) -> CycleReport {
        let report = self.worker.cycle().await;
        self.worker.status.set_state(RefreshState::Idle);
        report
    }

    /// Spawn the scheduler loop onto the tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the scheduler loop until shutdown.
    pub async fn run(mut self) {
        let mut next_run = Instant::now() + self.timings.initial_delay;
        info!(
            initial_delay_ms = self.timings.initial_delay.as_millis(),
            interval_secs = self.timings.interval.as_secs(),
            "refresh scheduler started"
        );

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => break,
                Some(()) = self.trigger_rx.recv() => {
                    next_run = Instant::now() + self.timings.initial_delay;
                    debug!("lifecycle trigger, refresh rescheduled");
                    continue;
                }
                () = tokio::time::sleep_until(next_run) => {}
            }

            tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => {
                    warn!(state = ?self.worker.status.state(), "shutdown during refresh, abandoning cycle");
                    self.worker.status.set_state(RefreshState::Idle);
                    break;
                }
                _report = self.worker.cycle() => {}
            }

            // Triggers that raced with the finished cycle are superseded by
            // it. The state stays non-idle until the drain is done, so new
            // triggers are answered `InFlight` rather than dropped here.
            let mut superseded = 0_usize;
            while self.trigger_rx.try_recv().is_ok() {
                superseded = superseded.saturating_add(1);
            }
            if superseded > 0 {
                debug!(superseded, "triggers superseded by the finished cycle");
            }
            self.worker.status.set_state(RefreshState::Idle);
            next_run = Instant::now() + self.timings.interval;
        }

        info!("refresh scheduler stopped");
    }
}
