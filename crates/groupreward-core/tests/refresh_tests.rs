//! Integration tests for refresh cycles and the scheduler loop.
//!
//! Cycles are driven by scripted directory sources so no network is
//! involved. Scheduler timing tests run on tokio's paused clock.

#![allow(clippy::unwrap_used)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use groupreward_core::{
    CycleOutcome, DirectorySource, FetchError, MembershipCache, RefreshScheduler, RefreshState,
    RefreshTimings, TriggerOutcome,
};
use groupreward_types::SteamId64;
use tokio::sync::Notify;

const MEMBER: u64 = 76_561_198_000_000_001;
const OTHER: u64 = 76_561_198_000_000_002;

fn sid(value: u64) -> SteamId64 {
    SteamId64::new(value).unwrap()
}

fn document(ids: &[u64]) -> String {
    let entries: String = ids
        .iter()
        .map(|id| format!("<steamID64>{id}</steamID64>"))
        .collect();
    format!("<memberList><members>{entries}</members></memberList>")
}

fn network_error() -> FetchError {
    FetchError::Status {
        url: "http://directory.test/".to_owned(),
        status: 503,
    }
}

/// Replays a fixed list of responses, then fails every further fetch.
struct ScriptedSource {
    responses: Mutex<VecDeque<Result<String, FetchError>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<String, FetchError>>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            responses: Mutex::new(responses.into()),
            calls: Arc::clone(&calls),
        };
        (source, calls)
    }
}

impl DirectorySource for ScriptedSource {
    fn fetch(&self) -> impl Future<Output = Result<String, FetchError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(network_error()));
        async move { next }
    }
}

/// Blocks every fetch until released.
struct GatedSource {
    release: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl DirectorySource for GatedSource {
    fn fetch(&self) -> impl Future<Output = Result<String, FetchError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let release = Arc::clone(&self.release);
        async move {
            release.notified().await;
            Ok(document(&[MEMBER]))
        }
    }
}

/// Never answers.
struct HangingSource;

impl DirectorySource for HangingSource {
    fn fetch(&self) -> impl Future<Output = Result<String, FetchError>> + Send {
        std::future::pending()
    }
}

const TIMINGS: RefreshTimings = RefreshTimings {
    initial_delay: Duration::from_secs(1),
    interval: Duration::from_secs(60),
};

// ---------------------------------------------------------------------------
// Single cycles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_cycle_replaces_generation() {
    let (source, _) = ScriptedSource::new(vec![Ok(
        "<members><steamID64>76561198000000001</steamID64><steamID64>bad</steamID64></members>"
            .to_owned(),
    )]);
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);
    let reader = handle.reader();

    let report = scheduler.run_cycle().await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Replaced {
            generation: 1,
            members: 1,
            skipped: 1,
        }
    );
    assert!(reader.query(&sid(MEMBER)));
    assert!(!reader.query(&sid(OTHER)));
    assert_eq!(handle.state(), RefreshState::Idle);

    let summary = handle.summary().await;
    assert_eq!(summary.successful_cycles, 1);
    assert_eq!(summary.failed_cycles, 0);
    assert_eq!(summary.last_report, Some(report));
}

#[tokio::test]
async fn network_failure_keeps_previous_generation() {
    let (source, _) = ScriptedSource::new(vec![Ok(document(&[MEMBER])), Err(network_error())]);
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);
    let reader = handle.reader();

    assert!(scheduler.run_cycle().await.outcome.is_success());
    let before = reader.snapshot();

    let report = scheduler.run_cycle().await;
    assert!(matches!(report.outcome, CycleOutcome::FetchFailed { .. }));

    let after = reader.snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(reader.query(&sid(MEMBER)));
    assert_eq!(handle.summary().await.failed_cycles, 1);
}

#[tokio::test]
async fn malformed_document_keeps_previous_generation() {
    let (source, _) = ScriptedSource::new(vec![
        Ok(document(&[MEMBER])),
        Ok("<members><steamID64>76561198000000002</steamID64>".to_owned()),
    ]);
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);
    let reader = handle.reader();

    scheduler.run_cycle().await;
    let report = scheduler.run_cycle().await;

    assert!(matches!(report.outcome, CycleOutcome::ParseFailed { .. }));
    assert_eq!(reader.generation(), 1);
    assert!(reader.query(&sid(MEMBER)));
    assert!(!reader.query(&sid(OTHER)));
}

#[tokio::test]
async fn empty_member_list_is_published() {
    let (source, _) = ScriptedSource::new(vec![Ok(document(&[MEMBER])), Ok(document(&[]))]);
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);
    let reader = handle.reader();

    scheduler.run_cycle().await;
    let report = scheduler.run_cycle().await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Replaced {
            generation: 2,
            members: 0,
            skipped: 0,
        }
    );
    assert!(!reader.query(&sid(MEMBER)));
}

#[tokio::test]
async fn first_failure_leaves_initial_empty_generation() {
    let (source, _) = ScriptedSource::new(vec![Err(network_error())]);
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);

    scheduler.run_cycle().await;

    let snapshot = handle.reader().snapshot();
    assert_eq!(snapshot.number(), 0);
    assert!(snapshot.is_empty());
}

// ---------------------------------------------------------------------------
// Scheduler loop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn first_cycle_waits_for_initial_delay_then_interval() {
    let (source, calls) = ScriptedSource::new(vec![
        Ok(document(&[MEMBER])),
        Ok(document(&[MEMBER, OTHER])),
    ]);
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);
    let reader = handle.reader();
    let task = scheduler.spawn();

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(reader.generation(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(reader.query(&sid(OTHER)));

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn trigger_reschedules_and_coalesces() {
    let (source, calls) = ScriptedSource::new(vec![Ok(document(&[MEMBER]))]);
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);
    let task = scheduler.spawn();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.trigger(), TriggerOutcome::Scheduled);
    assert_eq!(handle.trigger(), TriggerOutcome::Coalesced);

    // The first 1s deadline has been pushed back to 1.5s.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(handle.reader().generation(), 1);

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn trigger_during_cycle_is_ignored() {
    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let source = GatedSource {
        release: Arc::clone(&release),
        calls: Arc::clone(&calls),
    };
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);
    let task = scheduler.spawn();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(handle.state(), RefreshState::Fetching);
    assert_eq!(handle.trigger(), TriggerOutcome::InFlight);

    release.notify_one();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.state(), RefreshState::Idle);
    assert_eq!(handle.reader().generation(), 1);

    // No extra cycle one initial delay later; the next one is the interval.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn trigger_accepted_after_cycle_is_never_dropped() {
    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let source = GatedSource {
        release: Arc::clone(&release),
        calls: Arc::clone(&calls),
    };
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);
    let task = scheduler.spawn();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(handle.trigger(), TriggerOutcome::InFlight);
    release.notify_one();

    // Once the scheduler reports idle, the finished cycle's cleanup is over
    // and an accepted trigger must lead to another cycle.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.state(), RefreshState::Idle);
    assert_eq!(handle.trigger(), TriggerOutcome::Scheduled);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(handle.state(), RefreshState::Fetching);

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_abandons_in_flight_fetch() {
    let cache = MembershipCache::new();
    cache.replace(HashSet::from([sid(MEMBER)]));
    let (scheduler, handle) = RefreshScheduler::new(HangingSource, cache, TIMINGS);
    let reader = handle.reader();
    let task = scheduler.spawn();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(handle.state(), RefreshState::Fetching);

    handle.shutdown();
    task.await.unwrap();

    assert_eq!(handle.state(), RefreshState::Idle);
    assert_eq!(reader.generation(), 1);
    assert!(reader.query(&sid(MEMBER)));
    assert_eq!(handle.trigger(), TriggerOutcome::Stopped);
    assert!(handle.summary().await.last_report.is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_cycles_retry_on_interval() {
    let (source, calls) = ScriptedSource::new(vec![
        Err(network_error()),
        Ok(document(&[MEMBER])),
    ]);
    let (scheduler, handle) = RefreshScheduler::new(source, MembershipCache::new(), TIMINGS);
    let reader = handle.reader();
    let task = scheduler.spawn();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(reader.generation(), 0);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(reader.query(&sid(MEMBER)));

    let summary = handle.summary().await;
    assert_eq!(summary.failed_cycles, 1);
    assert_eq!(summary.successful_cycles, 1);

    handle.shutdown();
    task.await.unwrap();
}
