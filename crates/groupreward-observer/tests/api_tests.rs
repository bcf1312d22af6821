//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The scheduler behind the state is fed by an
//! in-process directory source.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use groupreward_core::{
    DirectorySource, FetchError, MembershipCache, RefreshScheduler, RefreshState, RefreshTimings,
};
use groupreward_observer::router::build_router;
use groupreward_observer::state::AppState;
use groupreward_types::GroupId;
use serde_json::Value;
use tower::ServiceExt;

const MEMBER: &str = "76561198000000001";
const OTHER_MEMBER: &str = "76561198000000002";
const OUTSIDER: &str = "76561198000000777";

const TIMINGS: RefreshTimings = RefreshTimings {
    initial_delay: Duration::from_secs(1),
    interval: Duration::from_secs(300),
};

/// Always serves the same member list.
struct StaticSource;

impl DirectorySource for StaticSource {
    fn fetch(&self) -> impl Future<Output = Result<String, FetchError>> + Send {
        let body = format!(
            "<memberList><members><steamID64>{MEMBER}</steamID64>\
             <steamID64>{OTHER_MEMBER}</steamID64></members></memberList>"
        );
        async move { Ok(body) }
    }
}

/// Never answers.
struct HangingSource;

impl DirectorySource for HangingSource {
    fn fetch(&self) -> impl Future<Output = Result<String, FetchError>> + Send {
        std::future::pending()
    }
}

fn group() -> GroupId {
    GroupId::new(1).unwrap()
}

/// State over a cache that already holds one published generation.
async fn make_test_state() -> (Arc<AppState>, RefreshScheduler<StaticSource>) {
    let (scheduler, handle) = RefreshScheduler::new(StaticSource, MembershipCache::new(), TIMINGS);
    let report = scheduler.run_cycle().await;
    assert!(report.outcome.is_success());
    (Arc::new(AppState::new(group(), handle)), scheduler)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Body) {
    let response = build_router(Arc::clone(state))
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    (response.status(), response.into_body())
}

async fn post_refresh(state: &Arc<AppState>) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(
            Request::post("/api/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let (state, _scheduler) = make_test_state().await;
    let response = build_router(state)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Group Reward Observer"));
    assert!(html.contains("/api/status"));
    assert!(html.contains("<tr><th>Generation</th><td>1</td></tr>"));
    assert!(html.contains("<tr><th>Members</th><td>2</td></tr>"));
    assert!(html.contains("<tr><th>Cycles ok / failed</th><td>1 / 0</td></tr>"));
}

#[tokio::test]
async fn test_status_reports_generation_and_counters() {
    let (state, _scheduler) = make_test_state().await;
    let (status, body) = get(&state, "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(json["group_id"], 1);
    assert_eq!(json["remote_group_id"], "103582791429521409");
    assert_eq!(json["generation"], 1);
    assert_eq!(json["member_count"], 2);
    assert_eq!(json["refresh"]["state"], "idle");
    assert_eq!(json["refresh"]["successful_cycles"], 1);
    assert_eq!(json["refresh"]["failed_cycles"], 0);
    assert_eq!(json["refresh"]["last_report"]["outcome"]["result"], "replaced");
}

#[tokio::test]
async fn test_member_query() {
    let (state, _scheduler) = make_test_state().await;

    let (status, body) = get(&state, &format!("/api/members/{MEMBER}")).await;
    assert_eq!(status, StatusCode::OK);
    let json = body_to_json(body).await;
    assert_eq!(json["steam_id"], MEMBER);
    assert_eq!(json["member"], true);
    assert_eq!(json["generation"], 1);

    let (status, body) = get(&state, &format!("/api/members/{OUTSIDER}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body_to_json(body).await["member"], false);
}

#[tokio::test]
async fn test_member_query_rejects_invalid_ids() {
    let (state, _scheduler) = make_test_state().await;

    for bad in ["not-a-number", "0", "99999999999999999999"] {
        let (status, body) = get(&state, &format!("/api/members/{bad}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "id {bad}");
        let json = body_to_json(body).await;
        assert_eq!(json["status"], 400);
        assert!(json["error"].as_str().unwrap().contains("invalid steam id"));
    }
}

#[tokio::test]
async fn test_refresh_trigger_accepted_then_coalesced() {
    let (state, _scheduler) = make_test_state().await;

    let (status, json) = post_refresh(&state).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["trigger"], "scheduled");

    let (status, json) = post_refresh(&state).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["trigger"], "coalesced");
}

#[tokio::test]
async fn test_refresh_trigger_after_scheduler_stopped() {
    let (state, scheduler) = make_test_state().await;
    drop(scheduler);

    let (status, json) = post_refresh(&state).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], 503);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_trigger_conflicts_with_cycle_in_flight() {
    let (scheduler, handle) = RefreshScheduler::new(HangingSource, MembershipCache::new(), TIMINGS);
    let state = Arc::new(AppState::new(group(), handle.clone()));
    let task = scheduler.spawn();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(handle.state(), RefreshState::Fetching);

    let (status, json) = post_refresh(&state).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);

    let (status, body) = get(&state, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    let json = body_to_json(body).await;
    assert_eq!(json["generation"], 0);
    assert_eq!(json["refresh"]["state"], "fetching");

    handle.shutdown();
    task.await.unwrap();
    assert_eq!(handle.state(), RefreshState::Idle);
}
