//! REST API endpoint handlers for the Observer server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/status` | Current generation and refresh scheduler status |
//! | `GET` | `/api/members/{steam_id}` | Membership query for one account |
//! | `POST` | `/api/refresh` | Request a refresh cycle after the initial delay |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use chrono::{DateTime, Utc};
use groupreward_core::{RefreshSummary, TriggerOutcome};
use groupreward_types::SteamId64;
use serde::Serialize;
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Body of `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Configured short group id.
    pub group_id: u32,
    /// Canonical 64-bit group id used against the remote directory.
    pub remote_group_id: String,
    /// Number of the generation currently served.
    pub generation: u64,
    /// When the current generation was published.
    pub generation_created_at: DateTime<Utc>,
    /// Members in the current generation.
    pub member_count: usize,
    /// Refresh scheduler state and counters.
    pub refresh: RefreshSummary,
    /// When the service started.
    pub started_at: DateTime<Utc>,
}

/// Body of `GET /api/members/{steam_id}`.
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    /// The queried account.
    pub steam_id: SteamId64,
    /// Whether the account is in the current generation.
    pub member: bool,
    /// Generation the answer was read from.
    pub generation: u64,
}

/// Body of an accepted `POST /api/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// How the scheduler took the request.
    pub trigger: TriggerOutcome,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing sync status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let generation = state.members.snapshot();
    let summary = state.refresh.summary().await;
    let group = state.group;
    let number = generation.number();
    let members = generation.len();
    let published = generation.created_at().format("%Y-%m-%d %H:%M:%S UTC");
    let refresh_state = format!("{:?}", summary.state);
    let ok = summary.successful_cycles;
    let failed = summary.failed_cycles;
    let last = summary.last_report.as_ref().map_or_else(
        || String::from("none yet"),
        |report| {
            let result = if report.outcome.is_success() {
                "ok"
            } else {
                "failed"
            };
            format!("{result} at {}", report.finished_at.format("%H:%M:%S"))
        },
    );

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Group Reward Observer</title>
    <style>
        body {{ font: 15px/1.5 system-ui, sans-serif; margin: 2rem auto; max-width: 42rem; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ text-align: left; padding: 0.35rem 0.75rem; border-bottom: 1px solid #ddd; }}
        th {{ width: 40%; font-weight: 600; }}
        code {{ background: #f3f3f3; padding: 0 0.25rem; }}
    </style>
</head>
<body>
    <h1>Group Reward Observer</h1>
    <p>Steam group {group} membership sync</p>

    <table>
        <tr><th>Generation</th><td>{number}</td></tr>
        <tr><th>Members</th><td>{members}</td></tr>
        <tr><th>Published</th><td>{published}</td></tr>
        <tr><th>Scheduler</th><td>{refresh_state}</td></tr>
        <tr><th>Cycles ok / failed</th><td>{ok} / {failed}</td></tr>
        <tr><th>Last cycle</th><td>{last}</td></tr>
    </table>

    <h2>API</h2>
    <p>
        <code>GET <a href="/api/status">/api/status</a></code><br>
        <code>GET /api/members/{{steam_id}}</code><br>
        <code>POST /api/refresh</code>
    </p>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Report the current generation alongside the scheduler summary.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let generation = state.members.snapshot();
    Json(StatusResponse {
        group_id: state.group.get(),
        remote_group_id: state.group.remote_id(),
        generation: generation.number(),
        generation_created_at: generation.created_at(),
        member_count: generation.len(),
        refresh: state.refresh.summary().await,
        started_at: state.started_at,
    })
}

// ---------------------------------------------------------------------------
// GET /api/members/{steam_id}
// ---------------------------------------------------------------------------

/// Answer whether one account is a member of the current generation.
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<MemberResponse>, ObserverError> {
    let steam_id: SteamId64 = raw.parse()?;
    let generation = state.members.snapshot();
    Ok(Json(MemberResponse {
        steam_id,
        member: generation.contains(&steam_id),
        generation: generation.number(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/refresh
// ---------------------------------------------------------------------------

/// Ask the scheduler for a refresh, as a map start would.
pub async fn post_refresh(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<RefreshResponse>), ObserverError> {
    match state.refresh.trigger() {
        trigger @ (TriggerOutcome::Scheduled | TriggerOutcome::Coalesced) => {
            info!(?trigger, "refresh requested via observer");
            Ok((StatusCode::ACCEPTED, Json(RefreshResponse { trigger })))
        }
        TriggerOutcome::InFlight => Err(ObserverError::RefreshInFlight),
        TriggerOutcome::Stopped => Err(ObserverError::SchedulerStopped),
    }
}
