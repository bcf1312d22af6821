//! Axum router construction for the Observer API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /api/status` -- generation and scheduler status
/// - `GET /api/members/{steam_id}` -- membership query
/// - `POST /api/refresh` -- request a refresh cycle
///
/// CORS allows any origin so a dashboard on another port can poll it.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::get_status))
        .route("/api/members/{steam_id}", get(handlers::get_member))
        .route("/api/refresh", post(handlers::post_refresh))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
