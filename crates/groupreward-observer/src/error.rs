//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use groupreward_types::InvalidIdentity;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The path segment is not a valid individual `SteamID64`.
    #[error("invalid steam id: {0}")]
    InvalidIdentity(#[from] InvalidIdentity),

    /// A refresh cycle is already running.
    #[error("refresh already in flight")]
    RefreshInFlight,

    /// The refresh scheduler is no longer running.
    #[error("refresh scheduler stopped")]
    SchedulerStopped,
}

impl ObserverError {
    /// HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidIdentity(_) => StatusCode::BAD_REQUEST,
            Self::RefreshInFlight => StatusCode::CONFLICT,
            Self::SchedulerStopped => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
