//! Shared application state for the Observer API server.

use chrono::{DateTime, Utc};
use groupreward_core::{MembershipReader, RefreshHandle};
use groupreward_types::GroupId;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The configured group.
    pub group: GroupId,
    /// Control handle onto the running refresh scheduler.
    pub refresh: RefreshHandle,
    /// Read handle onto the membership cache.
    pub members: MembershipReader,
    /// When the service started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state for `group` backed by the given scheduler handle.
    pub fn new(group: GroupId, refresh: RefreshHandle) -> Self {
        let members = refresh.reader();
        Self {
            group,
            refresh,
            members,
            started_at: Utc::now(),
        }
    }
}
