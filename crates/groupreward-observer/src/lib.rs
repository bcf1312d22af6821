//! Observer API server for the Steam group reward service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Status endpoints** reporting the current member generation and the
//!   refresh scheduler's state, counters and last cycle report
//! - **Membership query** for a single `SteamID64`
//! - **Refresh trigger** that asks the scheduler for an out-of-band cycle
//! - **Minimal HTML page** (`GET /`) summarizing the above
//!
//! # Architecture
//!
//! Handlers read through a [`MembershipReader`] and a [`RefreshHandle`].
//! Both are lock-free for membership reads, so the observer never competes
//! with the host's event handlers for the cache.
//!
//! [`MembershipReader`]: groupreward_core::MembershipReader
//! [`RefreshHandle`]: groupreward_core::RefreshHandle

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, spawn_server, start_server};
pub use state::AppState;
