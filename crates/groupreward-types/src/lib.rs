//! Shared type definitions for the Steam group reward service.
//!
//! # Modules
//!
//! - [`identity`] -- Validated 64-bit account identifiers ([`SteamId64`])
//! - [`group`] -- Configured group id and its canonical remote form

pub mod group;
pub mod identity;

pub use group::GroupId;
pub use identity::{InvalidIdentity, SteamId64};
