//! Membership synchronization for the Steam group reward service.
//!
//! # Architecture
//!
//! ```text
//! RefreshScheduler --> MemberListFetcher --> parse_member_list --> MembershipCache
//!                                                                      |
//!                               event handlers <-- MembershipReader <--+
//! ```
//!
//! Network I/O and parsing happen only inside the scheduler's background
//! task. Event handlers read through [`MembershipReader`], which never
//! blocks and never performs I/O.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod parse;
pub mod refresh;

pub use cache::{Generation, MembershipCache, MembershipReader};
pub use config::{ConfigError, RewardConfig, ServiceConfig, SyncConfig};
pub use fetch::{DirectorySource, FetchError, MemberListFetcher};
pub use parse::{ParseError, ParsedDirectory, parse_member_list};
pub use refresh::{
    CycleOutcome, CycleReport, RefreshError, RefreshHandle, RefreshScheduler, RefreshState,
    RefreshSummary, RefreshTimings, TriggerOutcome,
};
