//! Member reward policy for the Steam group reward service.
//!
//! The host game runtime calls [`RewardPolicy::on_spawn`] and
//! [`RewardPolicy::on_elimination`] from its event handlers. The policy
//! consults the membership cache maintained by `groupreward-core` and
//! applies configured rewards through the [`Host`] trait.
//!
//! # Modules
//!
//! - [`host`] -- Host runtime boundary and actor handles
//! - [`event`] -- Event payloads and evaluation outcomes
//! - [`deferred`] -- Cancellable delayed tasks keyed by actor
//! - [`policy`] -- The reward evaluator

pub mod deferred;
pub mod event;
pub mod host;
pub mod policy;

pub use deferred::DeferredTasks;
pub use event::{EliminationEvent, Outcome, SkipReason, SpawnEvent};
pub use host::{ActorHandle, ActorInfo, BASE_MAX_HEALTH, FULL_ARMOR, Host};
pub use policy::RewardPolicy;
