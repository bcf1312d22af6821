//! Event payloads delivered by the host and evaluation outcomes.

use crate::host::ActorHandle;

/// An actor entered play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnEvent {
    /// The spawned actor, if the host could identify one.
    pub actor: Option<ActorHandle>,
}

/// An actor was eliminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EliminationEvent {
    /// The eliminated actor.
    pub victim: Option<ActorHandle>,
    /// The actor credited with the elimination.
    pub attacker: Option<ActorHandle>,
}

/// Why an event produced no reward.
///
/// None of these are errors; most events in a match end up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The event carried no actor.
    NoActor,
    /// The actor no longer resolves or is flagged invalid.
    InvalidActor,
    /// The actor is a bot.
    Bot,
    /// The actor's account has not been authenticated yet.
    Unauthenticated,
    /// The actor has no pawn to apply effects to.
    NoPawn,
    /// The attacker eliminated themselves.
    SelfElimination,
    /// The actor is not in the current member generation.
    NotMember,
}

/// Result of evaluating one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The actor is a member and rewards were applied (or scheduled).
    Rewarded,
    /// No action was taken.
    Skipped(SkipReason),
}
