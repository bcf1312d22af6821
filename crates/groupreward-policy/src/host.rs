//! Boundary to the host game runtime.
//!
//! The host owns players and their pawns. The policy only ever reaches
//! them through [`Host`], addressing actors by [`ActorHandle`]. A handle
//! pairs the slot index with a serial so that a handle kept across a
//! disconnect/reconnect no longer resolves to the new occupant.

use groupreward_types::SteamId64;

/// Health ceiling the host applies to a freshly spawned pawn.
pub const BASE_MAX_HEALTH: u32 = 100;

/// Armor value that also comes with a helmet.
pub const FULL_ARMOR: u32 = 100;

/// Stable reference to an actor in the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorHandle {
    /// Player slot index.
    pub slot: u32,
    /// Serial distinguishing successive occupants of the slot.
    pub serial: u32,
}

impl ActorHandle {
    /// Create a handle from slot and serial.
    pub const fn new(slot: u32, serial: u32) -> Self {
        Self { slot, serial }
    }
}

/// Actor attributes resolved from the host at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorInfo {
    /// Whether the host still considers the actor valid.
    pub is_valid: bool,
    /// Whether the actor is a bot.
    pub is_bot: bool,
    /// The authenticated account, once the host has verified it.
    pub identity: Option<SteamId64>,
    /// Whether the actor currently controls a pawn.
    pub has_pawn: bool,
}

/// Mutation and lookup primitives the host exposes to the policy.
///
/// Implementations are called from event handlers and from deferred
/// tasks on the tokio runtime, so they must be thread-safe. Mutations on
/// an actor that no longer resolves are expected to be ignored.
pub trait Host: Send + Sync + 'static {
    /// Look up an actor; `None` when the handle is stale.
    fn resolve(&self, actor: ActorHandle) -> Option<ActorInfo>;

    /// Add `amount` to the actor's money balance.
    fn add_money(&self, actor: ActorHandle, amount: u32);

    /// Current pawn health, if the actor has a pawn.
    fn health(&self, actor: ActorHandle) -> Option<u32>;

    /// Set the pawn's health ceiling.
    fn set_max_health(&self, actor: ActorHandle, value: u32);

    /// Set the pawn's health. The host clamps it to the current ceiling.
    fn set_health(&self, actor: ActorHandle, value: u32);

    /// Set the pawn's armor value.
    fn set_armor(&self, actor: ActorHandle, value: u32);

    /// Give or take the pawn's helmet.
    fn set_helmet(&self, actor: ActorHandle, equipped: bool);

    /// Notify the host that the health field was written directly.
    ///
    /// Required after every direct health write, otherwise clients never
    /// see the new value.
    fn mark_health_changed(&self, actor: ActorHandle);
}
