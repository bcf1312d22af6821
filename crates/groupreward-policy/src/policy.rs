//! Reward policy evaluated synchronously from host event handlers.
//!
//! Each handler resolves the actor, checks the current member generation,
//! and only then touches the host. The membership check is a wait-free
//! cache read; nothing here performs I/O or blocks the event path.
//!
//! # Effects
//!
//! | Event | Immediate | Deferred (`spawn_effect_delay`) |
//! |---|---|---|
//! | spawn | money += `spawn_money` | helmet (full armor only), armor, max health, health |
//! | elimination | money += `kill_money`, max health, health += `kill_hp` | -- |
//!
//! A health value above [`BASE_MAX_HEALTH`] is always preceded by raising
//! the ceiling, since the host clamps health to the ceiling on write.

use std::sync::Arc;

use groupreward_core::{MembershipReader, RewardConfig};
use groupreward_types::SteamId64;
use tracing::{debug, info};

use crate::deferred::DeferredTasks;
use crate::event::{EliminationEvent, Outcome, SkipReason, SpawnEvent};
use crate::host::{ActorHandle, BASE_MAX_HEALTH, FULL_ARMOR, Host};

/// Evaluates member rewards against the live membership cache.
#[derive(Debug)]
pub struct RewardPolicy<H> {
    host: Arc<H>,
    members: MembershipReader,
    rewards: RewardConfig,
    deferred: DeferredTasks,
}

impl<H: Host> RewardPolicy<H> {
    /// Create a policy over `host` using the given member reader.
    pub const fn new(
        host: Arc<H>,
        members: MembershipReader,
        rewards: RewardConfig,
        deferred: DeferredTasks,
    ) -> Self {
        Self {
            host,
            members,
            rewards,
            deferred,
        }
    }

    /// Reward configuration in effect.
    pub const fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }

    /// Deferred spawn effects not yet applied.
    pub fn pending_effects(&self) -> usize {
        self.deferred.pending()
    }

    /// Abort all pending spawn effects, e.g. on unload.
    pub fn shutdown(&self) {
        self.deferred.cancel_all();
    }

    /// Handle an actor entering play.
    pub fn on_spawn(&self, event: &SpawnEvent) -> Outcome {
        let (actor, identity) = match self.eligible_member(event.actor) {
            Ok(found) => found,
            Err(reason) => return self.skipped("spawn", reason),
        };

        self.host.add_money(actor, self.rewards.spawn_money);

        let host = Arc::clone(&self.host);
        let rewards = self.rewards.clone();
        self.deferred
            .schedule(actor, rewards.spawn_effect_delay(), move || {
                apply_spawn_effects(host.as_ref(), actor, &rewards);
            });

        info!(
            steam_id = %identity,
            slot = actor.slot,
            money = self.rewards.spawn_money,
            "spawn reward granted"
        );
        Outcome::Rewarded
    }

    /// Handle an elimination credited to `event.attacker`.
    ///
    /// Self-eliminations are never rewarded.
    pub fn on_elimination(&self, event: &EliminationEvent) -> Outcome {
        let Some(attacker) = event.attacker else {
            return self.skipped("elimination", SkipReason::NoActor);
        };
        if event.victim == Some(attacker) {
            return self.skipped("elimination", SkipReason::SelfElimination);
        }
        let (actor, identity) = match self.eligible_member(Some(attacker)) {
            Ok(found) => found,
            Err(reason) => return self.skipped("elimination", reason),
        };

        let rewards = &self.rewards;
        self.host.add_money(actor, rewards.kill_money);

        let current = self.host.health(actor).unwrap_or(0);
        if rewards.kill_hp > BASE_MAX_HEALTH {
            self.host.set_max_health(actor, rewards.kill_hp);
        }
        self.host
            .set_health(actor, current.saturating_add(rewards.kill_hp));
        self.host.mark_health_changed(actor);

        info!(
            steam_id = %identity,
            slot = actor.slot,
            money = rewards.kill_money,
            health = rewards.kill_hp,
            "elimination reward granted"
        );
        Outcome::Rewarded
    }

    /// Resolve an actor and confirm it is a rewardable member.
    fn eligible_member(
        &self,
        actor: Option<ActorHandle>,
    ) -> Result<(ActorHandle, SteamId64), SkipReason> {
        let actor = actor.ok_or(SkipReason::NoActor)?;
        let info = self.host.resolve(actor).ok_or(SkipReason::InvalidActor)?;
        if !info.is_valid {
            return Err(SkipReason::InvalidActor);
        }
        if info.is_bot {
            return Err(SkipReason::Bot);
        }
        let identity = info.identity.ok_or(SkipReason::Unauthenticated)?;
        if !info.has_pawn {
            return Err(SkipReason::NoPawn);
        }
        if !self.members.query(&identity) {
            return Err(SkipReason::NotMember);
        }
        Ok((actor, identity))
    }

    fn skipped(&self, event: &'static str, reason: SkipReason) -> Outcome {
        debug!(
            event,
            ?reason,
            generation = self.members.generation(),
            "no reward"
        );
        Outcome::Skipped(reason)
    }
}

/// Deferred half of the spawn reward.
///
/// Re-resolves the actor first: it may have disconnected or lost its
/// pawn since the spawn event.
fn apply_spawn_effects<H: Host>(host: &H, actor: ActorHandle, rewards: &RewardConfig) {
    let usable = host
        .resolve(actor)
        .is_some_and(|info| info.is_valid && info.has_pawn);
    if !usable {
        debug!(slot = actor.slot, "actor gone before spawn effects, skipping");
        return;
    }

    if rewards.spawn_armor == FULL_ARMOR {
        host.set_helmet(actor, true);
    }
    host.set_armor(actor, rewards.spawn_armor);

    if rewards.spawn_hp > BASE_MAX_HEALTH {
        host.set_max_health(actor, rewards.spawn_hp);
    }
    host.set_health(actor, rewards.spawn_hp);
    host.mark_health_changed(actor);
}
