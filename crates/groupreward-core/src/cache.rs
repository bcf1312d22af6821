//! Membership cache with atomic generation publication.
//!
//! # Mental model
//!
//! * A [`Generation`] is an immutable set of member identities. It is never
//!   mutated after it is published.
//! * [`MembershipCache`] is the single writer. It builds a replacement
//!   generation and publishes it with one atomic pointer store.
//! * [`MembershipReader`] handles are cheap to clone and answer queries with
//!   a wait-free `ArcSwap` load. Readers never observe a partially built set.
//!
//! The writer is deliberately not `Clone`: only the refresh scheduler owns
//! it, and everyone else gets a reader.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use groupreward_types::SteamId64;

/// One immutable snapshot of the group's member set.
#[derive(Debug)]
pub struct Generation {
    members: HashSet<SteamId64>,
    number: u64,
    created_at: DateTime<Utc>,
}

impl Generation {
    fn empty() -> Self {
        Self {
            members: HashSet::new(),
            number: 0,
            created_at: Utc::now(),
        }
    }

    /// Whether `id` belongs to this generation.
    pub fn contains(&self, id: &SteamId64) -> bool {
        self.members.contains(id)
    }

    /// Number of members in this generation.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether this generation has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Generation number; `0` is the initial empty generation.
    pub const fn number(&self) -> u64 {
        self.number
    }

    /// When this generation was published.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Iterate over the members of this generation.
    pub fn members(&self) -> impl Iterator<Item = &SteamId64> {
        self.members.iter()
    }
}

/// The writer side of the membership cache.
#[derive(Debug)]
pub struct MembershipCache {
    current: Arc<ArcSwap<Generation>>,
}

impl MembershipCache {
    /// Create a cache holding the empty generation `0`.
    pub fn new() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(Generation::empty())),
        }
    }

    /// Get a read handle onto this cache.
    pub fn reader(&self) -> MembershipReader {
        MembershipReader {
            current: Arc::clone(&self.current),
        }
    }

    /// Install `members` as the new current generation.
    ///
    /// Queries that start after this returns see the new set. Concurrent
    /// queries see either the old or the new set in full. Returns the new
    /// generation number.
    pub fn replace(&self, members: HashSet<SteamId64>) -> u64 {
        let number = self.current.load().number.saturating_add(1);
        self.current.store(Arc::new(Generation {
            members,
            number,
            created_at: Utc::now(),
        }));
        number
    }

    /// Whether `id` is a member of the current generation.
    pub fn query(&self, id: &SteamId64) -> bool {
        self.current.load().contains(id)
    }

    /// Pin the current generation.
    pub fn snapshot(&self) -> Arc<Generation> {
        self.current.load_full()
    }
}

impl Default for MembershipCache {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable read-only handle onto a [`MembershipCache`].
#[derive(Debug, Clone)]
pub struct MembershipReader {
    current: Arc<ArcSwap<Generation>>,
}

impl MembershipReader {
    /// Whether `id` is a member of the current generation.
    ///
    /// Wait-free; never performs I/O.
    pub fn query(&self, id: &SteamId64) -> bool {
        self.current.load().contains(id)
    }

    /// Pin the current generation for several consistent reads.
    pub fn snapshot(&self) -> Arc<Generation> {
        self.current.load_full()
    }

    /// Number of the current generation.
    pub fn generation(&self) -> u64 {
        self.current.load().number
    }
}
