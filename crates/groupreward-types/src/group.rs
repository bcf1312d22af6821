//! Configured group identifier and its remote (canonical) form.
//!
//! Operators configure the short numeric group id shown in the group's
//! admin pages. The member-list endpoint is keyed by the 64-bit group id
//! instead, which [`GroupId::remote_id`] derives.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Offset the directory service adds to a short group id.
///
/// Opaque external constant of the remote identifier scheme. Preserved
/// verbatim; do not re-derive it from the 64-bit layout.
pub const REMOTE_GROUP_OFFSET: u64 = 1_429_521_408;

/// Literal digits the directory service prepends to the offset group id.
///
/// Opaque external constant, preserved verbatim alongside
/// [`REMOTE_GROUP_OFFSET`].
pub const REMOTE_GROUP_PREFIX: &str = "10358279";

/// A configured, non-zero short group identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(NonZeroU32);

impl GroupId {
    /// Create a group id. Returns `None` for zero, which marks an unset value.
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Return the configured numeric value.
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The canonical remote group identifier used in endpoint URLs.
    ///
    /// Group id `1` maps to `103582791429521409`.
    pub fn remote_id(self) -> String {
        let offset = REMOTE_GROUP_OFFSET.saturating_add(u64::from(self.get()));
        format!("{REMOTE_GROUP_PREFIX}{offset}")
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
