//! Steam account identity as published in group member lists.
//!
//! A [`SteamId64`] is the 64-bit packed account identifier. The packed value
//! carries its own format metadata, so validation on ingestion checks the
//! layout rather than just the numeric range:
//!
//! ```text
//! bits 56..64  universe      (1 = public .. 4 = dev)
//! bits 52..56  account type  (1 = individual)
//! bits 32..52  instance
//! bits  0..32  account number (non-zero)
//! ```
//!
//! Equality and hashing are defined on the packed numeric value only, so the
//! type can be used directly as a set element.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account type tag for individual (user) accounts.
pub const ACCOUNT_TYPE_INDIVIDUAL: u8 = 1;

/// Highest universe value assigned by the directory service.
const MAX_UNIVERSE: u8 = 4;

/// Why a textual or numeric identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidIdentity {
    /// The text was empty after trimming whitespace.
    #[error("identifier is empty")]
    Empty,

    /// The text was not a base-10 unsigned 64-bit integer.
    #[error("identifier {0:?} is not a 64-bit decimal number")]
    NotNumeric(String),

    /// The account number field was zero.
    #[error("identifier {0} has a zero account number")]
    ZeroAccount(u64),

    /// The universe field is outside the known range.
    #[error("identifier {value} has unknown universe {universe}")]
    UnknownUniverse {
        /// The rejected packed value.
        value: u64,
        /// The decoded universe field.
        universe: u8,
    },

    /// The account is not an individual user account.
    #[error("identifier {value} has account type {account_type}, expected individual")]
    NotIndividual {
        /// The rejected packed value.
        value: u64,
        /// The decoded account type field.
        account_type: u8,
    },
}

/// A validated 64-bit Steam account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SteamId64(u64);

impl SteamId64 {
    /// Validate a packed identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentity`] when the account number is zero, the
    /// universe is unknown, or the account type is not individual.
    pub const fn new(value: u64) -> Result<Self, InvalidIdentity> {
        let id = Self(value);
        if id.account_number() == 0 {
            return Err(InvalidIdentity::ZeroAccount(value));
        }
        let universe = id.universe();
        if universe == 0 || universe > MAX_UNIVERSE {
            return Err(InvalidIdentity::UnknownUniverse { value, universe });
        }
        let account_type = id.account_type();
        if account_type != ACCOUNT_TYPE_INDIVIDUAL {
            return Err(InvalidIdentity::NotIndividual {
                value,
                account_type,
            });
        }
        Ok(id)
    }

    /// Return the packed numeric value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Universe field (bits 56..64).
    #[allow(clippy::cast_possible_truncation)]
    pub const fn universe(self) -> u8 {
        (self.0 >> 56) as u8
    }

    /// Account type field (bits 52..56).
    #[allow(clippy::cast_possible_truncation)]
    pub const fn account_type(self) -> u8 {
        ((self.0 >> 52) & 0xF) as u8
    }

    /// Instance field (bits 32..52).
    #[allow(clippy::cast_possible_truncation)]
    pub const fn instance(self) -> u32 {
        ((self.0 >> 32) & 0xF_FFFF) as u32
    }

    /// Account number field (bits 0..32).
    #[allow(clippy::cast_possible_truncation)]
    pub const fn account_number(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }
}

impl FromStr for SteamId64 {
    type Err = InvalidIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidIdentity::Empty);
        }
        // `u64::from_str` accepts a leading `+`, which never appears in member lists.
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidIdentity::NotNumeric(trimmed.to_owned()));
        }
        let value: u64 = trimmed
            .parse()
            .map_err(|_e| InvalidIdentity::NotNumeric(trimmed.to_owned()))?;
        Self::new(value)
    }
}

impl TryFrom<u64> for SteamId64 {
    type Error = InvalidIdentity;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for SteamId64 {
    type Error = InvalidIdentity;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SteamId64> for u64 {
    fn from(id: SteamId64) -> Self {
        id.0
    }
}

impl From<SteamId64> for String {
    fn from(id: SteamId64) -> Self {
        id.0.to_string()
    }
}

impl fmt::Display for SteamId64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
