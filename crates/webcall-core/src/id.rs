//! Connection identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest valid connection identifier (inclusive).
pub const ID_FLOOR: u64 = 10_000_000_000;

/// Upper bound of the identifier range (exclusive).
pub const ID_CEIL: u64 = 99_999_999_999;

/// An 11-digit decimal identifier for one live connection.
///
/// Unique among live connections; may be reused after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw value. Returns `None` outside `[ID_FLOOR, ID_CEIL)`.
    pub fn new(raw: u64) -> Option<Self> {
        Self::in_range(raw).then_some(Self(raw))
    }

    pub fn in_range(raw: u64) -> bool {
        (ID_FLOOR..ID_CEIL).contains(&raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
