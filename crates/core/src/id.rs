//! Strongly-typed item identifier.

use core::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an inventory item.
///
/// Server-fetched items carry the id the server assigned. Items created on the
/// client before any round-trip get a clock-derived id (see [`ItemId::from_clock`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Derive an identifier from the current wall-clock time in milliseconds.
    ///
    /// Two calls within the same millisecond return the same id; a collision
    /// replaces the earlier record on upsert.
    pub fn from_clock() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<ItemId> for i64 {
    fn from(value: ItemId) -> Self {
        value.0
    }
}

impl FromStr for ItemId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<i64>()
            .map_err(|e| DomainError::invalid_id(format!("ItemId: {e}")))?;
        Ok(Self(raw))
    }
}
