use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::ItemId;

/// An inventory item.
///
/// The serde shape is the wire and persisted shape:
/// `{ "id": 1, "item_name": "Bolt", "stock": 10, "unit": "pcs" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "item_name")]
    pub name: String,
    pub stock: u32,
    pub unit: String,
}

impl Item {
    /// Build a validated item.
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        stock: u32,
        unit: impl Into<String>,
    ) -> DomainResult<Self> {
        let item = Self {
            id,
            name: name.into(),
            stock,
            unit: unit.into(),
        };
        item.validate()?;
        Ok(item)
    }

    /// Build a validated item with a client-assigned id (see [`ItemId::from_clock`]).
    pub fn draft(name: impl Into<String>, stock: u32, unit: impl Into<String>) -> DomainResult<Self> {
        Self::new(ItemId::from_clock(), name, stock, unit)
    }

    /// Check the invariants a deserialized or hand-built item may have skipped.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "item {}: name cannot be empty",
                self.id
            )));
        }
        if self.unit.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "item {}: unit cannot be empty",
                self.id
            )));
        }
        Ok(())
    }

    /// Copy of this item with a different stock level.
    pub fn with_stock(&self, stock: u32) -> Self {
        Self {
            stock,
            ..self.clone()
        }
    }
}
