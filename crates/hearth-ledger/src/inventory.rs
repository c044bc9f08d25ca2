//! Quantity-tracked item container.
//!
//! Counts are always positive while present: an entry that reaches zero is
//! removed, so `has` and `count > 0` agree and snapshots carry no dead
//! entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hearth_types::ItemKind;

use crate::error::LedgerError;

/// A generic item-count container used by agents and shops alike.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLedger {
    items: BTreeMap<ItemKind, u32>,
}

impl InventoryLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// Create a ledger pre-filled from explicit counts; zero counts are
    /// dropped.
    pub fn from_counts(counts: BTreeMap<ItemKind, u32>) -> Self {
        Self {
            items: counts.into_iter().filter(|(_, n)| *n > 0).collect(),
        }
    }

    /// Add `quantity` units of an item. Adding zero is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ArithmeticOverflow`] if the count would
    /// exceed `u32::MAX`.
    pub fn add(&mut self, item: ItemKind, quantity: u32) -> Result<(), LedgerError> {
        if quantity == 0 {
            return Ok(());
        }
        let held = self.items.entry(item).or_insert(0);
        *held = held
            .checked_add(quantity)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Remove `quantity` units of an item, pruning the entry at zero.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientInventory`] if fewer units are
    /// held than requested; nothing is removed in that case.
    pub fn remove(&mut self, item: ItemKind, quantity: u32) -> Result<(), LedgerError> {
        let held = self.count(item);
        let remaining = held
            .checked_sub(quantity)
            .ok_or(LedgerError::InsufficientInventory {
                item,
                requested: quantity,
                held,
            })?;
        if remaining == 0 {
            self.items.remove(&item);
        } else {
            self.items.insert(item, remaining);
        }
        Ok(())
    }

    /// Whether at least one unit of the item is held.
    pub fn has(&self, item: ItemKind) -> bool {
        self.items.contains_key(&item)
    }

    /// Units held of a specific item (0 when absent).
    pub fn count(&self, item: ItemKind) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// Total units held across all items.
    pub fn total(&self) -> u64 {
        self.items
            .values()
            .fold(0_u64, |sum, n| sum.saturating_add(u64::from(*n)))
    }

    /// Whether nothing is held at all.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over held items and counts.
    pub fn iter(&self) -> impl Iterator<Item = (ItemKind, u32)> + '_ {
        self.items.iter().map(|(item, n)| (*item, *n))
    }

    /// Copy the counts into a plain map (for snapshots).
    pub fn to_counts(&self) -> BTreeMap<ItemKind, u32> {
        self.items.clone()
    }
}
