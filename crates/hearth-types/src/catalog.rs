//! The item catalog: edibility and base pricing, fed into the core as data.
//!
//! Price tables and food values belong to the town's content, not to the
//! engine. The catalog is built once at world setup (from config or the
//! built-in defaults) and passed by reference wherever eating or pricing
//! decisions are made.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::ItemKind;

/// Per-item data: what eating it restores (if edible) and its base price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    /// Hunger points restored when eaten; `None` means not edible.
    pub restore: Option<Decimal>,
    /// Base shop price per unit.
    pub base_price: u32,
}

/// Lookup table from [`ItemKind`] to its [`ItemSpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCatalog {
    entries: BTreeMap<ItemKind, ItemSpec>,
}

impl ItemCatalog {
    /// Build a catalog from explicit entries.
    pub const fn from_entries(entries: BTreeMap<ItemKind, ItemSpec>) -> Self {
        Self { entries }
    }

    /// The built-in town catalog used by the demo world and tests.
    pub fn standard() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            ItemKind::Bread,
            ItemSpec {
                restore: Some(Decimal::from(30)),
                base_price: 15,
            },
        );
        entries.insert(
            ItemKind::Berry,
            ItemSpec {
                restore: Some(Decimal::from(10)),
                base_price: 5,
            },
        );
        entries.insert(
            ItemKind::Fish,
            ItemSpec {
                restore: Some(Decimal::from(25)),
                base_price: 12,
            },
        );
        entries.insert(
            ItemKind::Wheat,
            ItemSpec {
                restore: None,
                base_price: 8,
            },
        );
        entries.insert(
            ItemKind::CopperOre,
            ItemSpec {
                restore: None,
                base_price: 15,
            },
        );
        entries.insert(
            ItemKind::IronOre,
            ItemSpec {
                restore: None,
                base_price: 25,
            },
        );
        entries.insert(
            ItemKind::Gemstone,
            ItemSpec {
                restore: None,
                base_price: 60,
            },
        );
        Self { entries }
    }

    /// Hunger points restored by eating one unit, or `None` if not edible.
    pub fn restore(&self, item: ItemKind) -> Option<Decimal> {
        self.entries.get(&item).and_then(|spec| spec.restore)
    }

    /// Whether the item can be eaten at all.
    pub fn is_edible(&self, item: ItemKind) -> bool {
        self.restore(item).is_some()
    }

    /// Base price per unit, or `None` if the item is not catalogued.
    pub fn base_price(&self, item: ItemKind) -> Option<u32> {
        self.entries.get(&item).map(|spec| spec.base_price)
    }

    /// Iterate over all catalogued items.
    pub fn iter(&self) -> impl Iterator<Item = (ItemKind, &ItemSpec)> {
        self.entries.iter().map(|(kind, spec)| (*kind, spec))
    }
}
