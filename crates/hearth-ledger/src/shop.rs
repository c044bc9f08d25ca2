//! Shop state: priced stock plus a till.
//!
//! A shop never mutates an agent -- the action applier coordinates both
//! legs of a trade after checking every precondition, so a trade either
//! moves items *and* money or moves nothing. The shop's own operations
//! are individually validated and checked.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use hearth_types::{ItemCatalog, ItemKind, ShopId};

use crate::error::LedgerError;
use crate::inventory::InventoryLedger;

/// One shop in the town.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    /// The shop's identity.
    pub id: ShopId,
    /// Display name.
    pub name: String,
    stock: InventoryLedger,
    prices: BTreeMap<ItemKind, u32>,
    till: u32,
}

impl Shop {
    /// Create a shop with explicit prices and an opening till balance.
    pub const fn new(id: ShopId, name: String, prices: BTreeMap<ItemKind, u32>, till: u32) -> Self {
        Self {
            id,
            name,
            stock: InventoryLedger::new(),
            prices,
            till,
        }
    }

    /// Create a shop pricing every catalogued item at its base price.
    pub fn from_catalog(id: ShopId, name: String, catalog: &ItemCatalog, till: u32) -> Self {
        let prices = catalog
            .iter()
            .map(|(kind, spec)| (kind, spec.base_price))
            .collect();
        Self::new(id, name, prices, till)
    }

    /// Unit price for an item, or `None` if the shop does not trade it.
    pub fn price_of(&self, item: ItemKind) -> Option<u32> {
        self.prices.get(&item).copied()
    }

    /// Total price for `quantity` units.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotTraded`] for unpriced items or
    /// [`LedgerError::ArithmeticOverflow`] on overflow.
    pub fn total_price(&self, item: ItemKind, quantity: u32) -> Result<u32, LedgerError> {
        let unit = self.price_of(item).ok_or(LedgerError::NotTraded { item })?;
        unit.checked_mul(quantity)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    /// Units of an item in stock.
    pub fn stock_count(&self, item: ItemKind) -> u32 {
        self.stock.count(item)
    }

    /// Add stock (deliveries, purchases from agents).
    ///
    /// # Errors
    ///
    /// Propagates [`InventoryLedger::add`] errors.
    pub fn add_stock(&mut self, item: ItemKind, quantity: u32) -> Result<(), LedgerError> {
        self.stock.add(item, quantity)?;
        debug!(shop = %self.id, ?item, quantity, stock = self.stock.count(item), "stock added");
        Ok(())
    }

    /// Remove stock (sales to agents).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OutOfStock`] if the shop holds none, or
    /// [`LedgerError::InsufficientInventory`] for a short count.
    pub fn remove_stock(&mut self, item: ItemKind, quantity: u32) -> Result<(), LedgerError> {
        if !self.stock.has(item) {
            return Err(LedgerError::OutOfStock { item });
        }
        self.stock.remove(item, quantity)?;
        debug!(shop = %self.id, ?item, quantity, stock = self.stock.count(item), "stock removed");
        Ok(())
    }

    /// Money currently in the till.
    pub const fn till(&self) -> u32 {
        self.till
    }

    /// Put money into the till.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ArithmeticOverflow`] on overflow.
    pub fn credit_till(&mut self, amount: u32) -> Result<(), LedgerError> {
        self.till = self
            .till
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        debug!(shop = %self.id, amount, till = self.till, "till credited");
        Ok(())
    }

    /// Take money out of the till.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TillShort`] if the till cannot cover the
    /// amount; the till is untouched in that case.
    pub fn debit_till(&mut self, amount: u32) -> Result<(), LedgerError> {
        self.till = self
            .till
            .checked_sub(amount)
            .ok_or(LedgerError::TillShort {
                required: amount,
                held: self.till,
            })?;
        debug!(shop = %self.id, amount, till = self.till, "till debited");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn grocer() -> Shop {
        let catalog = ItemCatalog::standard();
        let mut shop = Shop::from_catalog(
            ShopId::new(),
            String::from("Grocer"),
            &catalog,
            500,
        );
        shop.add_stock(ItemKind::Bread, 10).unwrap();
        shop
    }

    #[test]
    fn catalog_prices_carry_over() {
        let shop = grocer();
        assert_eq!(shop.price_of(ItemKind::Bread), Some(15));
        assert_eq!(shop.total_price(ItemKind::Bread, 3).unwrap(), 45);
    }

    #[test]
    fn untraded_item_is_rejected() {
        let shop = Shop::new(ShopId::new(), String::from("Empty"), BTreeMap::new(), 0);
        assert_eq!(shop.price_of(ItemKind::Fish), None);
        assert_eq!(
            shop.total_price(ItemKind::Fish, 1),
            Err(LedgerError::NotTraded {
                item: ItemKind::Fish
            })
        );
    }

    #[test]
    fn out_of_stock_is_distinct_from_short_stock() {
        let mut shop = grocer();
        assert_eq!(
            shop.remove_stock(ItemKind::Gemstone, 1),
            Err(LedgerError::OutOfStock {
                item: ItemKind::Gemstone
            })
        );
        assert!(matches!(
            shop.remove_stock(ItemKind::Bread, 99),
            Err(LedgerError::InsufficientInventory { .. })
        ));
        assert_eq!(shop.stock_count(ItemKind::Bread), 10);
    }

    #[test]
    fn till_cannot_go_negative() {
        let mut shop = grocer();
        assert_eq!(
            shop.debit_till(501),
            Err(LedgerError::TillShort {
                required: 501,
                held: 500,
            })
        );
        assert_eq!(shop.till(), 500);
        shop.debit_till(500).unwrap();
        assert_eq!(shop.till(), 0);
    }

    #[test]
    fn shop_roundtrip_serde() {
        let shop = grocer();
        let json = serde_json::to_string(&shop).unwrap();
        let back: Shop = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shop);
    }
}
