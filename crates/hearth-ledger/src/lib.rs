//! Inventory accounting for the Hearth simulation.
//!
//! The [`InventoryLedger`] is the only way item counts change hands --
//! agents and shops never expose raw maps. Every mutation is validated
//! with checked arithmetic, insufficiencies are typed errors, and entries
//! that reach zero are pruned so "absent" and "zero" are the same state.

pub mod error;
pub mod inventory;
pub mod shop;

pub use error::LedgerError;
pub use inventory::InventoryLedger;
pub use shop::Shop;
