//! Error types for inventory and shop accounting.

use hearth_types::ItemKind;

/// Errors from ledger mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A removal asked for more units than are held.
    #[error("insufficient inventory: need {requested} x {item:?}, hold {held}")]
    InsufficientInventory {
        /// The item in question.
        item: ItemKind,
        /// Units requested.
        requested: u32,
        /// Units actually held.
        held: u32,
    },

    /// A shop has no stock of the requested item.
    #[error("shop out of stock: {item:?}")]
    OutOfStock {
        /// The item in question.
        item: ItemKind,
    },

    /// The shop does not trade in this item at all.
    #[error("shop does not trade {item:?}")]
    NotTraded {
        /// The item in question.
        item: ItemKind,
    },

    /// The shop's till cannot cover a payout.
    #[error("shop till short: need {required}, holds {held}")]
    TillShort {
        /// Amount required.
        required: u32,
        /// Amount in the till.
        held: u32,
    },

    /// Checked arithmetic failed.
    #[error("arithmetic overflow in ledger accounting")]
    ArithmeticOverflow,
}
