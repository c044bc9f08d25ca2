//! Error types for sites and pools.

use hearth_types::ItemKind;

/// Errors from resource pools and weighted draws.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The requested kind (or the whole site, when `kind` is `None`) has no
    /// units left until the next refresh.
    #[error("depleted: {}", kind.map_or_else(|| "site has nothing left".to_owned(), |k| format!("{k:?} exhausted")))]
    Depleted {
        /// The exhausted kind, or `None` when the whole site is empty.
        kind: Option<ItemKind>,
    },

    /// A draw was attempted on a pool with no entries at all.
    ///
    /// This is a configuration bug, caught loudly at startup validation; it
    /// should never surface from a validated world.
    #[error("empty pool: no entries were ever added")]
    EmptyPool,

    /// An entry was added with weight zero.
    #[error("zero weight for {item}")]
    ZeroWeight {
        /// Description of the offending entry.
        item: String,
    },

    /// The site configuration is invalid (checked at construction).
    #[error("invalid site configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The pool does not track this kind at all.
    #[error("unknown kind at this site: {kind:?}")]
    UnknownKind {
        /// The kind that was requested.
        kind: ItemKind,
    },

    /// Checked arithmetic failed.
    #[error("arithmetic overflow in pool accounting")]
    ArithmeticOverflow,

    /// The shared pool mutex was poisoned by a panicking holder.
    #[error("pool lock poisoned")]
    LockPoisoned,
}
