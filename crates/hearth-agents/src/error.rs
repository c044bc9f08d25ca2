//! Error types for agent state and action application.

use hearth_ledger::LedgerError;
use hearth_types::{AgentId, ItemKind, ShopId, SiteId};
use hearth_world::WorldError;

/// Errors from agent mutations and decision application.
///
/// All of these are local, recoverable failures returned to the caller of
/// the specific operation -- none unwind the tick loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// The agent is dead; terminal state, no further mutations apply.
    #[error("agent {agent} is dead")]
    Dead {
        /// The dead agent.
        agent: AgentId,
    },

    /// A referenced agent does not exist (stale reference).
    #[error("agent not found: {agent}")]
    AgentNotFound {
        /// The missing agent.
        agent: AgentId,
    },

    /// The item has no hunger-restore value.
    #[error("not edible: {item:?}")]
    NotEdible {
        /// The inedible item.
        item: ItemKind,
    },

    /// The agent cannot cover a cost.
    #[error("insufficient funds: need {required}, hold {held}")]
    InsufficientFunds {
        /// Amount required.
        required: u32,
        /// Amount held.
        held: u32,
    },

    /// An action targeted something nonsensical (self-talk, absent party).
    #[error("invalid target: {reason}")]
    InvalidTarget {
        /// Why the target is invalid.
        reason: String,
    },

    /// The action named a site the world does not have.
    #[error("unknown site: {site}")]
    UnknownSite {
        /// The missing site.
        site: SiteId,
    },

    /// The action named a shop the world does not have.
    #[error("unknown shop: {shop}")]
    UnknownShop {
        /// The missing shop.
        shop: ShopId,
    },

    /// The agent is not at the place the action requires.
    #[error("wrong place: action requires {required:?}")]
    WrongPlace {
        /// The place the action requires.
        required: hearth_types::Place,
    },

    /// The action named a site that sits at a different place.
    #[error("site {site} is at {place:?}, not workable from here")]
    SiteMismatch {
        /// The mismatched site.
        site: SiteId,
        /// Where that site actually is.
        place: hearth_types::Place,
    },

    /// An inventory or shop accounting failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A site or pool failure (depletion, misconfiguration).
    #[error(transparent)]
    World(#[from] WorldError),

    /// Checked arithmetic failed.
    #[error("arithmetic overflow in agent accounting")]
    ArithmeticOverflow,
}
