//! Shared type definitions for the Hearth town simulation.
//!
//! Every crate in the workspace speaks these types: strongly-typed IDs,
//! the closed enumerations (items, places, actions), the decision value
//! objects exchanged with the reasoning provider, and the item catalog
//! that parameterizes the economy.

pub mod actions;
pub mod catalog;
pub mod enums;
pub mod ids;

pub use actions::{
    ActionParameters, AgentSnapshot, Decision, DecisionRequest, KnownSite, NearbyAgent,
};
pub use catalog::{ItemCatalog, ItemSpec};
pub use enums::{
    ActionType, DecisionKind, Emotion, ItemKind, Place, Priority, RelationEventKind,
    RelationshipTier,
};
pub use ids::{AgentId, RequestId, ShopId, SiteId};
