//! Enumeration types for the Hearth town simulation.
//!
//! All of these are closed sets: the decision validator rejects anything a
//! provider emits that falls outside them, and the action applier matches
//! exhaustively so a new variant forces every call site to be revisited.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A kind of item that can sit in an inventory, a shop, or a resource pool.
///
/// Edibility and pricing are not encoded here -- they come from the
/// [`ItemCatalog`](crate::catalog::ItemCatalog), which is data fed into the
/// core rather than part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Baked bread, the staple food.
    Bread,
    /// Wild berries, a light snack.
    Berry,
    /// Fresh fish from the pier.
    Fish,
    /// Harvested wheat, an ingredient rather than a meal.
    Wheat,
    /// Copper ore from the town mine.
    CopperOre,
    /// Iron ore, rarer than copper.
    IronOre,
    /// A gemstone, the mine's rare find.
    Gemstone,
}

// ---------------------------------------------------------------------------
// Places
// ---------------------------------------------------------------------------

/// A place tag in the town. Agents are always at exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Place {
    /// An agent's own home.
    Home,
    /// The central town square.
    TownSquare,
    /// The market street with the shops.
    Market,
    /// The farm fields at the edge of town.
    Farm,
    /// The mine in the hills.
    Mine,
    /// The fishing pier on the lake.
    FishingPier,
    /// The tavern.
    Tavern,
    /// The forest around town.
    Forest,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The closed set of actions a decision can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Consume one unit of an edible item from inventory.
    Eat,
    /// Walk to another place.
    Move,
    /// Work the mine, drawing from its resource pool.
    Mine,
    /// Fish at a fishing spot, drawing from its resource pool.
    Fish,
    /// Sell items to a shop for money.
    Sell,
    /// Buy items from a shop.
    Buy,
    /// Talk to another resident, updating both relationships.
    Talk,
    /// Do nothing this round.
    Idle,
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// What kind of decision is being requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    /// Choose the agent's next action.
    NextAction,
    /// Reply to a conversation another agent started.
    ConversationReply,
    /// Cast a vote in a town event.
    Vote,
}

/// Urgency tier of a decision request.
///
/// Variant order is the priority order: later variants outrank earlier
/// ones, so the derived [`Ord`] drives the dispatch heap directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Routine next-action decisions.
    Routine,
    /// Conversation replies; someone is waiting.
    Conversation,
    /// The agent is starving -- decide before anything else.
    Starvation,
}

/// A mood tag a decision may carry; surfaced to the renderer, never
/// interpreted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Emotion {
    /// Content.
    Happy,
    /// Downcast.
    Sad,
    /// Irritated.
    Angry,
    /// Eager.
    Excited,
    /// No particular mood.
    Neutral,
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

/// Derived classification of a relationship.
///
/// Always computed from the current trust/affection axes, never stored,
/// so it cannot drift out of sync with the values that produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipTier {
    /// Never interacted, or nothing memorable yet.
    Stranger,
    /// Has interacted, no strong feelings either way.
    Acquaintance,
    /// Positive affection.
    Friend,
    /// High trust and affection.
    CloseFriend,
    /// Trust or affection has gone clearly negative.
    Enemy,
}

/// The kind of interaction event applied to a relationship.
///
/// Each kind maps to a signed delta profile on the trust and affection
/// axes; the magnitude scales it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationEventKind {
    /// Worked together on something.
    Cooperation,
    /// Gave a gift.
    Gift,
    /// A pleasant conversation.
    FriendlyChat,
    /// An insult or slight.
    Insult,
    /// A betrayal; hits trust hardest.
    Betrayal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_matches_urgency() {
        assert!(Priority::Starvation > Priority::Conversation);
        assert!(Priority::Conversation > Priority::Routine);
    }

    #[test]
    fn enums_roundtrip_serde() {
        let json = serde_json::to_string(&ActionType::Mine).ok();
        assert_eq!(json.as_deref(), Some("\"Mine\""));
        let back: Result<ActionType, _> = serde_json::from_str("\"Mine\"");
        assert_eq!(back.ok(), Some(ActionType::Mine));
    }

    #[test]
    fn place_roundtrip_serde() {
        let back: Result<Place, _> = serde_json::from_str("\"FishingPier\"");
        assert_eq!(back.ok(), Some(Place::FishingPier));
    }
}
