//! Decision value objects exchanged with the reasoning provider.
//!
//! A [`DecisionRequest`] carries an immutable [`AgentSnapshot`] of
//! everything the provider needs to decide -- never a live reference into
//! world state. A [`Decision`] is the validated result: an action from the
//! closed set plus the typed parameters that action needs. Both are
//! short-lived values, created at dispatch time and discarded once the
//! action is applied or the request fails terminally.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{ActionType, DecisionKind, Emotion, ItemKind, Place, Priority};
use crate::ids::{AgentId, RequestId, ShopId, SiteId};

// ---------------------------------------------------------------------------
// Action parameters
// ---------------------------------------------------------------------------

/// Action-specific parameters carried by a [`Decision`].
///
/// Each variant corresponds to one [`ActionType`] and carries only the
/// fields that action needs. The validator maps provider output onto this
/// set and routes unknown tags to the fallback path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionParameters {
    /// Parameters for [`ActionType::Eat`].
    Eat {
        /// The item to consume from inventory.
        item: ItemKind,
    },
    /// Parameters for [`ActionType::Move`].
    Move {
        /// Where to go.
        destination: Place,
    },
    /// Parameters for [`ActionType::Mine`].
    Mine {
        /// The mine site to work.
        site: SiteId,
    },
    /// Parameters for [`ActionType::Fish`].
    Fish {
        /// The fishing spot to work.
        site: SiteId,
    },
    /// Parameters for [`ActionType::Sell`].
    Sell {
        /// The shop to sell to.
        shop: ShopId,
        /// The item being sold.
        item: ItemKind,
        /// How many units.
        quantity: u32,
    },
    /// Parameters for [`ActionType::Buy`].
    Buy {
        /// The shop to buy from.
        shop: ShopId,
        /// The item being bought.
        item: ItemKind,
        /// How many units.
        quantity: u32,
    },
    /// Parameters for [`ActionType::Talk`].
    Talk {
        /// The resident to talk to.
        target: AgentId,
        /// What is said (relayed to the renderer, not interpreted).
        message: String,
    },
    /// Parameters for [`ActionType::Idle`].
    Idle,
}

impl ActionParameters {
    /// The [`ActionType`] this parameter set belongs to.
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::Eat { .. } => ActionType::Eat,
            Self::Move { .. } => ActionType::Move,
            Self::Mine { .. } => ActionType::Mine,
            Self::Fish { .. } => ActionType::Fish,
            Self::Sell { .. } => ActionType::Sell,
            Self::Buy { .. } => ActionType::Buy,
            Self::Talk { .. } => ActionType::Talk,
            Self::Idle => ActionType::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// A validated decision ready for the action applier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The typed action parameters (the action type is derivable from them).
    pub parameters: ActionParameters,
    /// Free-text rationale from the provider; logged, never interpreted.
    pub rationale: Option<String>,
    /// Optional mood tag for the renderer.
    pub emotion: Option<Emotion>,
}

impl Decision {
    /// Convenience constructor for a bare idle decision.
    pub const fn idle() -> Self {
        Self {
            parameters: ActionParameters::Idle,
            rationale: None,
            emotion: None,
        }
    }

    /// The action type of this decision.
    pub const fn action_type(&self) -> ActionType {
        self.parameters.action_type()
    }
}

// ---------------------------------------------------------------------------
// Snapshot and request
// ---------------------------------------------------------------------------

/// Another resident visible from the snapshotted agent's place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearbyAgent {
    /// Who they are.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Human-readable relationship label (e.g. "friend", "stranger").
    pub relationship: String,
}

/// A production site the snapshotted agent knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownSite {
    /// The site.
    pub id: SiteId,
    /// Where it is. Work actions must target a site at the worker's place.
    pub place: Place,
}

/// An immutable copy of the inputs an agent needs to decide.
///
/// Built at dispatch time from live world state; after that the world may
/// move on freely while this snapshot sits in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// The deciding agent.
    pub agent_id: AgentId,
    /// Display name.
    pub name: String,
    /// Hunger at snapshot time, in `[0, 100]`.
    pub hunger: Decimal,
    /// Money at snapshot time.
    pub money: u32,
    /// Where the agent is.
    pub place: Place,
    /// Inventory counts at snapshot time.
    pub inventory: BTreeMap<ItemKind, u32>,
    /// Residents at the same place.
    pub nearby_agents: Vec<NearbyAgent>,
    /// Production sites the agent knows about.
    pub known_sites: Vec<KnownSite>,
    /// Shops the agent knows about.
    pub known_shops: Vec<ShopId>,
    /// Game time at snapshot, in game-minutes.
    pub game_minutes: u64,
}

/// A request for one decision, queued for dispatch to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Unique ID of this request.
    pub id: RequestId,
    /// The agent deciding.
    pub agent_id: AgentId,
    /// What kind of decision is wanted.
    pub kind: DecisionKind,
    /// Urgency tier used by the dispatch heap.
    pub priority: Priority,
    /// The frozen inputs for the decision.
    pub snapshot: AgentSnapshot,
    /// Wall-clock submission time.
    pub submitted_at: DateTime<Utc>,
}

impl DecisionRequest {
    /// Build a request around a snapshot, stamping id and submission time.
    pub fn new(kind: DecisionKind, priority: Priority, snapshot: AgentSnapshot) -> Self {
        Self {
            id: RequestId::new(),
            agent_id: snapshot.agent_id,
            kind,
            priority,
            snapshot,
            submitted_at: Utc::now(),
        }
    }
}
