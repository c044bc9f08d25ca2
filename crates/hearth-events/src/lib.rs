//! Typed simulation events and the broadcast bus.
//!
//! The core pushes [`SimEvent`] values onto an [`EventBus`] for external
//! collaborators (renderer, UI, persistence). Emission never blocks and
//! never fails the emitting operation: a bus with no subscribers simply
//! drops events. The core never pulls from or waits on a subscriber.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use hearth_types::{
    ActionType, AgentId, ItemKind, Place, RelationshipTier, ShopId, SiteId,
};

/// Default channel capacity when none is specified.
const DEFAULT_CAPACITY: usize = 256;

/// An event emitted by the core as world state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// An agent moved between places.
    AgentMoved {
        /// Who moved.
        agent: AgentId,
        /// Where they were.
        from: Place,
        /// Where they are now.
        to: Place,
    },
    /// An agent's hunger changed (decay or eating).
    HungerChanged {
        /// Whose hunger changed.
        agent: AgentId,
        /// The new hunger value in `[0, 100]`.
        hunger: Decimal,
    },
    /// A validated decision was applied successfully.
    DecisionApplied {
        /// The acting agent.
        agent: AgentId,
        /// The action that was applied.
        action: ActionType,
    },
    /// A decision failed a precondition and was rolled up as a unit.
    ActionFailed {
        /// The acting agent.
        agent: AgentId,
        /// The action that failed.
        action: ActionType,
        /// Human-readable reason for the failure.
        reason: String,
    },
    /// An agent starved; this is emitted exactly once per agent.
    AgentDied {
        /// Who died.
        agent: AgentId,
        /// Game time of death, in game-minutes.
        at_minutes: u64,
    },
    /// A relationship record changed after an interaction.
    RelationshipChanged {
        /// The agent whose record changed (the perspective holder).
        agent: AgentId,
        /// The other party.
        toward: AgentId,
        /// The newly derived classification.
        tier: RelationshipTier,
    },
    /// A resource pool replenished at least one unit.
    PoolRefreshed {
        /// The site that refreshed.
        site: SiteId,
        /// Total units added across kinds.
        units_added: u32,
    },
    /// Items changed hands at a shop.
    ItemsTraded {
        /// The agent side of the trade.
        agent: AgentId,
        /// The shop side of the trade.
        shop: ShopId,
        /// The item traded.
        item: ItemKind,
        /// Units moved.
        quantity: u32,
        /// Money moved (positive; direction given by the action).
        price: u32,
    },
}

/// A non-blocking publish/subscribe bus for [`SimEvent`].
///
/// Wraps a tokio broadcast channel. Cloning the bus clones the sender;
/// all clones feed the same subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SimEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event. Never blocks; an event with no subscribers is dropped.
    pub fn emit(&self, event: SimEvent) {
        // send() errors only when there are no receivers, which is fine.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
