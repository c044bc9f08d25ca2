//! Aggregate world state for persistence.
//!
//! This is the persistence *contract*: everything needed to reconstruct
//! a simulation mid-run, serializable as one value. Where it is written
//! (a file, a database row) is the caller's business.

use serde::{Deserialize, Serialize};

use hearth_agents::AgentRegistry;
use hearth_core::GameClock;
use hearth_ledger::Shop;
use hearth_world::ResourcePool;

/// A complete copy of mutable world state at one instant.
///
/// In-flight decision requests are deliberately absent: a restore starts
/// with a quiet queue, and agents simply become eligible again on the
/// next tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Game time.
    pub clock: GameClock,
    /// All residents, alive and dead.
    pub agents: AgentRegistry,
    /// Every site's pool state.
    pub sites: Vec<ResourcePool>,
    /// Every shop's stock and till.
    pub shops: Vec<Shop>,
}
