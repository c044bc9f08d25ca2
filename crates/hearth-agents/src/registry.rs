//! The authoritative collection of agents, keyed by ID.
//!
//! Dead agents stay in the registry so late references resolve to a
//! proper [`AgentError::Dead`] rather than a confusing not-found.

use std::collections::BTreeMap;

use hearth_types::{AgentId, Place};

use crate::agent::AgentState;
use crate::error::AgentError;

/// All residents, alive and dead.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgentRegistry {
    agents: BTreeMap<AgentId, AgentState>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
        }
    }

    /// Add an agent, returning its ID. Replaces any previous entry with
    /// the same ID (IDs are v7 UUIDs, so this only happens on restore).
    pub fn insert(&mut self, agent: AgentState) -> AgentId {
        let id = agent.id;
        self.agents.insert(id, agent);
        id
    }

    /// Look up an agent.
    pub fn get(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.get(&id)
    }

    /// Look up an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentState> {
        self.agents.get_mut(&id)
    }

    /// Look up an agent, failing loudly on a stale reference.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AgentNotFound`] for unknown IDs.
    pub fn require(&self, id: AgentId) -> Result<&AgentState, AgentError> {
        self.agents
            .get(&id)
            .ok_or(AgentError::AgentNotFound { agent: id })
    }

    /// Mutable variant of [`Self::require`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AgentNotFound`] for unknown IDs.
    pub fn require_mut(&mut self, id: AgentId) -> Result<&mut AgentState, AgentError> {
        self.agents
            .get_mut(&id)
            .ok_or(AgentError::AgentNotFound { agent: id })
    }

    /// Remove an agent entirely (restore paths only; death keeps the record).
    pub fn remove(&mut self, id: AgentId) -> Option<AgentState> {
        self.agents.remove(&id)
    }

    /// All agent IDs, in stable order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    /// IDs of living agents, in stable order.
    pub fn living_ids(&self) -> Vec<AgentId> {
        self.agents
            .values()
            .filter(|a| a.is_alive())
            .map(|a| a.id)
            .collect()
    }

    /// Living agents at a place, excluding `except`.
    pub fn living_at(&self, place: Place, except: AgentId) -> Vec<&AgentState> {
        self.agents
            .values()
            .filter(|a| a.is_alive() && a.place() == place && a.id != except)
            .collect()
    }

    /// Iterate over all agents.
    pub fn iter(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.values()
    }

    /// Iterate mutably over all agents.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentState> {
        self.agents.values_mut()
    }

    /// Number of agents on record (including the dead).
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
