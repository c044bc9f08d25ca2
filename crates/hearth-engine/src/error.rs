//! The engine's aggregate error type.

use hearth_agents::AgentError;
use hearth_core::{ClockError, ConfigError, SchedulerError};
use hearth_ledger::LedgerError;
use hearth_world::WorldError;

/// Anything that can fail while building or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Game clock failure.
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Agent state failure outside the apply path (which reports its own).
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// World state failure.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Inventory or shop bookkeeping failure during setup.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Decision scheduler failure; indicates a tick-loop bug, not a
    /// runtime condition.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
