//! Simulation orchestrator for the Hearth town.
//!
//! Wires the other crates into one [`Simulation`]: the clock and
//! scheduler from core, agents and the action applier, world pools,
//! shops, and the decision queue. [`Simulation::run_tick`] drives one
//! full cycle; the binary in this crate runs it in a loop.

pub mod error;
pub mod setup;
pub mod simulation;
pub mod snapshot;

pub use error::EngineError;
pub use setup::{Town, standard_town};
pub use simulation::{Simulation, TickReport};
pub use snapshot::WorldSnapshot;
