//! Production sites and probabilistic yields for the Hearth simulation.
//!
//! A production site (the mine, a fishing spot) owns a [`ResourcePool`]: a
//! depletable, periodically replenished multiset of item kinds. Which kind a
//! working agent obtains is a weighted random draw over the kinds that still
//! have units left. Pools are the one point of true contention between
//! agents, so the shared handle ([`SharedResourcePool`]) performs every draw
//! inside a single critical section -- no two agents can be granted the same
//! unit.

pub mod error;
pub mod resource;
pub mod shared;
pub mod weighted;

pub use error::WorldError;
pub use resource::{KindState, ResourcePool};
pub use shared::SharedResourcePool;
pub use weighted::WeightedPool;
