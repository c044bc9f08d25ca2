//! Explicitly constructed, explicitly passed simulation context.

use hearth_events::EventBus;

use crate::config::SimConfig;

/// The services every part of the simulation needs: the validated
/// configuration and the event bus. Built once at startup and passed
/// down by reference or clone -- never a global.
#[derive(Debug, Clone)]
pub struct SimContext {
    /// The validated run configuration.
    pub config: SimConfig,
    /// The broadcast bus for simulation events.
    pub bus: EventBus,
}

impl SimContext {
    /// Build a context around a validated config, with a fresh bus.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            bus: EventBus::default(),
        }
    }

    /// Build a context sharing an existing bus (tests that subscribe
    /// before construction).
    pub const fn with_bus(config: SimConfig, bus: EventBus) -> Self {
        Self { config, bus }
    }
}
