//! Core simulation services: game time, decision scheduling, and
//! configuration.
//!
//! Everything here is deterministic and synchronous. The clock is the
//! single source of truth for game time; the scheduler decides who may
//! ask for a decision and when; the config is loaded once, validated
//! loudly, and passed by explicit [`SimContext`] -- there are no globals.

pub mod clock;
pub mod config;
pub mod context;
pub mod scheduler;

pub use clock::{ClockError, GameClock};
pub use config::{ConfigError, SimConfig};
pub use context::SimContext;
pub use scheduler::{AgentPhase, DecisionScheduler, SchedulerError};
