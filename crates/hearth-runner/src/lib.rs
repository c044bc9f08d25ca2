//! Decision dispatch: provider calls, response validation, fallback.
//!
//! The queue is the only async seam in the whole simulation. Everything
//! that enters it is an immutable [`DecisionRequest`]; everything that
//! leaves it is either a validated [`Decision`] or `None` for a
//! cancelled ticket. Provider failures never cross this boundary -- a
//! timed-out, malformed, or unreachable provider degrades to the
//! deterministic rule fallback, so the simulation can never stall on
//! the network.
//!
//! [`DecisionRequest`]: hearth_types::DecisionRequest
//! [`Decision`]: hearth_types::Decision

pub mod error;
pub mod fallback;
pub mod provider;
pub mod queue;
pub mod validate;

pub use error::RunnerError;
pub use fallback::{FallbackThresholds, rule_decision};
pub use provider::{HttpProvider, ReasoningProvider, RequestLog, ScriptedProvider};
pub use queue::{DecisionRequestQueue, DecisionTicket, QueueSettings};
pub use validate::parse_decision;
