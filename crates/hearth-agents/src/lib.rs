//! Agent state, relationships, and action application.
//!
//! An [`AgentState`] owns everything mutable about one resident: vitals,
//! inventory, location, and their side of every relationship. All
//! mutation goes through the operations defined here -- there is no raw
//! map access -- which is what makes the concurrency and invariant story
//! enforceable. Agents refer to each other by [`AgentId`] through the
//! [`AgentRegistry`], never by direct reference.
//!
//! [`AgentId`]: hearth_types::AgentId

pub mod agent;
pub mod apply;
pub mod error;
pub mod registry;
pub mod relationship;

pub use agent::{AgentState, Relocation, TimePassed};
pub use apply::{AppliedAction, WorldRefs, apply_decision};
pub use error::AgentError;
pub use registry::AgentRegistry;
pub use relationship::{Relationship, RelationshipGraph};
