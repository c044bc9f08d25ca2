//! Directed relationship records and their event-driven updates.
//!
//! A [`Relationship`] is one direction of an agent pair: A's record of B
//! may differ from B's record of A, and only ever changes through
//! [`RelationshipGraph::apply_event`] on A's own graph. Symmetric events
//! are applied once per direction by the caller; because later events
//! compound differently per side, the two directions drift apart over
//! time even for "symmetric" interactions.
//!
//! The derived [`RelationshipTier`] is always computed from the current
//! axes and never stored, so it cannot drift out of sync.

use std::collections::{BTreeMap, VecDeque};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hearth_types::{AgentId, RelationEventKind, RelationshipTier};

/// Upper clamp for both axes.
const AXIS_MAX: Decimal = Decimal::ONE;

/// Lower clamp for both axes.
const AXIS_MIN: Decimal = Decimal::NEGATIVE_ONE;

/// Cap on remembered interactions per relationship; oldest evicted first.
const MAX_MEMORIES: usize = 20;

/// One remembered significant interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMemory {
    /// What kind of interaction it was.
    pub kind: RelationEventKind,
    /// The magnitude it was applied with.
    pub magnitude: Decimal,
    /// Game time of the interaction, in game-minutes.
    pub at_minutes: u64,
}

/// One direction of a relationship between two agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    trust: Decimal,
    affection: Decimal,
    interaction_count: u64,
    last_interaction: u64,
    memories: VecDeque<RelationMemory>,
}

impl Relationship {
    fn new() -> Self {
        Self {
            trust: Decimal::ZERO,
            affection: Decimal::ZERO,
            interaction_count: 0,
            last_interaction: 0,
            memories: VecDeque::new(),
        }
    }

    /// Trust axis in `[-1, 1]`.
    pub const fn trust(&self) -> Decimal {
        self.trust
    }

    /// Affection axis in `[-1, 1]`.
    pub const fn affection(&self) -> Decimal {
        self.affection
    }

    /// How many interactions have been recorded.
    pub const fn interaction_count(&self) -> u64 {
        self.interaction_count
    }

    /// Game time of the most recent interaction.
    pub const fn last_interaction(&self) -> u64 {
        self.last_interaction
    }

    /// The remembered interactions, oldest first.
    pub const fn memories(&self) -> &VecDeque<RelationMemory> {
        &self.memories
    }

    /// Derive the classification from the current axes.
    pub fn tier(&self) -> RelationshipTier {
        let enemy_trust = Decimal::new(-3, 1); // -0.3
        let enemy_affection = Decimal::new(-4, 1); // -0.4
        let close = Decimal::new(6, 1); // 0.6
        let friendly = Decimal::new(3, 1); // 0.3

        if self.trust < enemy_trust || self.affection < enemy_affection {
            RelationshipTier::Enemy
        } else if self.trust > close && self.affection > close {
            RelationshipTier::CloseFriend
        } else if self.affection > friendly {
            RelationshipTier::Friend
        } else if self.interaction_count > 0 {
            RelationshipTier::Acquaintance
        } else {
            RelationshipTier::Stranger
        }
    }

    /// Apply one event's deltas, clamp, remember, and bump counters.
    fn apply(&mut self, kind: RelationEventKind, magnitude: Decimal, now: u64) {
        let half = magnitude.saturating_mul(Decimal::new(5, 1));
        let quarter = magnitude.saturating_mul(Decimal::new(25, 2));
        let double = magnitude.saturating_mul(Decimal::TWO);

        let (trust_delta, affection_delta) = match kind {
            RelationEventKind::Cooperation => (magnitude, half),
            RelationEventKind::Gift => (quarter, magnitude),
            RelationEventKind::FriendlyChat => (quarter, half),
            RelationEventKind::Insult => (-half, -magnitude),
            RelationEventKind::Betrayal => (-double, -magnitude),
        };

        self.trust = clamp_axis(self.trust.saturating_add(trust_delta));
        self.affection = clamp_axis(self.affection.saturating_add(affection_delta));

        if self.memories.len() >= MAX_MEMORIES {
            self.memories.pop_front();
        }
        self.memories.push_back(RelationMemory {
            kind,
            magnitude,
            at_minutes: now,
        });
        self.interaction_count = self.interaction_count.saturating_add(1);
        self.last_interaction = now;
    }

    /// Drift both axes one step toward zero after long inactivity.
    fn decay(&mut self, step: Decimal) {
        self.trust = toward_zero(self.trust, step);
        self.affection = toward_zero(self.affection, step);
    }
}

/// Clamp an axis value into `[-1, 1]`.
fn clamp_axis(value: Decimal) -> Decimal {
    value.min(AXIS_MAX).max(AXIS_MIN)
}

/// Move `value` toward zero by `step`, never crossing it.
fn toward_zero(value: Decimal, step: Decimal) -> Decimal {
    if value > Decimal::ZERO {
        value.saturating_sub(step).max(Decimal::ZERO)
    } else {
        value.saturating_add(step).min(Decimal::ZERO)
    }
}

/// One agent's side of all its relationships, keyed by the other agent's
/// ID. Records are created lazily on first interaction and never deleted
/// while the owning agent exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    relations: BTreeMap<AgentId, Relationship>,
}

impl RelationshipGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            relations: BTreeMap::new(),
        }
    }

    /// Apply an event toward `other`, creating the record on first
    /// contact. Returns the newly derived tier.
    ///
    /// Only this direction's record is touched; the caller applies the
    /// mirrored event on the other agent's graph when the interaction is
    /// symmetric.
    pub fn apply_event(
        &mut self,
        other: AgentId,
        kind: RelationEventKind,
        magnitude: Decimal,
        now: u64,
    ) -> RelationshipTier {
        let relation = self.relations.entry(other).or_insert_with(Relationship::new);
        relation.apply(kind, magnitude, now);
        relation.tier()
    }

    /// The record toward `other`, if any interaction has happened.
    pub fn get(&self, other: AgentId) -> Option<&Relationship> {
        self.relations.get(&other)
    }

    /// Derived tier toward `other` (`Stranger` when no record exists).
    pub fn tier(&self, other: AgentId) -> RelationshipTier {
        self.relations
            .get(&other)
            .map_or(RelationshipTier::Stranger, Relationship::tier)
    }

    /// Human-readable tier label toward `other`, for snapshots.
    pub fn tier_label(&self, other: AgentId) -> String {
        match self.tier(other) {
            RelationshipTier::Stranger => String::from("stranger"),
            RelationshipTier::Acquaintance => String::from("acquaintance"),
            RelationshipTier::Friend => String::from("friend"),
            RelationshipTier::CloseFriend => String::from("close friend"),
            RelationshipTier::Enemy => String::from("enemy"),
        }
    }

    /// Drift every record idle for at least `idle_minutes` one `step`
    /// toward zero on both axes.
    pub fn decay_inactive(&mut self, now: u64, idle_minutes: u64, step: Decimal) {
        for relation in self.relations.values_mut() {
            if now.saturating_sub(relation.last_interaction) >= idle_minutes {
                relation.decay(step);
            }
        }
    }

    /// Number of relationships on record.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Whether no relationship exists yet.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn magnitude() -> Decimal {
        Decimal::new(2, 1) // 0.2
    }

    #[test]
    fn first_event_creates_the_record_lazily() {
        let mut graph = RelationshipGraph::new();
        let other = AgentId::new();
        assert!(graph.get(other).is_none());
        assert_eq!(graph.tier(other), RelationshipTier::Stranger);

        let tier = graph.apply_event(other, RelationEventKind::FriendlyChat, magnitude(), 50);
        assert_eq!(tier, RelationshipTier::Acquaintance);
        let relation = graph.get(other).unwrap();
        assert_eq!(relation.interaction_count(), 1);
        assert_eq!(relation.last_interaction(), 50);
    }

    #[test]
    fn apply_event_never_touches_the_reverse_direction() {
        let a = AgentId::new();
        let b = AgentId::new();
        let mut graph_a = RelationshipGraph::new();
        let mut graph_b = RelationshipGraph::new();

        graph_a.apply_event(b, RelationEventKind::Gift, magnitude(), 10);

        assert!(graph_a.get(b).is_some());
        assert!(graph_b.get(a).is_none());

        // And the mirrored application is independent.
        graph_b.apply_event(a, RelationEventKind::Insult, magnitude(), 11);
        assert!(graph_a.get(b).unwrap().affection() > Decimal::ZERO);
        assert!(graph_b.get(a).unwrap().affection() < Decimal::ZERO);
    }

    #[test]
    fn axes_clamp_to_unit_interval() {
        let mut graph = RelationshipGraph::new();
        let other = AgentId::new();
        for now in 0..100 {
            graph.apply_event(other, RelationEventKind::Cooperation, Decimal::ONE, now);
        }
        let relation = graph.get(other).unwrap();
        assert_eq!(relation.trust(), Decimal::ONE);
        assert_eq!(relation.affection(), Decimal::ONE);

        for now in 100..200 {
            graph.apply_event(other, RelationEventKind::Betrayal, Decimal::ONE, now);
        }
        let relation = graph.get(other).unwrap();
        assert_eq!(relation.trust(), Decimal::NEGATIVE_ONE);
        assert_eq!(relation.affection(), Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn betrayal_turns_a_friend_into_an_enemy() {
        let mut graph = RelationshipGraph::new();
        let other = AgentId::new();
        for now in 0..5 {
            graph.apply_event(other, RelationEventKind::Cooperation, magnitude(), now);
        }
        assert_eq!(graph.tier(other), RelationshipTier::CloseFriend);

        let tier = graph.apply_event(other, RelationEventKind::Betrayal, Decimal::ONE, 6);
        assert_eq!(tier, RelationshipTier::Enemy);
    }

    #[test]
    fn memories_are_bounded_and_evict_oldest() {
        let mut graph = RelationshipGraph::new();
        let other = AgentId::new();
        for now in 0..30 {
            graph.apply_event(other, RelationEventKind::FriendlyChat, magnitude(), now);
        }
        let memories = graph.get(other).unwrap().memories();
        assert_eq!(memories.len(), 20);
        // The first ten interactions were evicted.
        assert_eq!(memories.front().map(|m| m.at_minutes), Some(10));
        assert_eq!(memories.back().map(|m| m.at_minutes), Some(29));
    }

    #[test]
    fn inactivity_decay_drifts_toward_zero_without_crossing() {
        let mut graph = RelationshipGraph::new();
        let other = AgentId::new();
        graph.apply_event(other, RelationEventKind::FriendlyChat, magnitude(), 0);
        let affection_before = graph.get(other).unwrap().affection();
        assert!(affection_before > Decimal::ZERO);

        // Not yet idle long enough: untouched.
        graph.decay_inactive(100, 500, Decimal::new(5, 2));
        assert_eq!(graph.get(other).unwrap().affection(), affection_before);

        // Idle long enough: repeated decay reaches exactly zero, never below.
        for _ in 0..10 {
            graph.decay_inactive(1000, 500, Decimal::new(5, 2));
        }
        assert_eq!(graph.get(other).unwrap().affection(), Decimal::ZERO);
        assert_eq!(graph.get(other).unwrap().trust(), Decimal::ZERO);
    }

    #[test]
    fn graph_roundtrip_serde() {
        let mut graph = RelationshipGraph::new();
        graph.apply_event(AgentId::new(), RelationEventKind::Gift, magnitude(), 7);
        let json = serde_json::to_string(&graph).unwrap();
        let back: RelationshipGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
    }
}
