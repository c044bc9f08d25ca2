//! Per-agent decision scheduling.
//!
//! Each agent cycles `Idle -> AwaitingDecision -> Acting -> Idle`. The
//! scheduler is the single gatekeeper for dispatch: an agent is eligible
//! only when idle, alive, and past its cooldown, and the cooldown is
//! stamped the moment it is dispatched -- so at most one request per
//! agent can ever be in flight, regardless of how slow the provider is.

use std::collections::BTreeMap;

use tracing::debug;

use hearth_types::AgentId;

/// Errors from scheduler transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The agent was never registered.
    #[error("agent {agent} is not registered with the scheduler")]
    Unregistered {
        /// The unknown agent.
        agent: AgentId,
    },

    /// The requested transition is not legal from the current phase.
    #[error("agent {agent} cannot move from {from:?} via this transition")]
    IllegalTransition {
        /// The agent in question.
        agent: AgentId,
        /// The phase it is in.
        from: AgentPhase,
    },

    /// The agent is dead and terminally ineligible.
    #[error("agent {agent} is dead and cannot be dispatched")]
    Dead {
        /// The dead agent.
        agent: AgentId,
    },
}

/// Where an agent is in its decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    /// No decision pending; may be dispatched once past cooldown.
    Idle,
    /// A request is in flight with the provider.
    AwaitingDecision,
    /// A decision is being applied.
    Acting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Schedule {
    phase: AgentPhase,
    next_eligible: u64,
    alive: bool,
}

/// The per-agent phase machine plus cooldown bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct DecisionScheduler {
    schedules: BTreeMap<AgentId, Schedule>,
    cooldown_minutes: u64,
}

impl DecisionScheduler {
    /// Create a scheduler with the given post-dispatch cooldown.
    pub const fn new(cooldown_minutes: u64) -> Self {
        Self {
            schedules: BTreeMap::new(),
            cooldown_minutes,
        }
    }

    /// Register an agent, idle and immediately eligible.
    pub fn register(&mut self, agent: AgentId) {
        self.schedules.insert(
            agent,
            Schedule {
                phase: AgentPhase::Idle,
                next_eligible: 0,
                alive: true,
            },
        );
    }

    /// Drop an agent entirely (restore paths only; death keeps the entry).
    pub fn remove(&mut self, agent: AgentId) {
        self.schedules.remove(&agent);
    }

    /// The agent's current phase, if registered.
    pub fn phase(&self, agent: AgentId) -> Option<AgentPhase> {
        self.schedules.get(&agent).map(|s| s.phase)
    }

    /// Whether the agent may be dispatched right now.
    pub fn is_eligible(&self, agent: AgentId, now: u64) -> bool {
        self.schedules.get(&agent).is_some_and(|s| {
            s.alive && s.phase == AgentPhase::Idle && now >= s.next_eligible
        })
    }

    /// All agents eligible for dispatch at `now`, in stable order.
    pub fn eligible_agents(&self, now: u64) -> Vec<AgentId> {
        self.schedules
            .iter()
            .filter(|(_, s)| s.alive && s.phase == AgentPhase::Idle && now >= s.next_eligible)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Move an idle agent to `AwaitingDecision`, stamping its cooldown
    /// immediately so a re-dispatch in the same window is impossible.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Unregistered`], [`SchedulerError::Dead`], or
    /// [`SchedulerError::IllegalTransition`] when not idle.
    pub fn mark_dispatched(&mut self, agent: AgentId, now: u64) -> Result<(), SchedulerError> {
        let schedule = self
            .schedules
            .get_mut(&agent)
            .ok_or(SchedulerError::Unregistered { agent })?;
        if !schedule.alive {
            return Err(SchedulerError::Dead { agent });
        }
        if schedule.phase != AgentPhase::Idle {
            return Err(SchedulerError::IllegalTransition {
                agent,
                from: schedule.phase,
            });
        }
        schedule.phase = AgentPhase::AwaitingDecision;
        schedule.next_eligible = now.saturating_add(self.cooldown_minutes);
        Ok(())
    }

    /// Move a dispatched agent to `Acting`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Unregistered`] or
    /// [`SchedulerError::IllegalTransition`] when not awaiting a decision.
    pub fn mark_acting(&mut self, agent: AgentId) -> Result<(), SchedulerError> {
        let schedule = self
            .schedules
            .get_mut(&agent)
            .ok_or(SchedulerError::Unregistered { agent })?;
        if schedule.phase != AgentPhase::AwaitingDecision {
            return Err(SchedulerError::IllegalTransition {
                agent,
                from: schedule.phase,
            });
        }
        schedule.phase = AgentPhase::Acting;
        Ok(())
    }

    /// Return an agent to `Idle` from any phase. Legal from `Acting`
    /// (cycle complete) and from `AwaitingDecision` (cancelled or failed
    /// request); a no-op for dead agents so late completions cannot error
    /// the tick loop.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Unregistered`] for unknown agents.
    pub fn mark_idle(&mut self, agent: AgentId) -> Result<(), SchedulerError> {
        let schedule = self
            .schedules
            .get_mut(&agent)
            .ok_or(SchedulerError::Unregistered { agent })?;
        if schedule.alive {
            schedule.phase = AgentPhase::Idle;
        }
        Ok(())
    }

    /// Mark an agent dead: terminally ineligible, phase frozen at `Idle`.
    /// Idempotent; unknown agents are ignored (death may race removal).
    pub fn mark_dead(&mut self, agent: AgentId) {
        if let Some(schedule) = self.schedules.get_mut(&agent) {
            schedule.alive = false;
            schedule.phase = AgentPhase::Idle;
            debug!(agent = %agent, "scheduler entry marked dead");
        }
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    /// Whether no agent is registered.
    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scheduler_with_one() -> (DecisionScheduler, AgentId) {
        let mut scheduler = DecisionScheduler::new(30);
        let agent = AgentId::new();
        scheduler.register(agent);
        (scheduler, agent)
    }

    #[test]
    fn fresh_agents_are_immediately_eligible() {
        let (scheduler, agent) = scheduler_with_one();
        assert!(scheduler.is_eligible(agent, 0));
        assert_eq!(scheduler.eligible_agents(0), vec![agent]);
    }

    #[test]
    fn dispatch_stamps_cooldown_immediately() {
        let (mut scheduler, agent) = scheduler_with_one();
        scheduler.mark_dispatched(agent, 100).unwrap();

        // In flight: not eligible, and a second dispatch is illegal.
        assert!(!scheduler.is_eligible(agent, 100));
        assert_eq!(
            scheduler.mark_dispatched(agent, 100),
            Err(SchedulerError::IllegalTransition {
                agent,
                from: AgentPhase::AwaitingDecision,
            })
        );

        // Complete the cycle; still cooling down until minute 130.
        scheduler.mark_acting(agent).unwrap();
        scheduler.mark_idle(agent).unwrap();
        assert!(!scheduler.is_eligible(agent, 129));
        assert!(scheduler.is_eligible(agent, 130));
    }

    #[test]
    fn at_most_one_in_flight_request_per_agent() {
        let (mut scheduler, agent) = scheduler_with_one();
        scheduler.mark_dispatched(agent, 0).unwrap();
        scheduler.mark_acting(agent).unwrap();

        // Acting is still not dispatchable.
        assert!(matches!(
            scheduler.mark_dispatched(agent, 0),
            Err(SchedulerError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn cancelled_requests_return_to_idle_without_acting() {
        let (mut scheduler, agent) = scheduler_with_one();
        scheduler.mark_dispatched(agent, 0).unwrap();
        scheduler.mark_idle(agent).unwrap();
        assert_eq!(scheduler.phase(agent), Some(AgentPhase::Idle));
        // Cooldown from the dispatch still applies.
        assert!(!scheduler.is_eligible(agent, 29));
        assert!(scheduler.is_eligible(agent, 30));
    }

    #[test]
    fn death_is_terminal() {
        let (mut scheduler, agent) = scheduler_with_one();
        scheduler.mark_dead(agent);

        assert!(!scheduler.is_eligible(agent, 10_000));
        assert_eq!(
            scheduler.mark_dispatched(agent, 10_000),
            Err(SchedulerError::Dead { agent })
        );
        // A late completion from a cancelled request is tolerated.
        scheduler.mark_idle(agent).unwrap();
        assert!(!scheduler.is_eligible(agent, 10_000));
        // Idempotent.
        scheduler.mark_dead(agent);
    }

    #[test]
    fn unknown_agents_are_loud() {
        let mut scheduler = DecisionScheduler::new(30);
        let ghost = AgentId::new();
        assert_eq!(
            scheduler.mark_dispatched(ghost, 0),
            Err(SchedulerError::Unregistered { agent: ghost })
        );
        assert!(!scheduler.is_eligible(ghost, 0));
    }
}
