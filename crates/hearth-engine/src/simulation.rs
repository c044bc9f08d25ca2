//! The tick loop: one struct that owns the whole world.
//!
//! Each tick runs the same fixed sequence: advance the clock, apply
//! periodic updates (hunger, pool refresh, relationship drift), dispatch
//! decision requests for every eligible agent, then await and apply the
//! decisions one at a time. Provider calls overlap freely inside the
//! queue; world mutation never does, so no action ever observes a
//! half-applied other action.

use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use hearth_agents::{
    AgentRegistry, AgentState, AppliedAction, WorldRefs, apply_decision,
};
use hearth_core::{DecisionScheduler, GameClock, SimConfig, SimContext};
use hearth_events::{EventBus, SimEvent};
use hearth_ledger::Shop;
use hearth_runner::{
    DecisionRequestQueue, FallbackThresholds, QueueSettings, ReasoningProvider,
};
use hearth_types::{
    ActionType, AgentId, AgentSnapshot, DecisionKind, DecisionRequest, ItemCatalog, KnownSite,
    NearbyAgent, Priority, ShopId, SiteId,
};
use hearth_world::SharedResourcePool;

use crate::error::EngineError;
use crate::setup;
use crate::snapshot::WorldSnapshot;

/// Hunger below this escalates a decision request to starvation priority.
const STARVATION_HUNGER: Decimal = Decimal::from_parts(25, 0, 0, false, 0);

/// What one tick did, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Game time after the tick, in game-minutes.
    pub minutes: u64,
    /// Decision requests dispatched this tick.
    pub dispatched: usize,
    /// Decisions applied successfully.
    pub applied: usize,
    /// Decisions that failed a precondition.
    pub failed: usize,
    /// Agents that starved this tick.
    pub deaths: usize,
}

/// The running simulation: world state plus the services that drive it.
pub struct Simulation {
    context: SimContext,
    clock: GameClock,
    registry: AgentRegistry,
    sites: BTreeMap<SiteId, SharedResourcePool>,
    shops: BTreeMap<ShopId, Shop>,
    catalog: ItemCatalog,
    scheduler: DecisionScheduler,
    queue: DecisionRequestQueue,
    /// Residents spoken to whose reply is still owed. Consumed on their
    /// next dispatch as a conversation-reply request.
    pending_replies: BTreeSet<AgentId>,
    rng: SmallRng,
}

impl Simulation {
    /// Build a simulation over the standard town.
    ///
    /// Must be called inside a tokio runtime; the decision queue spawns
    /// its dispatch loop on construction.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::World`] if town construction fails.
    pub fn new(config: SimConfig, provider: ReasoningProvider) -> Result<Self, EngineError> {
        let mut rng = SmallRng::seed_from_u64(config.world.seed);
        let town = setup::standard_town(&config, &mut rng)?;
        Ok(Self::from_town(config, town, provider))
    }

    /// Build a simulation over an existing town, for callers that need
    /// the town's IDs (scenario tests, custom layouts).
    ///
    /// Must be called inside a tokio runtime; the decision queue spawns
    /// its dispatch loop on construction.
    pub fn from_town(config: SimConfig, town: setup::Town, provider: ReasoningProvider) -> Self {
        let mut scheduler = DecisionScheduler::new(config.scheduler.decision_cooldown_minutes);
        for id in town.registry.ids() {
            scheduler.register(id);
        }

        let queue = DecisionRequestQueue::new(
            provider,
            town.catalog.clone(),
            FallbackThresholds::default(),
            QueueSettings::from(&config.provider),
        );

        info!(
            town = config.world.name,
            residents = town.registry.len(),
            sites = town.sites.len(),
            shops = town.shops.len(),
            "simulation built"
        );

        let rng = SmallRng::seed_from_u64(config.world.seed);
        Self {
            context: SimContext::new(config),
            clock: GameClock::new(),
            registry: town.registry,
            sites: town.sites,
            shops: town.shops,
            catalog: town.catalog,
            scheduler,
            queue,
            pending_replies: BTreeSet::new(),
            rng,
        }
    }

    /// Run one tick end to end.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on clock overflow, pool failures, or an
    /// illegal scheduler transition (a tick-loop bug).
    pub async fn run_tick(&mut self) -> Result<TickReport, EngineError> {
        let elapsed = self.context.config.world.minutes_per_tick;
        let now = self.clock.advance(elapsed)?;
        let mut report = TickReport {
            minutes: now,
            dispatched: 0,
            applied: 0,
            failed: 0,
            deaths: 0,
        };

        self.advance_vitals(elapsed, now, &mut report);
        self.refresh_pools(now)?;
        self.decay_relationships(now);

        let requests = self.build_requests(now);
        let mut tickets = Vec::with_capacity(requests.len());
        for request in requests {
            let agent = request.agent_id;
            self.scheduler.mark_dispatched(agent, now)?;
            report.dispatched = report.dispatched.saturating_add(1);
            tickets.push((agent, self.queue.enqueue(request)));
        }

        for (agent, ticket) in tickets {
            let Some(decision) = ticket.decision().await else {
                // Cancelled in flight; the scheduler tolerates this.
                self.scheduler.mark_idle(agent)?;
                continue;
            };
            self.scheduler.mark_acting(agent)?;

            let action = decision.action_type();
            let result = {
                let mut world = WorldRefs {
                    registry: &mut self.registry,
                    sites: &self.sites,
                    shops: &mut self.shops,
                    catalog: &self.catalog,
                };
                apply_decision(&mut world, agent, &decision, now, &mut self.rng)
            };

            match result {
                Ok(outcome) => {
                    report.applied = report.applied.saturating_add(1);
                    if let AppliedAction::Talked { target, .. } = &outcome {
                        self.pending_replies.insert(*target);
                    }
                    self.emit_outcome(agent, action, &outcome);
                }
                Err(err) => {
                    report.failed = report.failed.saturating_add(1);
                    debug!(agent = %agent, ?action, error = %err, "action failed");
                    self.context.bus.emit(SimEvent::ActionFailed {
                        agent,
                        action,
                        reason: err.to_string(),
                    });
                }
            }
            self.scheduler.mark_idle(agent)?;
        }

        debug!(
            minutes = report.minutes,
            dispatched = report.dispatched,
            applied = report.applied,
            failed = report.failed,
            deaths = report.deaths,
            "tick complete"
        );
        Ok(report)
    }

    /// Hunger decay and death detection for every resident.
    fn advance_vitals(&mut self, elapsed: u64, now: u64, report: &mut TickReport) {
        let decay = self.context.config.vitals.hunger_decay_per_minute;
        for id in self.registry.ids() {
            let Some(agent) = self.registry.get_mut(id) else {
                continue;
            };
            let passed = agent.advance_time(elapsed, decay);
            if passed.hunger_changed {
                self.context.bus.emit(SimEvent::HungerChanged {
                    agent: id,
                    hunger: passed.hunger,
                });
            }
            if passed.died {
                report.deaths = report.deaths.saturating_add(1);
                self.pending_replies.remove(&id);
                warn!(agent = %id, at_minutes = now, "resident starved");
                self.context.bus.emit(SimEvent::AgentDied {
                    agent: id,
                    at_minutes: now,
                });
                self.queue.cancel(id);
                self.scheduler.mark_dead(id);
            }
        }
    }

    fn refresh_pools(&self, now: u64) -> Result<(), EngineError> {
        for (site, pool) in &self.sites {
            let units_added = pool.refresh(now)?;
            if units_added > 0 {
                self.context.bus.emit(SimEvent::PoolRefreshed {
                    site: *site,
                    units_added,
                });
            }
        }
        Ok(())
    }

    fn decay_relationships(&mut self, now: u64) {
        let idle = self.context.config.relationships.decay_idle_minutes;
        let step = self.context.config.relationships.decay_step;
        for agent in self.registry.iter_mut() {
            agent.relationships.decay_inactive(now, idle, step);
        }
    }

    /// One request per eligible agent. Starvation outranks everything; a
    /// resident who owes a conversation reply is asked for one at
    /// elevated priority, and the owed reply survives a starvation tick.
    fn build_requests(&mut self, now: u64) -> Vec<DecisionRequest> {
        let eligible = self.scheduler.eligible_agents(now);
        let mut requests = Vec::with_capacity(eligible.len());
        for id in eligible {
            let Some(agent) = self.registry.get(id) else {
                continue;
            };
            let snapshot = self.snapshot_agent(agent, now);
            let (kind, priority) = if snapshot.hunger < STARVATION_HUNGER {
                (DecisionKind::NextAction, Priority::Starvation)
            } else if self.pending_replies.remove(&id) {
                (DecisionKind::ConversationReply, Priority::Conversation)
            } else {
                (DecisionKind::NextAction, Priority::Routine)
            };
            requests.push(DecisionRequest::new(kind, priority, snapshot));
        }
        requests
    }

    /// Freeze everything the provider needs to decide for one agent.
    fn snapshot_agent(&self, agent: &AgentState, now: u64) -> AgentSnapshot {
        let nearby_agents = self
            .registry
            .living_at(agent.place(), agent.id)
            .into_iter()
            .map(|other| NearbyAgent {
                id: other.id,
                name: other.name.clone(),
                relationship: agent.relationships.tier_label(other.id),
            })
            .collect();

        AgentSnapshot {
            agent_id: agent.id,
            name: agent.name.clone(),
            hunger: agent.hunger(),
            money: agent.money(),
            place: agent.place(),
            inventory: agent.inventory.to_counts(),
            nearby_agents,
            known_sites: self
                .sites
                .values()
                .map(|pool| KnownSite {
                    id: pool.site(),
                    place: pool.place(),
                })
                .collect(),
            known_shops: self.shops.keys().copied().collect(),
            game_minutes: now,
        }
    }

    /// Translate an applied action into bus events.
    fn emit_outcome(&self, agent: AgentId, action: ActionType, outcome: &AppliedAction) {
        self.context.bus.emit(SimEvent::DecisionApplied { agent, action });
        match outcome {
            AppliedAction::Ate { hunger, .. } => {
                self.context.bus.emit(SimEvent::HungerChanged {
                    agent,
                    hunger: *hunger,
                });
            }
            AppliedAction::Moved { from, to } => {
                self.context.bus.emit(SimEvent::AgentMoved {
                    agent,
                    from: *from,
                    to: *to,
                });
            }
            AppliedAction::Sold {
                shop,
                item,
                quantity,
                price,
            }
            | AppliedAction::Bought {
                shop,
                item,
                quantity,
                price,
            } => {
                self.context.bus.emit(SimEvent::ItemsTraded {
                    agent,
                    shop: *shop,
                    item: *item,
                    quantity: *quantity,
                    price: *price,
                });
            }
            AppliedAction::Talked { target, tier, .. } => {
                self.context.bus.emit(SimEvent::RelationshipChanged {
                    agent,
                    toward: *target,
                    tier: *tier,
                });
                if let Some(listener) = self.registry.get(*target) {
                    self.context.bus.emit(SimEvent::RelationshipChanged {
                        agent: *target,
                        toward: agent,
                        tier: listener.relationships.tier(agent),
                    });
                }
            }
            AppliedAction::StayedPut { .. }
            | AppliedAction::Mined { .. }
            | AppliedAction::Fished { .. }
            | AppliedAction::Idled => {}
        }
    }

    /// Capture the full mutable world state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::World`] if a pool lock is poisoned.
    pub fn snapshot(&self) -> Result<WorldSnapshot, EngineError> {
        let mut sites = Vec::with_capacity(self.sites.len());
        for pool in self.sites.values() {
            sites.push(pool.to_pool()?);
        }
        Ok(WorldSnapshot {
            clock: self.clock,
            agents: self.registry.clone(),
            sites,
            shops: self.shops.values().cloned().collect(),
        })
    }

    /// Replace the world state with a snapshot's.
    ///
    /// The scheduler is rebuilt from scratch: every living resident is
    /// idle and immediately eligible, dead ones stay dead. In-flight
    /// requests from before the restore are not carried over.
    pub fn restore(&mut self, snapshot: WorldSnapshot) {
        self.pending_replies.clear();
        self.clock = snapshot.clock;
        self.registry = snapshot.agents;
        self.sites = snapshot
            .sites
            .into_iter()
            .map(|pool| (pool.site(), SharedResourcePool::new(pool)))
            .collect();
        self.shops = snapshot
            .shops
            .into_iter()
            .map(|shop| (shop.id, shop))
            .collect();

        self.scheduler =
            DecisionScheduler::new(self.context.config.scheduler.decision_cooldown_minutes);
        for id in self.registry.ids() {
            self.scheduler.register(id);
            if !self.registry.get(id).is_some_and(AgentState::is_alive) {
                self.scheduler.mark_dead(id);
            }
        }
        info!(minutes = self.clock.minutes(), "world state restored");
    }

    /// The active configuration.
    pub const fn config(&self) -> &SimConfig {
        &self.context.config
    }

    /// Game time in game-minutes.
    pub const fn clock_minutes(&self) -> u64 {
        self.clock.minutes()
    }

    /// All residents.
    pub const fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Mutable resident access, for scenario setup and operator tools.
    pub const fn registry_mut(&mut self) -> &mut AgentRegistry {
        &mut self.registry
    }

    /// Production site pools.
    pub const fn sites(&self) -> &BTreeMap<SiteId, SharedResourcePool> {
        &self.sites
    }

    /// Shops.
    pub const fn shops(&self) -> &BTreeMap<ShopId, Shop> {
        &self.shops
    }

    /// The event bus; subscribe before ticking to observe everything.
    pub const fn bus(&self) -> &EventBus {
        &self.context.bus
    }

    /// Number of residents still alive.
    pub fn living_population(&self) -> usize {
        self.registry.living_ids().len()
    }
}
