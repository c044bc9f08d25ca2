//! Per-agent mutable state and its pure mutation operations.
//!
//! Invariants enforced here:
//! - `hunger` stays in `[0, 100]`; `money` is unsigned and can never go
//!   negative; inventory counts are validated by the ledger.
//! - Death is a one-way transition taken exactly once, when hunger hits
//!   the floor. A dead agent keeps its record but ignores all further
//!   periodic updates and mutations.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hearth_ledger::InventoryLedger;
use hearth_types::{ActionType, AgentId, ItemCatalog, ItemKind, Place};

use crate::error::AgentError;
use crate::relationship::RelationshipGraph;

/// Hunger ceiling.
const HUNGER_MAX: u32 = 100;

/// Youngest possible starting age in years.
const SPAWN_AGE_MIN_YEARS: u64 = 18;

/// Oldest possible starting age in years.
const SPAWN_AGE_MAX_YEARS: u64 = 25;

/// Result of one periodic time advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePassed {
    /// Hunger after the advance.
    pub hunger: Decimal,
    /// Whether hunger actually changed.
    pub hunger_changed: bool,
    /// Whether this advance killed the agent (true exactly once, ever).
    pub died: bool,
}

/// Outcome of a relocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// The agent was already there. A successful no-op, not an error --
    /// redundant moves are deliberately observable.
    AlreadyThere {
        /// The place in question.
        place: Place,
    },
    /// The agent moved.
    Moved {
        /// Where they were.
        from: Place,
        /// Where they are now.
        to: Place,
    },
}

/// All mutable state for one resident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// The agent's identity.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    hunger: Decimal,
    money: u32,
    age_minutes: u64,
    place: Place,
    current_action: Option<ActionType>,
    is_alive: bool,
    /// Personal inventory.
    pub inventory: InventoryLedger,
    /// This agent's side of every relationship it has.
    pub relationships: RelationshipGraph,
}

impl AgentState {
    /// Spawn a new resident: full hunger, fixed starting money, randomized
    /// age between 18 and 25 years.
    pub fn spawn<R: Rng + ?Sized>(
        name: String,
        place: Place,
        starting_money: u32,
        minutes_per_year: u64,
        rng: &mut R,
    ) -> Self {
        let age_years = rng.random_range(SPAWN_AGE_MIN_YEARS..=SPAWN_AGE_MAX_YEARS);
        Self {
            id: AgentId::new(),
            name,
            hunger: Decimal::from(HUNGER_MAX),
            money: starting_money,
            age_minutes: age_years.saturating_mul(minutes_per_year),
            place,
            current_action: None,
            is_alive: true,
            inventory: InventoryLedger::new(),
            relationships: RelationshipGraph::new(),
        }
    }

    /// Current hunger in `[0, 100]`.
    pub const fn hunger(&self) -> Decimal {
        self.hunger
    }

    /// Current money.
    pub const fn money(&self) -> u32 {
        self.money
    }

    /// Age in game-minutes.
    pub const fn age_minutes(&self) -> u64 {
        self.age_minutes
    }

    /// Age in years for the given calendar.
    pub fn age_years(&self, minutes_per_year: u64) -> Decimal {
        if minutes_per_year == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.age_minutes) / Decimal::from(minutes_per_year)
    }

    /// Where the agent is.
    pub const fn place(&self) -> Place {
        self.place
    }

    /// Whether the agent is alive.
    pub const fn is_alive(&self) -> bool {
        self.is_alive
    }

    /// The action currently being applied, if any. A `Some` here means
    /// the agent is not eligible for a new decision.
    pub const fn current_action(&self) -> Option<ActionType> {
        self.current_action
    }

    /// Mark an action as in progress.
    pub const fn begin_action(&mut self, action: ActionType) {
        self.current_action = Some(action);
    }

    /// Clear the in-progress action, returning the agent to idle.
    pub const fn finish_action(&mut self) {
        self.current_action = None;
    }

    /// Advance this agent's vitals by `elapsed_minutes` of game time.
    ///
    /// Hunger decays by `decay_per_minute x elapsed`, floored at 0; age
    /// accrues. Reaching the hunger floor kills the agent -- a one-way
    /// transition reported via [`TimePassed::died`] so the caller can emit
    /// the terminal signal. Dead agents are untouched and report no change.
    pub fn advance_time(&mut self, elapsed_minutes: u64, decay_per_minute: Decimal) -> TimePassed {
        if !self.is_alive {
            return TimePassed {
                hunger: self.hunger,
                hunger_changed: false,
                died: false,
            };
        }

        self.age_minutes = self.age_minutes.saturating_add(elapsed_minutes);

        let decay = decay_per_minute.saturating_mul(Decimal::from(elapsed_minutes));
        let before = self.hunger;
        self.hunger = self.hunger.saturating_sub(decay).max(Decimal::ZERO);

        let died = self.hunger.is_zero();
        if died {
            self.is_alive = false;
            self.current_action = None;
        }

        TimePassed {
            hunger: self.hunger,
            hunger_changed: self.hunger != before,
            died,
        }
    }

    /// Eat one unit of `item`, restoring hunger by its catalog value,
    /// capped at 100.
    ///
    /// # Errors
    ///
    /// [`AgentError::Dead`] for dead agents, [`AgentError::NotEdible`] for
    /// items with no restore value, or the ledger's insufficiency error if
    /// the item is not held. Nothing is consumed on failure.
    pub fn eat(&mut self, item: ItemKind, catalog: &ItemCatalog) -> Result<Decimal, AgentError> {
        if !self.is_alive {
            return Err(AgentError::Dead { agent: self.id });
        }
        let restore = catalog
            .restore(item)
            .ok_or(AgentError::NotEdible { item })?;
        self.inventory.remove(item, 1)?;
        self.hunger = self
            .hunger
            .saturating_add(restore)
            .min(Decimal::from(HUNGER_MAX));
        Ok(self.hunger)
    }

    /// Move to `destination`.
    ///
    /// Moving to the current place is a successful no-op, reported as
    /// [`Relocation::AlreadyThere`] -- a quirk of the source material kept
    /// deliberately observable.
    ///
    /// # Errors
    ///
    /// [`AgentError::Dead`] for dead agents.
    pub fn relocate(&mut self, destination: Place) -> Result<Relocation, AgentError> {
        if !self.is_alive {
            return Err(AgentError::Dead { agent: self.id });
        }
        if self.place == destination {
            return Ok(Relocation::AlreadyThere { place: destination });
        }
        let from = self.place;
        self.place = destination;
        Ok(Relocation::Moved {
            from,
            to: destination,
        })
    }

    /// Credit money.
    ///
    /// # Errors
    ///
    /// [`AgentError::ArithmeticOverflow`] if the balance would overflow.
    pub fn earn(&mut self, amount: u32) -> Result<u32, AgentError> {
        self.money = self
            .money
            .checked_add(amount)
            .ok_or(AgentError::ArithmeticOverflow)?;
        Ok(self.money)
    }

    /// Debit money.
    ///
    /// # Errors
    ///
    /// [`AgentError::InsufficientFunds`] if the balance cannot cover the
    /// amount; the balance is untouched in that case.
    pub fn spend(&mut self, amount: u32) -> Result<u32, AgentError> {
        self.money = self
            .money
            .checked_sub(amount)
            .ok_or(AgentError::InsufficientFunds {
                required: amount,
                held: self.money,
            })?;
        Ok(self.money)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    const MINUTES_PER_YEAR: u64 = 525_600;

    fn mara() -> AgentState {
        let mut rng = SmallRng::seed_from_u64(11);
        AgentState::spawn(
            String::from("Mara"),
            Place::Home,
            100,
            MINUTES_PER_YEAR,
            &mut rng,
        )
    }

    #[test]
    fn spawn_age_is_between_18_and_25() {
        for seed in 0..50 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let agent = AgentState::spawn(
                String::from("A"),
                Place::Home,
                100,
                MINUTES_PER_YEAR,
                &mut rng,
            );
            let years = agent.age_years(MINUTES_PER_YEAR);
            assert!(years >= Decimal::from(18));
            assert!(years <= Decimal::from(25));
        }
    }

    #[test]
    fn hunger_decays_and_floors_at_zero() {
        let mut agent = mara();
        let half = Decimal::new(5, 1); // 0.5 per minute

        let passed = agent.advance_time(100, half);
        assert_eq!(passed.hunger, Decimal::from(50));
        assert!(passed.hunger_changed);
        assert!(!passed.died);

        // 200 more minutes would take hunger to -50; it floors at 0.
        let passed = agent.advance_time(200, half);
        assert_eq!(passed.hunger, Decimal::ZERO);
        assert!(passed.died);
        assert!(!agent.is_alive());
    }

    #[test]
    fn death_fires_exactly_once_and_updates_stop() {
        let mut agent = mara();
        let rate = Decimal::new(5, 1);

        let passed = agent.advance_time(200, rate);
        assert!(passed.died);
        let age_at_death = agent.age_minutes();

        // Further advances report no change and no second death.
        let passed = agent.advance_time(500, rate);
        assert!(!passed.died);
        assert!(!passed.hunger_changed);
        assert_eq!(agent.age_minutes(), age_at_death);
    }

    #[test]
    fn eat_restores_capped_at_one_hundred() {
        let mut agent = mara();
        let catalog = ItemCatalog::standard();
        agent.inventory.add(ItemKind::Bread, 2).unwrap();

        // Barely hungry: restore caps at 100.
        agent.advance_time(10, Decimal::new(5, 1)); // hunger 95
        let hunger = agent.eat(ItemKind::Bread, &catalog).unwrap();
        assert_eq!(hunger, Decimal::from(100));
        assert_eq!(agent.inventory.count(ItemKind::Bread), 1);
    }

    #[test]
    fn eat_rejects_inedible_and_missing_items() {
        let mut agent = mara();
        let catalog = ItemCatalog::standard();
        agent.inventory.add(ItemKind::CopperOre, 1).unwrap();

        assert_eq!(
            agent.eat(ItemKind::CopperOre, &catalog),
            Err(AgentError::NotEdible {
                item: ItemKind::CopperOre
            })
        );
        // Edible but not held.
        assert!(matches!(
            agent.eat(ItemKind::Fish, &catalog),
            Err(AgentError::Ledger(_))
        ));
        // Nothing was consumed by the failures.
        assert_eq!(agent.inventory.count(ItemKind::CopperOre), 1);
    }

    #[test]
    fn redundant_move_is_observable_not_an_error() {
        let mut agent = mara();
        assert_eq!(
            agent.relocate(Place::Home).unwrap(),
            Relocation::AlreadyThere { place: Place::Home }
        );
        assert_eq!(
            agent.relocate(Place::Market).unwrap(),
            Relocation::Moved {
                from: Place::Home,
                to: Place::Market,
            }
        );
    }

    #[test]
    fn money_never_goes_negative() {
        let mut agent = mara();
        assert_eq!(
            agent.spend(101),
            Err(AgentError::InsufficientFunds {
                required: 101,
                held: 100,
            })
        );
        assert_eq!(agent.money(), 100);
        agent.spend(100).unwrap();
        assert_eq!(agent.money(), 0);
        agent.earn(45).unwrap();
        assert_eq!(agent.money(), 45);
    }

    #[test]
    fn dead_agents_reject_mutations() {
        let mut agent = mara();
        agent.advance_time(200, Decimal::new(5, 1));
        assert!(!agent.is_alive());

        let catalog = ItemCatalog::standard();
        assert!(matches!(
            agent.eat(ItemKind::Bread, &catalog),
            Err(AgentError::Dead { .. })
        ));
        assert!(matches!(
            agent.relocate(Place::Market),
            Err(AgentError::Dead { .. })
        ));
    }

    #[test]
    fn agent_roundtrip_serde() {
        let mut agent = mara();
        agent.inventory.add(ItemKind::Fish, 3).unwrap();
        let json = serde_json::to_string(&agent).unwrap();
        let back: AgentState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, agent);
    }
}
