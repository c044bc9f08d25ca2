//! Transactional application of validated decisions to world state.
//!
//! Every action is applied as a unit: all preconditions are checked
//! before the first mutation, so a failed action leaves agents, shops,
//! and pools exactly as they were. The only mid-apply failure that can
//! occur after a mutation is the pool draw's follow-up (the drawn unit
//! not fitting the inventory), which is compensated by returning the
//! unit to the pool.
//!
//! The applier reports what happened; it never emits events or logs
//! outcomes itself beyond trace-level detail. The tick loop owns that.

use std::collections::BTreeMap;

use rand::Rng;
use rust_decimal::Decimal;
use tracing::trace;

use hearth_ledger::{LedgerError, Shop};
use hearth_types::{
    ActionParameters, AgentId, Decision, ItemCatalog, ItemKind, Place, RelationEventKind,
    RelationshipTier, ShopId, SiteId,
};
use hearth_world::SharedResourcePool;

use crate::agent::Relocation;
use crate::error::AgentError;
use crate::registry::AgentRegistry;

/// Relationship magnitude of one friendly conversation (0.1).
const CHAT_MAGNITUDE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Mutable views into the world state an action can touch.
pub struct WorldRefs<'a> {
    /// All agents.
    pub registry: &'a mut AgentRegistry,
    /// Production site pools, by site.
    pub sites: &'a BTreeMap<SiteId, SharedResourcePool>,
    /// Shops, by shop.
    pub shops: &'a mut BTreeMap<ShopId, Shop>,
    /// Item definitions.
    pub catalog: &'a ItemCatalog,
}

/// What a successfully applied action did, for event emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedAction {
    /// The agent ate; hunger is the value after restoring.
    Ate {
        /// What was eaten.
        item: ItemKind,
        /// Hunger after the meal.
        hunger: Decimal,
    },
    /// The agent changed place.
    Moved {
        /// Where they were.
        from: Place,
        /// Where they are now.
        to: Place,
    },
    /// The agent "moved" to where it already was.
    StayedPut {
        /// The place in question.
        place: Place,
    },
    /// The agent mined one unit.
    Mined {
        /// The site worked.
        site: SiteId,
        /// What came out of the ground.
        item: ItemKind,
    },
    /// The agent fished one unit.
    Fished {
        /// The site worked.
        site: SiteId,
        /// What was caught.
        item: ItemKind,
    },
    /// The agent sold items to a shop.
    Sold {
        /// The buying shop.
        shop: ShopId,
        /// The item sold.
        item: ItemKind,
        /// Units sold.
        quantity: u32,
        /// Total money received.
        price: u32,
    },
    /// The agent bought items from a shop.
    Bought {
        /// The selling shop.
        shop: ShopId,
        /// The item bought.
        item: ItemKind,
        /// Units bought.
        quantity: u32,
        /// Total money paid.
        price: u32,
    },
    /// The agent spoke to another resident.
    Talked {
        /// Who was spoken to.
        target: AgentId,
        /// What was said (relayed, not interpreted).
        message: String,
        /// The speaker's tier toward the target after the chat.
        tier: RelationshipTier,
    },
    /// The agent did nothing.
    Idled,
}

/// Apply one decision for `agent_id` against the world.
///
/// Marks the agent as acting for the duration and returns it to idle
/// whether the action succeeds or fails; a failure is the caller's to
/// report, never to escalate.
///
/// # Errors
///
/// Any precondition failure: dead or missing agents, wrong place,
/// unknown sites or shops, depleted pools, or ledger insufficiencies.
/// On error no world state has changed.
pub fn apply_decision<R: Rng + ?Sized>(
    world: &mut WorldRefs<'_>,
    agent_id: AgentId,
    decision: &Decision,
    now_minutes: u64,
    rng: &mut R,
) -> Result<AppliedAction, AgentError> {
    let action = decision.action_type();
    {
        let agent = world.registry.require_mut(agent_id)?;
        if !agent.is_alive() {
            return Err(AgentError::Dead { agent: agent_id });
        }
        agent.begin_action(action);
    }

    let result = execute(world, agent_id, &decision.parameters, now_minutes, rng);

    if let Ok(agent) = world.registry.require_mut(agent_id) {
        agent.finish_action();
    }

    trace!(agent = %agent_id, ?action, ok = result.is_ok(), "decision applied");
    result
}

fn execute<R: Rng + ?Sized>(
    world: &mut WorldRefs<'_>,
    agent_id: AgentId,
    parameters: &ActionParameters,
    now_minutes: u64,
    rng: &mut R,
) -> Result<AppliedAction, AgentError> {
    match parameters {
        ActionParameters::Eat { item } => {
            let agent = world.registry.require_mut(agent_id)?;
            let hunger = agent.eat(*item, world.catalog)?;
            Ok(AppliedAction::Ate {
                item: *item,
                hunger,
            })
        }
        ActionParameters::Move { destination } => {
            let agent = world.registry.require_mut(agent_id)?;
            match agent.relocate(*destination)? {
                Relocation::Moved { from, to } => Ok(AppliedAction::Moved { from, to }),
                Relocation::AlreadyThere { place } => Ok(AppliedAction::StayedPut { place }),
            }
        }
        ActionParameters::Mine { site } => {
            let item = work_site(world, agent_id, *site, Place::Mine, rng)?;
            Ok(AppliedAction::Mined { site: *site, item })
        }
        ActionParameters::Fish { site } => {
            let item = work_site(world, agent_id, *site, Place::FishingPier, rng)?;
            Ok(AppliedAction::Fished { site: *site, item })
        }
        ActionParameters::Sell {
            shop,
            item,
            quantity,
        } => sell(world, agent_id, *shop, *item, *quantity),
        ActionParameters::Buy {
            shop,
            item,
            quantity,
        } => buy(world, agent_id, *shop, *item, *quantity),
        ActionParameters::Talk { target, message } => {
            talk(world, agent_id, *target, message, now_minutes)
        }
        ActionParameters::Idle => Ok(AppliedAction::Idled),
    }
}

/// Draw one weighted unit from a site's pool into the agent's inventory.
///
/// The draw and the inventory credit are two steps; a failed credit
/// returns the unit to the pool so the two stay consistent.
fn work_site<R: Rng + ?Sized>(
    world: &mut WorldRefs<'_>,
    agent_id: AgentId,
    site: SiteId,
    required_place: Place,
    rng: &mut R,
) -> Result<ItemKind, AgentError> {
    if world.registry.require(agent_id)?.place() != required_place {
        return Err(AgentError::WrongPlace {
            required: required_place,
        });
    }
    let pool = world
        .sites
        .get(&site)
        .ok_or(AgentError::UnknownSite { site })?;
    // The agent being in the right place is not enough: the named site
    // must also be there, or a mine action could drain a fishing pool.
    if pool.place() != required_place {
        return Err(AgentError::SiteMismatch {
            site,
            place: pool.place(),
        });
    }

    let item = pool.draw_weighted(rng)?;
    if let Err(err) = world.registry.require_mut(agent_id)?.inventory.add(item, 1) {
        pool.give_back(item)?;
        return Err(err.into());
    }
    Ok(item)
}

fn sell(
    world: &mut WorldRefs<'_>,
    agent_id: AgentId,
    shop_id: ShopId,
    item: ItemKind,
    quantity: u32,
) -> Result<AppliedAction, AgentError> {
    let shop = world
        .shops
        .get_mut(&shop_id)
        .ok_or(AgentError::UnknownShop { shop: shop_id })?;
    let price = shop.total_price(item, quantity)?;

    // Every precondition before the first mutation.
    let held = world.registry.require(agent_id)?.inventory.count(item);
    if held < quantity {
        return Err(LedgerError::InsufficientInventory {
            item,
            requested: quantity,
            held,
        }
        .into());
    }
    if shop.till() < price {
        return Err(LedgerError::TillShort {
            required: price,
            held: shop.till(),
        }
        .into());
    }
    if shop.stock_count(item).checked_add(quantity).is_none() {
        return Err(AgentError::ArithmeticOverflow);
    }
    let agent = world.registry.require(agent_id)?;
    if agent.money().checked_add(price).is_none() {
        return Err(AgentError::ArithmeticOverflow);
    }

    shop.debit_till(price)?;
    shop.add_stock(item, quantity)?;
    let agent = world.registry.require_mut(agent_id)?;
    agent.inventory.remove(item, quantity)?;
    agent.earn(price)?;

    Ok(AppliedAction::Sold {
        shop: shop_id,
        item,
        quantity,
        price,
    })
}

fn buy(
    world: &mut WorldRefs<'_>,
    agent_id: AgentId,
    shop_id: ShopId,
    item: ItemKind,
    quantity: u32,
) -> Result<AppliedAction, AgentError> {
    let shop = world
        .shops
        .get_mut(&shop_id)
        .ok_or(AgentError::UnknownShop { shop: shop_id })?;
    let price = shop.total_price(item, quantity)?;

    let stocked = shop.stock_count(item);
    if quantity > 0 && stocked == 0 {
        return Err(LedgerError::OutOfStock { item }.into());
    }
    if stocked < quantity {
        return Err(LedgerError::InsufficientInventory {
            item,
            requested: quantity,
            held: stocked,
        }
        .into());
    }
    if shop.till().checked_add(price).is_none() {
        return Err(AgentError::ArithmeticOverflow);
    }
    let agent = world.registry.require(agent_id)?;
    if agent.money() < price {
        return Err(AgentError::InsufficientFunds {
            required: price,
            held: agent.money(),
        });
    }
    if agent.inventory.count(item).checked_add(quantity).is_none() {
        return Err(AgentError::ArithmeticOverflow);
    }

    shop.remove_stock(item, quantity)?;
    shop.credit_till(price)?;
    let agent = world.registry.require_mut(agent_id)?;
    agent.spend(price)?;
    agent.inventory.add(item, quantity)?;

    Ok(AppliedAction::Bought {
        shop: shop_id,
        item,
        quantity,
        price,
    })
}

/// A chat touches both relationship directions, each agent's own graph.
fn talk(
    world: &mut WorldRefs<'_>,
    agent_id: AgentId,
    target: AgentId,
    message: &str,
    now_minutes: u64,
) -> Result<AppliedAction, AgentError> {
    if target == agent_id {
        return Err(AgentError::InvalidTarget {
            reason: String::from("cannot talk to oneself"),
        });
    }
    let speaker_place = world.registry.require(agent_id)?.place();
    {
        let listener = world.registry.require(target)?;
        if !listener.is_alive() {
            return Err(AgentError::InvalidTarget {
                reason: String::from("target is dead"),
            });
        }
        if listener.place() != speaker_place {
            return Err(AgentError::InvalidTarget {
                reason: String::from("target is not nearby"),
            });
        }
    }

    world.registry.require_mut(target)?.relationships.apply_event(
        agent_id,
        RelationEventKind::FriendlyChat,
        CHAT_MAGNITUDE,
        now_minutes,
    );
    let tier = world
        .registry
        .require_mut(agent_id)?
        .relationships
        .apply_event(
            target,
            RelationEventKind::FriendlyChat,
            CHAT_MAGNITUDE,
            now_minutes,
        );

    Ok(AppliedAction::Talked {
        target,
        message: String::from(message),
        tier,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use hearth_world::{KindState, ResourcePool};

    use super::*;
    use crate::agent::AgentState;

    struct World {
        registry: AgentRegistry,
        sites: BTreeMap<SiteId, SharedResourcePool>,
        shops: BTreeMap<ShopId, Shop>,
        catalog: ItemCatalog,
        mine: SiteId,
        pier: SiteId,
        grocer: ShopId,
    }

    impl World {
        fn refs(&mut self) -> WorldRefs<'_> {
            WorldRefs {
                registry: &mut self.registry,
                sites: &self.sites,
                shops: &mut self.shops,
                catalog: &self.catalog,
            }
        }
    }

    fn town() -> (World, AgentId) {
        let catalog = ItemCatalog::standard();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut registry = AgentRegistry::new();
        let agent_id = registry.insert(AgentState::spawn(
            String::from("Mara"),
            Place::TownSquare,
            100,
            525_600,
            &mut rng,
        ));

        let mine = SiteId::new();
        let mut kinds = BTreeMap::new();
        kinds.insert(
            ItemKind::CopperOre,
            KindState {
                count: 2,
                max_capacity: 5,
                rarity_weight: 100,
                replenish_amount: 1,
            },
        );
        let pier = SiteId::new();
        let mut pier_kinds = BTreeMap::new();
        pier_kinds.insert(
            ItemKind::Fish,
            KindState {
                count: 3,
                max_capacity: 5,
                rarity_weight: 100,
                replenish_amount: 1,
            },
        );
        let mut sites = BTreeMap::new();
        sites.insert(
            mine,
            SharedResourcePool::new(
                ResourcePool::new(mine, Place::Mine, kinds, 60, 0).unwrap(),
            ),
        );
        sites.insert(
            pier,
            SharedResourcePool::new(
                ResourcePool::new(pier, Place::FishingPier, pier_kinds, 60, 0).unwrap(),
            ),
        );

        let grocer = ShopId::new();
        let mut shop = Shop::from_catalog(grocer, String::from("Grocer"), &catalog, 500);
        shop.add_stock(ItemKind::Bread, 10).unwrap();
        let mut shops = BTreeMap::new();
        shops.insert(grocer, shop);

        (
            World {
                registry,
                sites,
                shops,
                catalog,
                mine,
                pier,
                grocer,
            },
            agent_id,
        )
    }

    fn decide(parameters: ActionParameters) -> Decision {
        Decision {
            parameters,
            rationale: None,
            emotion: None,
        }
    }

    fn apply(world: &mut World, agent_id: AgentId, parameters: ActionParameters) -> Result<AppliedAction, AgentError> {
        let mut rng = SmallRng::seed_from_u64(99);
        let mut refs = world.refs();
        apply_decision(&mut refs, agent_id, &decide(parameters), 1_000, &mut rng)
    }

    #[test]
    fn mining_requires_the_mine_and_moves_a_unit() {
        let (mut world, mara) = town();
        let mine = world.mine;

        // Wrong place first.
        assert_eq!(
            apply(&mut world, mara, ActionParameters::Mine { site: mine }),
            Err(AgentError::WrongPlace {
                required: Place::Mine
            })
        );

        apply(
            &mut world,
            mara,
            ActionParameters::Move {
                destination: Place::Mine,
            },
        )
        .unwrap();

        let applied = apply(&mut world, mara, ActionParameters::Mine { site: mine }).unwrap();
        assert_eq!(
            applied,
            AppliedAction::Mined {
                site: mine,
                item: ItemKind::CopperOre,
            }
        );
        let agent = world.registry.require(mara).unwrap();
        assert_eq!(agent.inventory.count(ItemKind::CopperOre), 1);
        assert_eq!(
            world
                .sites
                .get(&mine)
                .unwrap()
                .count(ItemKind::CopperOre)
                .unwrap(),
            1
        );
    }

    #[test]
    fn mining_a_site_at_another_place_fails() {
        let (mut world, mara) = town();
        let pier = world.pier;
        apply(
            &mut world,
            mara,
            ActionParameters::Move {
                destination: Place::Mine,
            },
        )
        .unwrap();

        // Standing at the mine but naming the pier's site: the fish pool
        // must stay untouched.
        assert_eq!(
            apply(&mut world, mara, ActionParameters::Mine { site: pier }),
            Err(AgentError::SiteMismatch {
                site: pier,
                place: Place::FishingPier,
            })
        );
        let agent = world.registry.require(mara).unwrap();
        assert_eq!(agent.inventory.count(ItemKind::Fish), 0);
        assert_eq!(world.sites.get(&pier).unwrap().count(ItemKind::Fish).unwrap(), 3);
    }

    #[test]
    fn depleted_site_fails_and_agent_returns_to_idle() {
        let (mut world, mara) = town();
        let mine = world.mine;
        apply(
            &mut world,
            mara,
            ActionParameters::Move {
                destination: Place::Mine,
            },
        )
        .unwrap();

        apply(&mut world, mara, ActionParameters::Mine { site: mine }).unwrap();
        apply(&mut world, mara, ActionParameters::Mine { site: mine }).unwrap();

        let third = apply(&mut world, mara, ActionParameters::Mine { site: mine });
        assert!(matches!(third, Err(AgentError::World(_))));

        let agent = world.registry.require(mara).unwrap();
        assert_eq!(agent.current_action(), None);
        assert_eq!(agent.inventory.count(ItemKind::CopperOre), 2);
    }

    #[test]
    fn selling_moves_items_and_money_together() {
        let (mut world, mara) = town();
        let grocer = world.grocer;
        world
            .registry
            .require_mut(mara)
            .unwrap()
            .inventory
            .add(ItemKind::Bread, 3)
            .unwrap();

        let applied = apply(
            &mut world,
            mara,
            ActionParameters::Sell {
                shop: grocer,
                item: ItemKind::Bread,
                quantity: 3,
            },
        )
        .unwrap();
        assert_eq!(
            applied,
            AppliedAction::Sold {
                shop: grocer,
                item: ItemKind::Bread,
                quantity: 3,
                price: 45,
            }
        );

        let agent = world.registry.require(mara).unwrap();
        assert_eq!(agent.money(), 145);
        assert_eq!(agent.inventory.count(ItemKind::Bread), 0);
        let shop = world.shops.get(&grocer).unwrap();
        assert_eq!(shop.stock_count(ItemKind::Bread), 13);
        assert_eq!(shop.till(), 455);
    }

    #[test]
    fn short_sell_mutates_nothing() {
        let (mut world, mara) = town();
        let grocer = world.grocer;
        world
            .registry
            .require_mut(mara)
            .unwrap()
            .inventory
            .add(ItemKind::Bread, 2)
            .unwrap();

        let result = apply(
            &mut world,
            mara,
            ActionParameters::Sell {
                shop: grocer,
                item: ItemKind::Bread,
                quantity: 3,
            },
        );
        assert_eq!(
            result,
            Err(AgentError::Ledger(LedgerError::InsufficientInventory {
                item: ItemKind::Bread,
                requested: 3,
                held: 2,
            }))
        );

        let agent = world.registry.require(mara).unwrap();
        assert_eq!(agent.money(), 100);
        assert_eq!(agent.inventory.count(ItemKind::Bread), 2);
        assert_eq!(world.shops.get(&grocer).unwrap().till(), 500);
    }

    #[test]
    fn buying_debits_money_and_credits_inventory() {
        let (mut world, mara) = town();
        let grocer = world.grocer;

        let applied = apply(
            &mut world,
            mara,
            ActionParameters::Buy {
                shop: grocer,
                item: ItemKind::Bread,
                quantity: 2,
            },
        )
        .unwrap();
        assert_eq!(
            applied,
            AppliedAction::Bought {
                shop: grocer,
                item: ItemKind::Bread,
                quantity: 2,
                price: 30,
            }
        );

        let agent = world.registry.require(mara).unwrap();
        assert_eq!(agent.money(), 70);
        assert_eq!(agent.inventory.count(ItemKind::Bread), 2);
        let shop = world.shops.get(&grocer).unwrap();
        assert_eq!(shop.stock_count(ItemKind::Bread), 8);
        assert_eq!(shop.till(), 530);
    }

    #[test]
    fn unaffordable_buy_mutates_nothing() {
        let (mut world, mara) = town();
        let grocer = world.grocer;

        let result = apply(
            &mut world,
            mara,
            ActionParameters::Buy {
                shop: grocer,
                item: ItemKind::Bread,
                quantity: 7, // 105 > 100
            },
        );
        assert_eq!(
            result,
            Err(AgentError::InsufficientFunds {
                required: 105,
                held: 100,
            })
        );

        let agent = world.registry.require(mara).unwrap();
        assert_eq!(agent.money(), 100);
        assert_eq!(world.shops.get(&grocer).unwrap().stock_count(ItemKind::Bread), 10);
    }

    #[test]
    fn talking_updates_both_directions() {
        let (mut world, mara) = town();
        let mut rng = SmallRng::seed_from_u64(8);
        let tobin = world.registry.insert(AgentState::spawn(
            String::from("Tobin"),
            Place::TownSquare,
            100,
            525_600,
            &mut rng,
        ));

        let applied = apply(
            &mut world,
            mara,
            ActionParameters::Talk {
                target: tobin,
                message: String::from("fine weather"),
            },
        )
        .unwrap();
        assert!(matches!(applied, AppliedAction::Talked { target, .. } if target == tobin));

        let mara_state = world.registry.require(mara).unwrap();
        let tobin_state = world.registry.require(tobin).unwrap();
        assert_eq!(
            mara_state.relationships.tier(tobin),
            RelationshipTier::Acquaintance
        );
        assert_eq!(
            tobin_state.relationships.tier(mara),
            RelationshipTier::Acquaintance
        );
    }

    #[test]
    fn talk_rejects_self_absent_and_distant_targets() {
        let (mut world, mara) = town();
        let mut rng = SmallRng::seed_from_u64(9);
        let far = world.registry.insert(AgentState::spawn(
            String::from("Far"),
            Place::Farm,
            100,
            525_600,
            &mut rng,
        ));

        let message = String::from("hello?");
        assert!(matches!(
            apply(
                &mut world,
                mara,
                ActionParameters::Talk {
                    target: mara,
                    message: message.clone(),
                },
            ),
            Err(AgentError::InvalidTarget { .. })
        ));
        assert!(matches!(
            apply(
                &mut world,
                mara,
                ActionParameters::Talk {
                    target: AgentId::new(),
                    message: message.clone(),
                },
            ),
            Err(AgentError::AgentNotFound { .. })
        ));
        assert!(matches!(
            apply(
                &mut world,
                mara,
                ActionParameters::Talk {
                    target: far,
                    message,
                },
            ),
            Err(AgentError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn dead_agents_cannot_act() {
        let (mut world, mara) = town();
        world
            .registry
            .require_mut(mara)
            .unwrap()
            .advance_time(200, Decimal::new(5, 1));

        assert_eq!(
            apply(&mut world, mara, ActionParameters::Idle),
            Err(AgentError::Dead { agent: mara })
        );
    }
}
