//! Construction of the standard starting town from configuration.
//!
//! One mine, one fishing spot, one grocer, and the configured number of
//! residents. Site layouts are fixed here rather than configurable: the
//! town's shape is part of the simulation's identity, and the config
//! tunes rates and counts inside it.

use std::collections::BTreeMap;

use rand::Rng;

use hearth_agents::{AgentRegistry, AgentState};
use hearth_core::SimConfig;
use hearth_ledger::{InventoryLedger, Shop};
use hearth_types::{ItemCatalog, ItemKind, Place, ShopId, SiteId};
use hearth_world::{KindState, ResourcePool, SharedResourcePool};

use crate::error::EngineError;

/// Names handed out to residents in spawn order. The list cycles when
/// the population exceeds it; identity is the ID, not the name.
const RESIDENT_NAMES: [&str; 8] = [
    "Mara", "Tobin", "Edda", "Falk", "Nils", "Petra", "Sunna", "Garrick",
];

/// Game-minutes between resource pool refreshes.
const POOL_REFRESH_INTERVAL: u64 = 60;

/// Opening till balance of the grocer.
const GROCER_TILL: u32 = 500;

/// Opening bread stock of the grocer.
const GROCER_BREAD: u32 = 10;

/// Opening berry stock of the grocer.
const GROCER_BERRIES: u32 = 12;

/// A freshly built town, ready to simulate.
pub struct Town {
    /// All residents.
    pub registry: AgentRegistry,
    /// Production site pools, by site.
    pub sites: BTreeMap<SiteId, SharedResourcePool>,
    /// Shops, by shop.
    pub shops: BTreeMap<ShopId, Shop>,
    /// Item definitions.
    pub catalog: ItemCatalog,
    /// The mine site.
    pub mine: SiteId,
    /// The fishing spot at the pier.
    pub pier: SiteId,
    /// The grocer's shop.
    pub grocer: ShopId,
}

/// Build the standard town from a validated config.
///
/// # Errors
///
/// Returns [`EngineError::World`] if a pool layout is invalid, which
/// would be a bug in the constants above rather than a config problem.
pub fn standard_town<R: Rng + ?Sized>(
    config: &SimConfig,
    rng: &mut R,
) -> Result<Town, EngineError> {
    let catalog = ItemCatalog::standard();

    let mine = SiteId::new();
    let mut mine_kinds = BTreeMap::new();
    mine_kinds.insert(
        ItemKind::CopperOre,
        KindState {
            count: 8,
            max_capacity: 12,
            rarity_weight: 70,
            replenish_amount: 2,
        },
    );
    mine_kinds.insert(
        ItemKind::IronOre,
        KindState {
            count: 4,
            max_capacity: 6,
            rarity_weight: 25,
            replenish_amount: 1,
        },
    );
    mine_kinds.insert(
        ItemKind::Gemstone,
        KindState {
            count: 1,
            max_capacity: 2,
            rarity_weight: 5,
            replenish_amount: 1,
        },
    );

    let pier = SiteId::new();
    let mut pier_kinds = BTreeMap::new();
    pier_kinds.insert(
        ItemKind::Fish,
        KindState {
            count: 6,
            max_capacity: 10,
            rarity_weight: 100,
            replenish_amount: 2,
        },
    );

    let mut sites = BTreeMap::new();
    sites.insert(
        mine,
        SharedResourcePool::new(ResourcePool::new(
            mine,
            Place::Mine,
            mine_kinds,
            POOL_REFRESH_INTERVAL,
            0,
        )?),
    );
    sites.insert(
        pier,
        SharedResourcePool::new(ResourcePool::new(
            pier,
            Place::FishingPier,
            pier_kinds,
            POOL_REFRESH_INTERVAL,
            0,
        )?),
    );

    let grocer = ShopId::new();
    let mut shop = Shop::from_catalog(grocer, String::from("The Grocer"), &catalog, GROCER_TILL);
    shop.add_stock(ItemKind::Bread, GROCER_BREAD)?;
    shop.add_stock(ItemKind::Berry, GROCER_BERRIES)?;
    let mut shops = BTreeMap::new();
    shops.insert(grocer, shop);

    let mut registry = AgentRegistry::new();
    for (_, name) in (0..config.population.initial_agents).zip(RESIDENT_NAMES.iter().cycle()) {
        let mut agent = AgentState::spawn(
            String::from(*name),
            Place::TownSquare,
            config.population.starting_money,
            config.world.minutes_per_year,
            rng,
        );
        agent.inventory =
            InventoryLedger::from_counts(config.population.starting_inventory.clone());
        registry.insert(agent);
    }

    Ok(Town {
        registry,
        sites,
        shops,
        catalog,
        mine,
        pier,
        grocer,
    })
}
