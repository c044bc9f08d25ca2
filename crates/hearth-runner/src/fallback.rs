//! Deterministic rule fallback for when the provider cannot decide.
//!
//! The rules cover the survival basics only: eat if hungry and fed, go
//! work if broke, otherwise idle. Everything else is the provider's job.
//! The fallback always terminates with a valid decision, which is what
//! makes a provider outage survivable.

use rust_decimal::Decimal;

use hearth_types::{
    ActionParameters, AgentSnapshot, Decision, ItemCatalog, ItemKind, KnownSite, Place,
};

/// Thresholds the rules fire at; constants here so operators can find
/// and tune them from one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackThresholds {
    /// Hunger below this counts as hungry.
    pub hungry_below: Decimal,
    /// Money below this counts as broke.
    pub poor_below: u32,
}

impl Default for FallbackThresholds {
    fn default() -> Self {
        Self {
            hungry_below: Decimal::from(50),
            poor_below: 20,
        }
    }
}

/// Produce a decision from the snapshot alone. Infallible by design.
pub fn rule_decision(
    snapshot: &AgentSnapshot,
    catalog: &ItemCatalog,
    thresholds: &FallbackThresholds,
) -> Decision {
    if snapshot.hunger < thresholds.hungry_below
        && let Some(item) = best_meal(snapshot, catalog)
    {
        return Decision {
            parameters: ActionParameters::Eat { item },
            rationale: Some("fallback: hungry and holding food".to_owned()),
            emotion: None,
        };
    }

    if snapshot.money < thresholds.poor_below {
        return work_decision(snapshot);
    }

    Decision {
        parameters: ActionParameters::Idle,
        rationale: Some("fallback: no pressing need".to_owned()),
        emotion: None,
    }
}

/// The most restorative edible item in the inventory, if any.
fn best_meal(snapshot: &AgentSnapshot, catalog: &ItemCatalog) -> Option<ItemKind> {
    snapshot
        .inventory
        .iter()
        .filter(|(_, count)| **count > 0)
        .filter_map(|(item, _)| catalog.restore(*item).map(|restore| (*item, restore)))
        .max_by_key(|(_, restore)| *restore)
        .map(|(item, _)| item)
}

/// Work a site at the current place, or head for one it knows.
///
/// A known site elsewhere is never worked in place: the applier rejects
/// site/place mismatches, so the rules only ever name a site that is
/// actually here.
fn work_decision(snapshot: &AgentSnapshot) -> Decision {
    let here = site_at(snapshot, snapshot.place);
    let parameters = match (snapshot.place, here) {
        (Place::Mine, Some(site)) => ActionParameters::Mine { site: site.id },
        (Place::FishingPier, Some(site)) => ActionParameters::Fish { site: site.id },
        _ => workable_destination(snapshot).map_or(
            // Knows no site to work; nothing sensible to do.
            ActionParameters::Idle,
            |destination| ActionParameters::Move { destination },
        ),
    };
    Decision {
        parameters,
        rationale: Some("fallback: low on money".to_owned()),
        emotion: None,
    }
}

/// A known site at the given place, if any.
fn site_at(snapshot: &AgentSnapshot, place: Place) -> Option<&KnownSite> {
    snapshot.known_sites.iter().find(|site| site.place == place)
}

/// The place of the first known workable site.
fn workable_destination(snapshot: &AgentSnapshot) -> Option<Place> {
    snapshot
        .known_sites
        .iter()
        .map(|site| site.place)
        .find(|place| matches!(place, Place::Mine | Place::FishingPier))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use hearth_types::{AgentId, SiteId};

    use super::*;

    fn snapshot(hunger: u32, money: u32, place: Place) -> AgentSnapshot {
        AgentSnapshot {
            agent_id: AgentId::new(),
            name: String::from("Mara"),
            hunger: Decimal::from(hunger),
            money,
            place,
            inventory: BTreeMap::new(),
            nearby_agents: Vec::new(),
            known_sites: vec![KnownSite {
                id: SiteId::new(),
                place: Place::Mine,
            }],
            known_shops: Vec::new(),
            game_minutes: 0,
        }
    }

    fn catalog() -> ItemCatalog {
        ItemCatalog::standard()
    }

    #[test]
    fn hungry_with_food_eats_the_best_meal() {
        let mut snap = snapshot(30, 100, Place::Home);
        snap.inventory.insert(ItemKind::Berry, 2);
        snap.inventory.insert(ItemKind::Bread, 1);
        snap.inventory.insert(ItemKind::CopperOre, 5); // not edible

        let decision = rule_decision(&snap, &catalog(), &FallbackThresholds::default());
        assert_eq!(
            decision.parameters,
            ActionParameters::Eat {
                item: ItemKind::Bread
            }
        );
    }

    #[test]
    fn hungry_without_food_and_broke_goes_to_work() {
        let snap = snapshot(30, 5, Place::Home);
        let decision = rule_decision(&snap, &catalog(), &FallbackThresholds::default());
        assert_eq!(
            decision.parameters,
            ActionParameters::Move {
                destination: Place::Mine
            }
        );
    }

    #[test]
    fn broke_at_the_mine_mines() {
        let snap = snapshot(80, 5, Place::Mine);
        let site = snap.known_sites.first().unwrap().id;
        let decision = rule_decision(&snap, &catalog(), &FallbackThresholds::default());
        assert_eq!(decision.parameters, ActionParameters::Mine { site });
    }

    #[test]
    fn broke_at_the_pier_fishes() {
        let mut snap = snapshot(80, 5, Place::FishingPier);
        snap.known_sites = vec![KnownSite {
            id: SiteId::new(),
            place: Place::FishingPier,
        }];
        let site = snap.known_sites.first().unwrap().id;
        let decision = rule_decision(&snap, &catalog(), &FallbackThresholds::default());
        assert_eq!(decision.parameters, ActionParameters::Fish { site });
    }

    #[test]
    fn a_site_at_another_place_is_never_worked_in_place() {
        // At the mine, knowing only the pier's site: walk there instead
        // of handing the applier a mismatched site.
        let mut snap = snapshot(80, 5, Place::Mine);
        snap.known_sites = vec![KnownSite {
            id: SiteId::new(),
            place: Place::FishingPier,
        }];
        let decision = rule_decision(&snap, &catalog(), &FallbackThresholds::default());
        assert_eq!(
            decision.parameters,
            ActionParameters::Move {
                destination: Place::FishingPier
            }
        );
    }

    #[test]
    fn fed_and_solvent_idles() {
        let snap = snapshot(90, 100, Place::TownSquare);
        let decision = rule_decision(&snap, &catalog(), &FallbackThresholds::default());
        assert_eq!(decision.parameters, ActionParameters::Idle);
    }

    #[test]
    fn no_known_sites_degrades_to_idle() {
        let mut snap = snapshot(80, 0, Place::Home);
        snap.known_sites.clear();
        let decision = rule_decision(&snap, &catalog(), &FallbackThresholds::default());
        assert_eq!(decision.parameters, ActionParameters::Idle);
    }
}
