//! Depletable, periodically replenished resource pools.
//!
//! A [`ResourcePool`] tracks per-kind unit counts for one production site.
//! Consuming operations only decrease counts; [`ResourcePool::refresh`]
//! only increases them, capped at each kind's maximum. Refresh is anchored
//! to whole elapsed intervals: `last_refresh` advances by full intervals,
//! never jumps to `now`, so delayed refresh calls cannot drift or starve
//! the schedule.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hearth_types::{ItemKind, Place, SiteId};

use crate::error::WorldError;
use crate::weighted::WeightedPool;

/// Per-kind state within a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindState {
    /// Units currently available.
    pub count: u32,
    /// Ceiling the count never exceeds.
    pub max_capacity: u32,
    /// Static rarity weight used for weighted draws while units remain.
    pub rarity_weight: u32,
    /// Units added per elapsed refresh interval (before capping).
    pub replenish_amount: u32,
}

/// A site's depletable multiset of item kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    site: SiteId,
    /// The place this site occupies; work actions are only valid from it.
    place: Place,
    kinds: BTreeMap<ItemKind, KindState>,
    /// Game-minutes between refreshes.
    refresh_interval: u64,
    /// Game time of the last applied refresh boundary.
    last_refresh: u64,
}

impl ResourcePool {
    /// Create and validate a pool.
    ///
    /// Validation is deliberately loud at construction time: an empty kind
    /// map, a zero refresh interval, a zero rarity weight, or a count above
    /// its own maximum are configuration bugs, not runtime conditions.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] describing the first problem
    /// found.
    pub fn new(
        site: SiteId,
        place: Place,
        kinds: BTreeMap<ItemKind, KindState>,
        refresh_interval: u64,
        created_at: u64,
    ) -> Result<Self, WorldError> {
        if kinds.is_empty() {
            return Err(WorldError::InvalidConfig {
                reason: format!("site {site} has no resource kinds"),
            });
        }
        if refresh_interval == 0 {
            return Err(WorldError::InvalidConfig {
                reason: format!("site {site} has a zero refresh interval"),
            });
        }
        for (kind, state) in &kinds {
            if state.rarity_weight == 0 {
                return Err(WorldError::InvalidConfig {
                    reason: format!("site {site}: {kind:?} has zero rarity weight"),
                });
            }
            if state.max_capacity == 0 {
                return Err(WorldError::InvalidConfig {
                    reason: format!("site {site}: {kind:?} has zero max capacity"),
                });
            }
            if state.count > state.max_capacity {
                return Err(WorldError::InvalidConfig {
                    reason: format!(
                        "site {site}: {kind:?} count {} exceeds max {}",
                        state.count, state.max_capacity
                    ),
                });
            }
        }
        Ok(Self {
            site,
            place,
            kinds,
            refresh_interval,
            last_refresh: created_at,
        })
    }

    /// The site this pool belongs to.
    pub const fn site(&self) -> SiteId {
        self.site
    }

    /// The place the site occupies.
    pub const fn place(&self) -> Place {
        self.place
    }

    /// Units currently available for a kind (0 for untracked kinds).
    pub fn count(&self, kind: ItemKind) -> u32 {
        self.kinds.get(&kind).map_or(0, |state| state.count)
    }

    /// Total units available across all kinds.
    pub fn total_count(&self) -> u64 {
        self.kinds
            .values()
            .fold(0_u64, |sum, state| sum.saturating_add(u64::from(state.count)))
    }

    /// Atomically take one unit of a specific kind.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownKind`] if the site never carries the
    /// kind, or [`WorldError::Depleted`] if no units remain until the next
    /// refresh.
    pub fn try_draw(&mut self, kind: ItemKind) -> Result<(), WorldError> {
        let state = self
            .kinds
            .get_mut(&kind)
            .ok_or(WorldError::UnknownKind { kind })?;
        state.count = state
            .count
            .checked_sub(1)
            .ok_or(WorldError::Depleted { kind: Some(kind) })?;
        Ok(())
    }

    /// Draw a kind at random, weighted by rarity, and take one unit of it.
    ///
    /// Kinds with no units left contribute effective weight zero even
    /// though their static rarity weight is positive. When every kind is
    /// exhausted the draw fails with a site-wide [`WorldError::Depleted`]
    /// ("nothing obtained"), mirroring a per-kind depletion.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Depleted`] with `kind: None` when the whole
    /// site is empty.
    pub fn draw_weighted<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<ItemKind, WorldError> {
        let mut weighted = WeightedPool::new();
        for (kind, state) in &self.kinds {
            if state.count > 0 {
                weighted.add(*kind, state.rarity_weight)?;
            }
        }

        let kind = match weighted.draw(rng) {
            Ok(kind) => *kind,
            Err(WorldError::EmptyPool) => {
                return Err(WorldError::Depleted { kind: None });
            }
            Err(other) => return Err(other),
        };

        self.try_draw(kind)?;
        Ok(kind)
    }

    /// Return one unit of a kind to the pool, capped at its maximum.
    ///
    /// Used to compensate a draw whose follow-up bookkeeping failed, so the
    /// enclosing action stays all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownKind`] if the site never carries the kind.
    pub fn give_back(&mut self, kind: ItemKind) -> Result<(), WorldError> {
        let state = self
            .kinds
            .get_mut(&kind)
            .ok_or(WorldError::UnknownKind { kind })?;
        state.count = state
            .count
            .checked_add(1)
            .ok_or(WorldError::ArithmeticOverflow)?
            .min(state.max_capacity);
        Ok(())
    }

    /// Apply all refresh intervals that have fully elapsed by `now`.
    ///
    /// Each elapsed interval adds `replenish_amount` units per kind, capped
    /// at that kind's maximum. `last_refresh` advances by the number of
    /// whole intervals, never to `now` itself. Returns the total units
    /// actually added.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ArithmeticOverflow`] if checked arithmetic
    /// fails.
    pub fn refresh(&mut self, now: u64) -> Result<u32, WorldError> {
        let elapsed = now.saturating_sub(self.last_refresh);
        let intervals = elapsed
            .checked_div(self.refresh_interval)
            .ok_or(WorldError::ArithmeticOverflow)?;
        if intervals == 0 {
            return Ok(0);
        }

        let mut added_total = 0_u32;
        for (kind, state) in &mut self.kinds {
            let replenished = u64::from(state.replenish_amount)
                .checked_mul(intervals)
                .ok_or(WorldError::ArithmeticOverflow)?;
            let headroom = state
                .max_capacity
                .checked_sub(state.count)
                .ok_or(WorldError::ArithmeticOverflow)?;
            let added = u32::try_from(replenished.min(u64::from(headroom)))
                .map_err(|_err| WorldError::ArithmeticOverflow)?;
            state.count = state
                .count
                .checked_add(added)
                .ok_or(WorldError::ArithmeticOverflow)?;
            added_total = added_total
                .checked_add(added)
                .ok_or(WorldError::ArithmeticOverflow)?;
            if added > 0 {
                debug!(site = %self.site, ?kind, added, "pool kind replenished");
            }
        }

        let advance = intervals
            .checked_mul(self.refresh_interval)
            .ok_or(WorldError::ArithmeticOverflow)?;
        self.last_refresh = self
            .last_refresh
            .checked_add(advance)
            .ok_or(WorldError::ArithmeticOverflow)?;

        Ok(added_total)
    }

    /// Game time of the last applied refresh boundary.
    pub const fn last_refresh(&self) -> u64 {
        self.last_refresh
    }
}
