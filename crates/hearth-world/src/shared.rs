//! Shared handle over a [`ResourcePool`] for concurrent callers.
//!
//! Pool draws are the one point of true cross-agent contention, so every
//! operation here runs as a single critical section: check and decrement
//! happen under one lock acquisition, never as separate read and write
//! steps. Two agents racing for the last unit see exactly one success and
//! one [`WorldError::Depleted`].

use std::sync::{Arc, Mutex};

use rand::Rng;

use hearth_types::{ItemKind, Place, SiteId};

use crate::error::WorldError;
use crate::resource::ResourcePool;

/// A cloneable, thread-safe handle to one site's pool.
#[derive(Debug, Clone)]
pub struct SharedResourcePool {
    site: SiteId,
    place: Place,
    inner: Arc<Mutex<ResourcePool>>,
}

impl SharedResourcePool {
    /// Wrap a validated pool.
    pub fn new(pool: ResourcePool) -> Self {
        Self {
            site: pool.site(),
            place: pool.place(),
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    /// The site this handle belongs to.
    pub const fn site(&self) -> SiteId {
        self.site
    }

    /// The place the site occupies. Immutable, so no lock is needed.
    pub const fn place(&self) -> Place {
        self.place
    }

    /// Atomically take one unit of a specific kind.
    ///
    /// # Errors
    ///
    /// Propagates [`ResourcePool::try_draw`] errors, or
    /// [`WorldError::LockPoisoned`] if a previous holder panicked.
    pub fn try_draw(&self, kind: ItemKind) -> Result<(), WorldError> {
        let Ok(mut pool) = self.inner.lock() else {
            return Err(WorldError::LockPoisoned);
        };
        pool.try_draw(kind)
    }

    /// Atomically draw a weighted kind and take one unit of it.
    ///
    /// # Errors
    ///
    /// Propagates [`ResourcePool::draw_weighted`] errors, or
    /// [`WorldError::LockPoisoned`] if a previous holder panicked.
    pub fn draw_weighted<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ItemKind, WorldError> {
        let Ok(mut pool) = self.inner.lock() else {
            return Err(WorldError::LockPoisoned);
        };
        pool.draw_weighted(rng)
    }

    /// Return one unit to the pool (compensation for a failed follow-up).
    ///
    /// # Errors
    ///
    /// Propagates [`ResourcePool::give_back`] errors, or
    /// [`WorldError::LockPoisoned`] if a previous holder panicked.
    pub fn give_back(&self, kind: ItemKind) -> Result<(), WorldError> {
        let Ok(mut pool) = self.inner.lock() else {
            return Err(WorldError::LockPoisoned);
        };
        pool.give_back(kind)
    }

    /// Apply elapsed refresh intervals; returns units added.
    ///
    /// # Errors
    ///
    /// Propagates [`ResourcePool::refresh`] errors, or
    /// [`WorldError::LockPoisoned`] if a previous holder panicked.
    pub fn refresh(&self, now: u64) -> Result<u32, WorldError> {
        let Ok(mut pool) = self.inner.lock() else {
            return Err(WorldError::LockPoisoned);
        };
        pool.refresh(now)
    }

    /// Units currently available for a kind.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LockPoisoned`] if a previous holder panicked.
    pub fn count(&self, kind: ItemKind) -> Result<u32, WorldError> {
        let Ok(pool) = self.inner.lock() else {
            return Err(WorldError::LockPoisoned);
        };
        Ok(pool.count(kind))
    }

    /// Clone the current pool state (for snapshots).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LockPoisoned`] if a previous holder panicked.
    pub fn to_pool(&self) -> Result<ResourcePool, WorldError> {
        let Ok(pool) = self.inner.lock() else {
            return Err(WorldError::LockPoisoned);
        };
        Ok(pool.clone())
    }
}
