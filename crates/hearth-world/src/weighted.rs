//! Weighted random draw over a fixed set of entries.
//!
//! One uniform roll over the cumulative weight sum selects an entry with
//! probability proportional to its weight. The pool takes the RNG as a
//! parameter so callers can seed it for deterministic tests; a draw has no
//! side effect beyond consuming that one roll.

use rand::Rng;

use crate::error::WorldError;

/// A weighted pool of entries of type `T`.
///
/// Drawing from an empty pool is an error, not a silent default -- callers
/// either guarantee non-empty pools at configuration time or handle
/// [`WorldError::EmptyPool`] explicitly.
#[derive(Debug, Clone, Default)]
pub struct WeightedPool<T> {
    entries: Vec<(T, u32)>,
    total: u64,
}

impl<T> WeightedPool<T> {
    /// Create an empty pool.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
        }
    }

    /// Add an entry with the given weight.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ZeroWeight`] for `weight == 0` and
    /// [`WorldError::ArithmeticOverflow`] if the cumulative sum overflows.
    pub fn add(&mut self, item: T, weight: u32) -> Result<(), WorldError>
    where
        T: core::fmt::Debug,
    {
        if weight == 0 {
            return Err(WorldError::ZeroWeight {
                item: format!("{item:?}"),
            });
        }
        self.total = self
            .total
            .checked_add(u64::from(weight))
            .ok_or(WorldError::ArithmeticOverflow)?;
        self.entries.push((item, weight));
        Ok(())
    }

    /// Number of entries.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw one entry, with probability proportional to its weight.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EmptyPool`] if no entries were ever added.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&T, WorldError> {
        if self.total == 0 {
            return Err(WorldError::EmptyPool);
        }

        let roll = rng.random_range(0..self.total);
        let mut cumulative = 0_u64;
        for (item, weight) in &self.entries {
            cumulative = cumulative
                .checked_add(u64::from(*weight))
                .ok_or(WorldError::ArithmeticOverflow)?;
            if roll < cumulative {
                return Ok(item);
            }
        }

        // roll < total and total == sum of weights, so the loop always
        // returns; this is unreachable only if the invariant broke.
        Err(WorldError::EmptyPool)
    }

    /// Draw one entry among those `keep` accepts, with probability
    /// proportional to weight. Rejected entries count as weight 0.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EmptyPool`] when no kept entry remains.
    pub fn draw_filtered<R, F>(&self, rng: &mut R, keep: F) -> Result<&T, WorldError>
    where
        R: Rng + ?Sized,
        F: Fn(&T) -> bool,
    {
        let mut effective_total = 0_u64;
        for (item, weight) in &self.entries {
            if keep(item) {
                effective_total = effective_total
                    .checked_add(u64::from(*weight))
                    .ok_or(WorldError::ArithmeticOverflow)?;
            }
        }
        if effective_total == 0 {
            return Err(WorldError::EmptyPool);
        }

        let roll = rng.random_range(0..effective_total);
        let mut cumulative = 0_u64;
        for (item, weight) in &self.entries {
            if !keep(item) {
                continue;
            }
            cumulative = cumulative
                .checked_add(u64::from(*weight))
                .ok_or(WorldError::ArithmeticOverflow)?;
            if roll < cumulative {
                return Ok(item);
            }
        }
        Err(WorldError::EmptyPool)
    }
}
