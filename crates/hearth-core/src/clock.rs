//! The game clock: monotonic game-minutes.
//!
//! All temporal state -- hunger decay, pool refresh, cooldowns, age,
//! relationship staleness -- derives from this one counter. The clock
//! never reads wall time; the engine advances it by a configured step
//! per tick, and tests drive it by hand.

use serde::{Deserialize, Serialize};

/// Errors from clock operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The minute counter would overflow.
    #[error("game clock overflow: cannot advance beyond u64::MAX minutes")]
    Overflow,
}

/// Monotonic game time, counted in game-minutes since world creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    minutes: u64,
}

impl GameClock {
    /// A clock at minute zero.
    pub const fn new() -> Self {
        Self { minutes: 0 }
    }

    /// Restore a clock to a known minute (snapshot restore, tests).
    pub const fn from_minutes(minutes: u64) -> Self {
        Self { minutes }
    }

    /// Current game time in minutes.
    pub const fn minutes(&self) -> u64 {
        self.minutes
    }

    /// Advance by `minutes`, returning the new time.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Overflow`] if the counter would wrap; the
    /// clock never moves backwards or silently saturates.
    pub const fn advance(&mut self, minutes: u64) -> Result<u64, ClockError> {
        match self.minutes.checked_add(minutes) {
            Some(next) => {
                self.minutes = next;
                Ok(next)
            }
            None => Err(ClockError::Overflow),
        }
    }
}
