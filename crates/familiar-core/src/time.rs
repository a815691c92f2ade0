//! Simulation time
//!
//! Two clocks matter to a companion:
//! - `uptime` - monotonic simulation time, drives cooldowns, timers, and corpse expiry
//! - `wall` - real-world time, used for anything persisted (cooldown expiry,
//!   last save, offline effect countdown)

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

/// Snapshot of both clocks at the start of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameTime {
    /// Real-world time
    pub wall: DateTime<Utc>,
    /// Monotonic time since the simulation started
    pub uptime: Duration,
}

impl GameTime {
    /// Create a clock snapshot
    pub fn new(wall: DateTime<Utc>, uptime: Duration) -> Self {
        Self { wall, uptime }
    }

    /// Clock starting at the given Unix second with zero uptime
    pub fn at_unix(secs: i64) -> Self {
        let wall = Utc.timestamp_opt(secs, 0).single().unwrap_or_default();
        Self {
            wall,
            uptime: Duration::ZERO,
        }
    }

    /// Advance both clocks by one tick
    pub fn advance(&mut self, diff: Duration) {
        self.uptime += diff;
        self.wall += chrono::Duration::from_std(diff).unwrap_or(chrono::Duration::zero());
    }

    /// Wall-clock time as Unix seconds
    pub fn unix_secs(&self) -> i64 {
        self.wall.timestamp()
    }

    /// Whole seconds elapsed since a stored Unix timestamp (zero if in the future)
    pub fn secs_since(&self, unix_secs: i64) -> u64 {
        (self.unix_secs() - unix_secs).max(0) as u64
    }
}

impl Default for GameTime {
    fn default() -> Self {
        Self::at_unix(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_moves_both_clocks() {
        let mut now = GameTime::at_unix(1_000);
        now.advance(Duration::from_millis(2_500));
        assert_eq!(now.uptime, Duration::from_millis(2_500));
        assert_eq!(now.unix_secs(), 1_002);
    }

    #[test]
    fn test_secs_since_clamps_future() {
        let now = GameTime::at_unix(100);
        assert_eq!(now.secs_since(40), 60);
        assert_eq!(now.secs_since(400), 0);
    }
}
