//! Per-ability and global cooldowns
//!
//! Expiry is kept on the monotonic clock. Only a save converts it to wall
//! seconds, and only a load converts it back.

use crate::{AbilityId, GameTime, PetConfig, PetNumber, StoreOp};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownEntry {
    pub category: u16,
    /// Uptime at which the ability is usable again
    pub expires_at: Duration,
}

/// A persisted cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRow {
    pub ability: AbilityId,
    pub category: u16,
    /// Wall-clock Unix seconds
    pub expires_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CooldownTable {
    entries: IndexMap<AbilityId, CooldownEntry>,
}

impl CooldownTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, ability: AbilityId, category: u16, duration: Duration, now: &GameTime) {
        self.entries.insert(
            ability,
            CooldownEntry {
                category,
                expires_at: now.uptime + duration,
            },
        );
    }

    pub fn get(&self, ability: AbilityId) -> Option<&CooldownEntry> {
        self.entries.get(&ability)
    }

    pub fn is_active(&self, ability: AbilityId, now: &GameTime) -> bool {
        self.remaining(ability, now).is_some()
    }

    pub fn remaining(&self, ability: AbilityId, now: &GameTime) -> Option<Duration> {
        self.entries
            .get(&ability)
            .and_then(|entry| entry.expires_at.checked_sub(now.uptime))
            .filter(|left| !left.is_zero())
    }

    pub fn clear(&mut self, ability: AbilityId) -> bool {
        self.entries.shift_remove(&ability).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store operations for a save
    ///
    /// Entries ending within the grace window are dropped from memory.
    /// Entries ending past the infinite cutoff stay in memory only.
    pub fn flush(&mut self, pet: PetNumber, now: &GameTime, config: &PetConfig) -> Vec<StoreOp> {
        let mut ops = vec![StoreOp::DeleteCooldowns { pet }];
        let drop_until = now.uptime + config.cooldown_save_grace();
        let persist_until = now.uptime + config.infinite_cooldown_cutoff();
        self.entries.retain(|ability, entry| {
            if entry.expires_at <= drop_until {
                return false;
            }
            if entry.expires_at <= persist_until {
                let left = entry.expires_at - now.uptime;
                ops.push(StoreOp::InsertCooldown {
                    pet,
                    row: CooldownRow {
                        ability: *ability,
                        category: entry.category,
                        expires_at: now.unix_secs() + left.as_secs() as i64,
                    },
                });
            }
            true
        });
        ops
    }

    /// Restore a persisted row; rows already expired are skipped
    pub fn restore(&mut self, row: &CooldownRow, now: &GameTime) -> Option<Duration> {
        if row.expires_at <= now.unix_secs() {
            return None;
        }
        let left = Duration::from_secs((row.expires_at - now.unix_secs()) as u64);
        self.entries.insert(
            row.ability,
            CooldownEntry {
                category: row.category,
                expires_at: now.uptime + left,
            },
        );
        Some(left)
    }
}

/// Cooldowns shared by every ability of a category
#[derive(Debug, Clone, Default)]
pub struct GlobalCooldowns {
    categories: HashMap<u16, Duration>,
}

impl GlobalCooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Category 0 never triggers
    pub fn start(&mut self, category: u16, duration: Duration, now: &GameTime) {
        if category == 0 || duration.is_zero() {
            return;
        }
        self.categories.insert(category, now.uptime + duration);
    }

    pub fn is_active(&self, category: u16, now: &GameTime) -> bool {
        category != 0
            && self
                .categories
                .get(&category)
                .is_some_and(|expires_at| *expires_at > now.uptime)
    }

    pub fn clear(&mut self) {
        self.categories.clear();
    }
}
