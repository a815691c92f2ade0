//! Tunables for companion behavior
//!
//! Every field has a default so a partial RON file is enough:
//!
//! ```ron
//! (
//!     xp_rate: 2.0,
//!     corpse_retention_ms: 600000,
//! )
//! ```

use crate::SpeciesId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Companion configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PetConfig {
    /// Multiplier applied to every experience grant
    pub xp_rate: f32,
    /// Fraction of the owner's XP curve a pet needs per level
    pub next_level_xp_rate: f32,
    /// Global level cap
    pub max_level: u8,
    /// How far a semi-independent pet may fall below its owner
    pub level_gap: u8,
    /// Interval between happiness losses
    pub happiness_interval_ms: u64,
    /// Happiness lost per interval out of combat
    pub happiness_loss: u32,
    /// Loss multiplier while in combat
    pub combat_happiness_multiplier: f32,
    /// Width of one happiness tier
    pub happiness_tier_size: u32,
    /// Happiness ceiling
    pub max_happiness: u32,
    /// Happiness of a freshly tamed pet
    pub tamed_happiness: u32,
    /// Interval between focus regeneration steps
    pub focus_regen_interval_ms: u64,
    /// Focus gained per step
    pub focus_regen_amount: u32,
    /// Focus ceiling
    pub max_focus: u32,
    /// How long a hunter-type corpse lingers before removal
    pub corpse_retention_ms: u64,
    /// Cooldowns ending within this window of a save are dropped
    pub cooldown_save_grace_ms: u64,
    /// Cooldown applied to abilities whose cooldown starts on an event
    pub infinite_cooldown_ms: u64,
    /// Cooldowns ending beyond this window are never persisted
    pub infinite_cooldown_cutoff_ms: u64,
    /// Effects with less remaining time than this are not persisted
    pub effect_save_floor_ms: u64,
    /// Distance a pet keeps from its owner when following
    pub follow_distance: f32,
    /// Melee reach subtracted (twice) from melee-range abilities
    pub min_melee_reach: f32,
    /// Strip arena-restricted effects when loading into an arena
    pub arena_restricts_effects: bool,
    /// Species a mage owner keeps as a permanent summon
    pub permanent_mage_companion: Option<SpeciesId>,
}

impl PetConfig {
    pub fn happiness_interval(&self) -> Duration {
        Duration::from_millis(self.happiness_interval_ms)
    }

    pub fn focus_regen_interval(&self) -> Duration {
        Duration::from_millis(self.focus_regen_interval_ms)
    }

    pub fn corpse_retention(&self) -> Duration {
        Duration::from_millis(self.corpse_retention_ms)
    }

    pub fn cooldown_save_grace(&self) -> Duration {
        Duration::from_millis(self.cooldown_save_grace_ms)
    }

    pub fn infinite_cooldown(&self) -> Duration {
        Duration::from_millis(self.infinite_cooldown_ms)
    }

    pub fn infinite_cooldown_cutoff(&self) -> Duration {
        Duration::from_millis(self.infinite_cooldown_cutoff_ms)
    }

    pub fn effect_save_floor(&self) -> Duration {
        Duration::from_millis(self.effect_save_floor_ms)
    }
}

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            xp_rate: 1.0,
            next_level_xp_rate: 0.05,
            max_level: 80,
            level_gap: 5,
            happiness_interval_ms: 7_500,
            happiness_loss: 670,
            combat_happiness_multiplier: 1.5,
            happiness_tier_size: 333_000,
            max_happiness: 1_050_000,
            tamed_happiness: 166_500,
            focus_regen_interval_ms: 4_000,
            focus_regen_amount: 24,
            max_focus: 100,
            corpse_retention_ms: 300_000,
            cooldown_save_grace_ms: 1_000,
            infinite_cooldown_ms: 30 * DAY_MS,
            infinite_cooldown_cutoff_ms: 15 * DAY_MS,
            effect_save_floor_ms: 60_000,
            follow_distance: 1.0,
            min_melee_reach: 2.0,
            arena_restricts_effects: true,
            permanent_mage_companion: None,
        }
    }
}
