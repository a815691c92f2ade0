//! Level, experience, and stats

use super::Pet;
use crate::{DerivedStats, EffectDuration, EffectRecord, EffectSource, PetKind};
use tracing::debug;

impl Pet {
    /// Recompute stats for the current level and fill health and mana
    pub fn init_stats_for_level(&mut self) {
        let catalog = self.catalog.clone();
        let Some(species) = catalog.species(self.species) else {
            return;
        };
        self.stats = DerivedStats::compute(species, self.kind, self.level, &catalog);
        if self.kind == PetKind::Hunter {
            self.next_level_xp =
                (catalog.xp_for_level(self.level) as f32 * self.config.next_level_xp_rate) as u32;
        }
        for ability in &species.bonus_effects {
            self.effects.apply(
                EffectRecord::new(*ability, EffectDuration::Permanent).with_source(EffectSource::Species),
            );
        }
        self.health = self.stats.max_health;
        self.mana = self.stats.max_mana;
    }

    /// Set a new level and bring stats, abilities and talents along
    pub fn give_level(&mut self, level: u8) {
        if level == 0 || level == self.level {
            return;
        }
        debug!(pet = %self.number, from = self.level, to = level, "pet level changed");
        self.level = level;
        if self.kind == PetKind::Hunter {
            self.experience = 0;
        }
        self.init_stats_for_level();
        self.init_levelup_abilities();
        self.init_talents_for_level();
    }

    /// Grant experience to a hunter-type pet
    ///
    /// The pet never outlevels its owner or the global cap; leftover
    /// experience carries into the next level.
    pub fn give_xp(&mut self, xp: u32, owner_level: u8) {
        if self.kind != PetKind::Hunter || !self.is_alive() {
            return;
        }
        let xp = (xp as f32 * self.config.xp_rate) as u32;
        if xp < 1 {
            return;
        }
        let max_level = self.config.max_level.min(owner_level);
        if self.level >= max_level {
            return;
        }

        let mut pool = self.experience.saturating_add(xp);
        while pool >= self.next_level_xp && self.level < max_level {
            pool -= self.next_level_xp;
            let next = self.level + 1;
            self.give_level(next);
        }
        self.experience = if self.level < max_level { pool } else { 0 };
    }

    /// Keep the pet's level within reach of its owner's
    pub fn sync_level_with_owner(&mut self, owner_level: u8) {
        match self.kind {
            PetKind::Summon => self.give_level(owner_level),
            PetKind::Hunter => {
                let gap = self.config.level_gap;
                if self.level > owner_level {
                    self.give_level(owner_level);
                } else if self.level as u32 + (gap as u32) < owner_level as u32 {
                    self.give_level(owner_level - gap);
                }
            }
        }
    }
}
