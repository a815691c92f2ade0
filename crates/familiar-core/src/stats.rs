//! Derived stats and happiness helpers

use crate::{Catalog, DamageFormula, FamilyDef, PetKind, SpeciesDef};

/// Stat key shared by every hunter-type pet
pub const HUNTER_STAT_KEY: u32 = 1;

/// Stats recomputed on every level change
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedStats {
    pub max_health: u32,
    pub max_mana: u32,
    pub armor: u32,
    pub min_damage: f32,
    pub max_damage: f32,
}

impl DerivedStats {
    pub fn compute(species: &SpeciesDef, kind: PetKind, level: u8, catalog: &Catalog) -> Self {
        let key = match kind {
            PetKind::Hunter => HUNTER_STAT_KEY,
            PetKind::Summon => species.id.raw(),
        };
        let lvl = level.max(1) as u32;
        let table = catalog.level_stats(key, level);
        let (max_health, max_mana, armor) = match table {
            Some(stats) => (stats.health, stats.mana, stats.armor),
            None => (28 + 30 * lvl, 28 + 10 * lvl, 50 * lvl),
        };

        let level = lvl as f32;
        let quarter = (level - level / 4.0, level + level / 4.0);
        let (min_damage, max_damage) = match species.damage {
            DamageFormula::LevelQuarter => quarter,
            DamageFormula::Scaled(m) => (level * m - level, level * m + level),
            DamageFormula::Cubic { low, high } => ((level / low).powi(3), (level / high).powi(3)),
            DamageFormula::Linear {
                min_a,
                min_b,
                max_a,
                max_b,
            } => (min_a * level + min_b, max_a * level + max_b),
            DamageFormula::Table => match table {
                Some(stats) if stats.max_damage > 0.0 => (stats.min_damage, stats.max_damage),
                _ => quarter,
            },
        };

        Self {
            max_health,
            max_mana,
            armor,
            min_damage,
            max_damage,
        }
    }
}

/// Display scale of a hunter-type pet between the family's bounds
pub fn native_scale(family: &FamilyDef, level: u8) -> f32 {
    if family.max_scale <= 0.0 {
        return 1.0;
    }
    if level >= family.max_scale_level {
        return family.max_scale;
    }
    if level <= family.min_scale_level {
        return family.min_scale;
    }
    let span = (family.max_scale_level - family.min_scale_level) as f32;
    let progress = (level - family.min_scale_level) as f32 / span;
    family.min_scale + (family.max_scale - family.min_scale) * progress
}

/// Derived read of the happiness resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HappinessTier {
    Unhappy,
    Content,
    Happy,
}

impl HappinessTier {
    pub fn of(happiness: u32, tier_size: u32) -> Self {
        if happiness < tier_size {
            HappinessTier::Unhappy
        } else if happiness >= tier_size * 2 {
            HappinessTier::Happy
        } else {
            HappinessTier::Content
        }
    }
}

/// Happiness gained from food of `item_level`
pub fn food_benefit(pet_level: u8, item_level: u8) -> u32 {
    match pet_level.saturating_sub(item_level) {
        0..=5 => 35_000,
        6..=10 => 17_000,
        11..=14 => 8_000,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FamilyId, LevelStats, SpeciesId};

    #[test]
    fn test_fallback_stats() {
        let species = SpeciesDef::new(SpeciesId(5));
        let stats = DerivedStats::compute(&species, PetKind::Summon, 10, &Catalog::new());
        assert_eq!(stats.max_health, 328);
        assert_eq!(stats.max_mana, 128);
        assert_eq!(stats.armor, 500);
        assert_eq!((stats.min_damage, stats.max_damage), (7.5, 12.5));
    }

    #[test]
    fn test_hunter_uses_shared_table() {
        let mut catalog = Catalog::new();
        catalog.insert_level_stats(LevelStats {
            key: HUNTER_STAT_KEY,
            level: 30,
            health: 1_500,
            mana: 0,
            armor: 900,
            min_damage: 40.0,
            max_damage: 55.0,
        });
        let mut species = SpeciesDef::new(SpeciesId(77));
        species.damage = DamageFormula::Table;
        let stats = DerivedStats::compute(&species, PetKind::Hunter, 30, &catalog);
        assert_eq!(stats.max_health, 1_500);
        assert_eq!((stats.min_damage, stats.max_damage), (40.0, 55.0));
    }

    #[test]
    fn test_damage_formulas() {
        let mut species = SpeciesDef::new(SpeciesId(1));
        species.damage = DamageFormula::Scaled(2.0);
        let stats = DerivedStats::compute(&species, PetKind::Summon, 20, &Catalog::new());
        assert_eq!((stats.min_damage, stats.max_damage), (20.0, 60.0));

        species.damage = DamageFormula::Cubic { low: 12.0, high: 11.0 };
        let stats = DerivedStats::compute(&species, PetKind::Summon, 24, &Catalog::new());
        assert_eq!(stats.min_damage, 8.0);
    }

    #[test]
    fn test_happiness_tiers() {
        assert_eq!(HappinessTier::of(0, 333_000), HappinessTier::Unhappy);
        assert_eq!(HappinessTier::of(333_000, 333_000), HappinessTier::Content);
        assert_eq!(HappinessTier::of(666_000, 333_000), HappinessTier::Happy);
    }

    #[test]
    fn test_food_benefit() {
        assert_eq!(food_benefit(40, 38), 35_000);
        assert_eq!(food_benefit(40, 50), 35_000);
        assert_eq!(food_benefit(40, 32), 17_000);
        assert_eq!(food_benefit(40, 27), 8_000);
        assert_eq!(food_benefit(40, 26), 8_000);
        assert_eq!(food_benefit(40, 25), 0);
    }

    #[test]
    fn test_native_scale() {
        let family = FamilyDef {
            id: FamilyId(1),
            name: String::new(),
            talent_type: None,
            passives: Vec::new(),
            levelup: Vec::new(),
            min_scale: 0.5,
            max_scale: 1.0,
            min_scale_level: 10,
            max_scale_level: 60,
        };
        assert_eq!(native_scale(&family, 1), 0.5);
        assert_eq!(native_scale(&family, 35), 0.75);
        assert_eq!(native_scale(&family, 70), 1.0);
    }
}
