//! Data-driven definitions the core consumes: abilities, talents, families,
//! species, per-level stats, and the XP curve
//!
//! The catalog replaces per-species special cases with table lookups. It is
//! read-only at runtime; `familiar-script` fills it from RON.

use crate::{AbilityId, FamilyId, SpeciesId, TalentId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Upper bound on rank-chain walks; chains are short, corrupted data may loop
pub const MAX_RANK_STEPS: usize = 32;

/// Range requirements of an ability
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AbilityRange {
    /// Maximum distance to the target
    pub max: f32,
    /// Melee-range abilities lose twice the minimum melee reach
    #[serde(default)]
    pub melee: bool,
}

/// Attributes that decide whether an effect survives a save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectFlags {
    pub persistable: bool,
    pub cannot_cancel: bool,
    pub hidden: bool,
    pub transform: bool,
    pub interrupt_on_map_change: bool,
    /// Keeps counting down while the pet is unloaded even if beneficial
    pub expires_offline: bool,
    /// Removed when the pet enters an arena
    pub arena_restricted: bool,
}

impl Default for EffectFlags {
    fn default() -> Self {
        Self {
            persistable: true,
            cannot_cancel: false,
            hidden: false,
            transform: false,
            interrupt_on_map_change: false,
            expires_offline: false,
            arena_restricted: false,
        }
    }
}

/// One ability (and the effect it applies, if any)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDef {
    pub id: AbilityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prev_rank: Option<AbilityId>,
    #[serde(default)]
    pub next_rank: Option<AbilityId>,
    #[serde(default)]
    pub autocastable: bool,
    #[serde(default)]
    pub passive: bool,
    #[serde(default)]
    pub positive: bool,
    #[serde(default)]
    pub range: AbilityRange,
    #[serde(default)]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub category: u16,
    #[serde(default)]
    pub gcd_category: u16,
    #[serde(default)]
    pub gcd_ms: u64,
    /// Cooldown starts when an event fires rather than on cast
    #[serde(default)]
    pub cooldown_on_event: bool,
    #[serde(default)]
    pub spell_level: u8,
    #[serde(default)]
    pub proc_charges: u8,
    /// Duration of the applied effect, or of the summon for creation abilities
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub effect: EffectFlags,
}

impl AbilityDef {
    /// Minimal definition; the remaining fields take their defaults
    pub fn new(id: AbilityId) -> Self {
        Self {
            id,
            name: String::new(),
            prev_rank: None,
            next_rank: None,
            autocastable: false,
            passive: false,
            positive: false,
            range: AbilityRange::default(),
            cooldown_ms: 0,
            category: 0,
            gcd_category: 0,
            gcd_ms: 0,
            cooldown_on_event: false,
            spell_level: 0,
            proc_charges: 0,
            duration_ms: None,
            effect: EffectFlags::default(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn gcd(&self) -> Duration {
        Duration::from_millis(self.gcd_ms)
    }

    /// A creation ability with a positive duration makes a time-limited summon
    pub fn is_time_limited(&self) -> bool {
        self.duration_ms.is_some_and(|ms| ms > 0)
    }
}

/// Talent tree node with its ranks, lowest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentDef {
    pub id: TalentId,
    /// Bit per pet talent type that may use this talent
    pub pet_talent_mask: u32,
    pub ranks: Vec<AbilityId>,
}

/// Creature family shared by many species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyDef {
    pub id: FamilyId,
    #[serde(default)]
    pub name: String,
    /// Index into talent masks; `None` means the family has no talents
    #[serde(default)]
    pub talent_type: Option<u8>,
    #[serde(default)]
    pub passives: Vec<AbilityId>,
    /// (required level, ability) in ascending level order
    #[serde(default)]
    pub levelup: Vec<(u8, AbilityId)>,
    #[serde(default)]
    pub min_scale: f32,
    #[serde(default)]
    pub max_scale: f32,
    #[serde(default)]
    pub min_scale_level: u8,
    #[serde(default)]
    pub max_scale_level: u8,
}

/// Broad creature classification used by ownership rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CreatureType {
    #[default]
    Beast,
    Demon,
    Undead,
    Elemental,
    Other,
}

/// Weapon damage as a function of level
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DamageFormula {
    /// level - level/4 .. level + level/4
    #[default]
    LevelQuarter,
    /// level * m - level .. level * m + level
    Scaled(f32),
    /// (level / low)^3 .. (level / high)^3
    Cubic { low: f32, high: f32 },
    /// a * level + b for each bound
    Linear {
        min_a: f32,
        min_b: f32,
        max_a: f32,
        max_b: f32,
    },
    /// Use the level-stat table, falling back to `LevelQuarter`
    Table,
}

/// Creature template a pet is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDef {
    pub id: SpeciesId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub family: Option<FamilyId>,
    #[serde(default)]
    pub creature_type: CreatureType,
    #[serde(default)]
    pub tameable: bool,
    #[serde(default)]
    pub exotic: bool,
    /// Abilities every pet of this species knows (subject to spell level)
    #[serde(default)]
    pub default_abilities: Vec<AbilityId>,
    #[serde(default)]
    pub damage: DamageFormula,
    /// Effects applied to the pet whenever stats are recomputed
    #[serde(default)]
    pub bonus_effects: Vec<AbilityId>,
}

impl SpeciesDef {
    pub fn new(id: SpeciesId) -> Self {
        Self {
            id,
            name: String::new(),
            family: None,
            creature_type: CreatureType::Beast,
            tameable: false,
            exotic: false,
            default_abilities: Vec::new(),
            damage: DamageFormula::LevelQuarter,
            bonus_effects: Vec::new(),
        }
    }

    /// Whether an owner with the given permission may keep this species
    pub fn is_tameable(&self, can_tame_exotic: bool) -> bool {
        self.tameable && (!self.exotic || can_tame_exotic)
    }
}

/// Base numbers for one (stat key, level)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Species id, or 1 for the shared hunter-type table
    pub key: u32,
    pub level: u8,
    pub health: u32,
    pub mana: u32,
    #[serde(default)]
    pub armor: u32,
    #[serde(default)]
    pub min_damage: f32,
    #[serde(default)]
    pub max_damage: f32,
}

/// All definitions, indexed for lookup
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    abilities: IndexMap<AbilityId, AbilityDef>,
    talents: IndexMap<TalentId, TalentDef>,
    families: IndexMap<FamilyId, FamilyDef>,
    species: IndexMap<SpeciesId, SpeciesDef>,
    level_stats: HashMap<(u32, u8), LevelStats>,
    xp_per_level: Vec<u32>,
    /// ability -> (talent, zero-based rank)
    talent_ranks: HashMap<AbilityId, (TalentId, usize)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_ability(&mut self, def: AbilityDef) {
        self.abilities.insert(def.id, def);
    }

    pub fn insert_talent(&mut self, def: TalentDef) {
        for (rank, ability) in def.ranks.iter().enumerate() {
            self.talent_ranks.insert(*ability, (def.id, rank));
        }
        self.talents.insert(def.id, def);
    }

    pub fn insert_family(&mut self, def: FamilyDef) {
        self.families.insert(def.id, def);
    }

    pub fn insert_species(&mut self, def: SpeciesDef) {
        self.species.insert(def.id, def);
    }

    pub fn insert_level_stats(&mut self, stats: LevelStats) {
        self.level_stats.insert((stats.key, stats.level), stats);
    }

    /// XP curve; index 0 is level 1
    pub fn set_xp_table(&mut self, xp_per_level: Vec<u32>) {
        self.xp_per_level = xp_per_level;
    }

    pub fn ability(&self, id: AbilityId) -> Option<&AbilityDef> {
        self.abilities.get(&id)
    }

    pub fn has_ability(&self, id: AbilityId) -> bool {
        self.abilities.contains_key(&id)
    }

    pub fn family(&self, id: FamilyId) -> Option<&FamilyDef> {
        self.families.get(&id)
    }

    pub fn species(&self, id: SpeciesId) -> Option<&SpeciesDef> {
        self.species.get(&id)
    }

    pub fn talents(&self) -> impl Iterator<Item = &TalentDef> {
        self.talents.values()
    }

    pub fn level_stats(&self, key: u32, level: u8) -> Option<&LevelStats> {
        self.level_stats.get(&(key, level))
    }

    /// XP needed to finish `level`; quadratic fallback past the end of the table
    pub fn xp_for_level(&self, level: u8) -> u32 {
        let level = level.max(1);
        match self.xp_per_level.get(level as usize - 1) {
            Some(xp) => *xp,
            None => 100 * (level as u32) * (level as u32),
        }
    }

    /// Talent node and zero-based rank the ability belongs to
    pub fn talent_of(&self, ability: AbilityId) -> Option<(&TalentDef, usize)> {
        let (talent, rank) = self.talent_ranks.get(&ability)?;
        self.talents.get(talent).map(|def| (def, *rank))
    }

    /// Points spent by knowing this ability (rank n costs n)
    pub fn talent_cost(&self, ability: AbilityId) -> u32 {
        self.talent_ranks
            .get(&ability)
            .map(|(_, rank)| *rank as u32 + 1)
            .unwrap_or(0)
    }

    /// Every ability that is some rank of some talent
    pub fn talent_abilities(&self) -> impl Iterator<Item = AbilityId> + '_ {
        self.talent_ranks.keys().copied()
    }

    pub fn prev_rank(&self, id: AbilityId) -> Option<AbilityId> {
        self.ability(id).and_then(|def| def.prev_rank)
    }

    pub fn next_rank(&self, id: AbilityId) -> Option<AbilityId> {
        self.ability(id).and_then(|def| def.next_rank)
    }

    /// Lowest rank of the chain `id` belongs to
    pub fn first_rank(&self, id: AbilityId) -> AbilityId {
        let mut current = id;
        for _ in 0..MAX_RANK_STEPS {
            match self.prev_rank(current) {
                Some(prev) if prev != current => current = prev,
                _ => break,
            }
        }
        current
    }

    /// One-based rank within the chain
    pub fn rank_of(&self, id: AbilityId) -> usize {
        let mut rank = 1;
        let mut current = id;
        while rank < MAX_RANK_STEPS {
            match self.prev_rank(current) {
                Some(prev) if prev != current => {
                    current = prev;
                    rank += 1;
                }
                _ => break,
            }
        }
        rank
    }

    pub fn is_ranked(&self, id: AbilityId) -> bool {
        self.ability(id)
            .is_some_and(|def| def.prev_rank.is_some() || def.next_rank.is_some())
    }

    pub fn is_different_rank_of(&self, a: AbilityId, b: AbilityId) -> bool {
        a != b && self.first_rank(a) == self.first_rank(b)
    }

    pub fn is_higher_rank_of(&self, a: AbilityId, b: AbilityId) -> bool {
        self.is_different_rank_of(a, b) && self.rank_of(a) > self.rank_of(b)
    }

    /// Highest rank usable at `level`, walking down from `id`
    ///
    /// A rank stays usable up to ten levels above its spell level.
    pub fn rank_for_level(&self, id: AbilityId, level: u8) -> Option<AbilityId> {
        let def = self.ability(id)?;
        if def.spell_level <= level {
            return Some(id);
        }
        let mut current = Some(id);
        for _ in 0..MAX_RANK_STEPS {
            let Some(candidate) = current.and_then(|c| self.ability(c)) else {
                break;
            };
            if level as u32 + 10 >= candidate.spell_level as u32 {
                return Some(candidate.id);
            }
            current = candidate.prev_rank.filter(|prev| *prev != candidate.id);
        }
        None
    }
}
