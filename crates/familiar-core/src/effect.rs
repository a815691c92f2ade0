//! Active temporary effects and their save/restore policy

use crate::{AbilityDef, AbilityId, ActorId, Catalog, PetConfig, PetNumber, StoreOp};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

/// Remaining or total lifetime of an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectDuration {
    Permanent,
    Timed(Duration),
}

impl EffectDuration {
    /// Stored form: milliseconds, `-1` for permanent
    pub fn as_millis(&self) -> i64 {
        match self {
            EffectDuration::Permanent => -1,
            EffectDuration::Timed(left) => left.as_millis() as i64,
        }
    }

    pub fn from_millis(ms: i64) -> Self {
        if ms < 0 {
            EffectDuration::Permanent
        } else {
            EffectDuration::Timed(Duration::from_millis(ms as u64))
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, EffectDuration::Permanent)
    }
}

/// How the effect got onto the pet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectSource {
    #[default]
    Cast,
    /// Effect of a passive ability
    Passive,
    /// Granted by the owner; reapplied rather than saved
    Owner,
    /// Species bonus applied with derived stats
    Species,
}

/// Persisted and runtime form of one effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRecord {
    pub ability: AbilityId,
    /// `None` when the pet applied it to itself
    pub caster: Option<ActorId>,
    /// Which of the three slots are active
    pub effect_mask: u8,
    /// Which slots recompute their magnitude
    pub recalculate_mask: u8,
    pub stack_count: u8,
    pub amounts: [i32; 3],
    pub base_amounts: [i32; 3],
    pub max_duration: EffectDuration,
    pub remaining: EffectDuration,
    pub charges: u8,
    #[serde(skip)]
    pub source: EffectSource,
}

impl EffectRecord {
    /// A single-stack self effect lasting `duration`
    pub fn new(ability: AbilityId, duration: EffectDuration) -> Self {
        Self {
            ability,
            caster: None,
            effect_mask: 0b001,
            recalculate_mask: 0,
            stack_count: 1,
            amounts: [0; 3],
            base_amounts: [0; 3],
            max_duration: duration,
            remaining: duration,
            charges: 0,
            source: EffectSource::Cast,
        }
    }

    pub fn with_source(mut self, source: EffectSource) -> Self {
        self.source = source;
        self
    }
}

/// Whether an effect survives a save
pub fn is_persistable(effect: &EffectRecord, def: &AbilityDef, config: &PetConfig) -> bool {
    if effect.source != EffectSource::Cast || def.passive || !def.effect.persistable {
        return false;
    }
    match effect.remaining {
        EffectDuration::Permanent if !def.positive => return false,
        EffectDuration::Timed(left) if left < config.effect_save_floor() => return false,
        _ => {}
    }
    let flags = def.effect;
    !(flags.cannot_cancel || flags.hidden || flags.transform || flags.interrupt_on_map_change)
}

/// The pet's active effects
#[derive(Debug, Clone, Default)]
pub struct EffectSet {
    effects: Vec<EffectRecord>,
}

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an effect, replacing one from the same ability and caster
    pub fn apply(&mut self, effect: EffectRecord) {
        match self
            .effects
            .iter_mut()
            .find(|e| e.ability == effect.ability && e.caster == effect.caster)
        {
            Some(existing) => *existing = effect,
            None => self.effects.push(effect),
        }
    }

    pub fn has(&self, ability: AbilityId) -> bool {
        self.effects.iter().any(|e| e.ability == ability)
    }

    pub fn get(&self, ability: AbilityId) -> Option<&EffectRecord> {
        self.effects.iter().find(|e| e.ability == ability)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectRecord> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn remove(&mut self, ability: AbilityId) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.ability != ability);
        before != self.effects.len()
    }

    pub fn remove_where(&mut self, mut predicate: impl FnMut(&EffectRecord) -> bool) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| !predicate(e));
        before - self.effects.len()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Count timed effects down; expired ones are dropped
    pub fn expire(&mut self, diff: Duration) {
        self.effects.retain_mut(|effect| match effect.remaining {
            EffectDuration::Permanent => true,
            EffectDuration::Timed(left) => match left.checked_sub(diff) {
                Some(left) if !left.is_zero() => {
                    effect.remaining = EffectDuration::Timed(left);
                    true
                }
                _ => false,
            },
        });
    }

    /// Store operations replacing the saved effects of `pet`
    pub fn flush(&self, pet: PetNumber, catalog: &Catalog, config: &PetConfig) -> Vec<StoreOp> {
        let mut ops = vec![StoreOp::DeleteEffects { pet }];
        ops.extend(
            self.effects
                .iter()
                .filter(|effect| {
                    catalog
                        .ability(effect.ability)
                        .is_some_and(|def| is_persistable(effect, def, config))
                })
                .map(|effect| StoreOp::InsertEffect {
                    pet,
                    effect: effect.clone(),
                }),
        );
        ops
    }

    /// Rebuild a persisted effect for a pet of `level` that was away `elapsed`
    ///
    /// Harmful effects and effects flagged to expire offline keep counting
    /// down while the pet is unloaded.
    pub fn restore(
        &mut self,
        mut record: EffectRecord,
        elapsed: Duration,
        level: u8,
        catalog: &Catalog,
    ) -> bool {
        let Some(def) = catalog.ability(record.ability) else {
            error!(ability = %record.ability, "unknown ability in saved effect, skipping");
            return false;
        };
        let Some(def) = catalog
            .rank_for_level(def.id, level)
            .and_then(|id| catalog.ability(id))
        else {
            return false;
        };
        record.ability = def.id;

        if let EffectDuration::Timed(left) = record.remaining {
            if !def.positive || def.effect.expires_offline {
                if left.as_secs() <= elapsed.as_secs() {
                    return false;
                }
                record.remaining = EffectDuration::Timed(left - elapsed);
            }
        }

        record.charges = match def.proc_charges {
            0 => 0,
            max if record.charges == 0 || record.charges > max => max,
            _ => record.charges,
        };
        record.source = EffectSource::Cast;

        // Restored effects must still be saveable, apart from the time floor.
        let flags = def.effect;
        if !flags.persistable || def.passive || flags.hidden || flags.transform {
            return false;
        }
        self.apply(record);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AbilityDef;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        let mut buff = AbilityDef::new(AbilityId(1));
        buff.positive = true;
        buff.proc_charges = 3;
        catalog.insert_ability(buff);
        catalog.insert_ability(AbilityDef::new(AbilityId(2)));
        let mut hidden = AbilityDef::new(AbilityId(3));
        hidden.positive = true;
        hidden.effect.hidden = true;
        catalog.insert_ability(hidden);
        let mut offline = AbilityDef::new(AbilityId(4));
        offline.positive = true;
        offline.effect.expires_offline = true;
        catalog.insert_ability(offline);
        catalog
    }

    fn timed(ability: u32, secs: u64) -> EffectRecord {
        EffectRecord::new(AbilityId(ability), EffectDuration::Timed(Duration::from_secs(secs)))
    }

    fn saved(set: &EffectSet) -> Vec<AbilityId> {
        set.flush(PetNumber(1), &catalog(), &PetConfig::default())
            .into_iter()
            .filter_map(|op| match op {
                StoreOp::InsertEffect { effect, .. } => Some(effect.ability),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_save_floor_boundary() {
        let mut set = EffectSet::new();
        set.apply(timed(1, 60));
        assert_eq!(saved(&set), vec![AbilityId(1)]);

        let mut set = EffectSet::new();
        let mut short = timed(1, 0);
        short.remaining = EffectDuration::Timed(Duration::from_millis(59_999));
        set.apply(short);
        assert!(saved(&set).is_empty());
    }

    #[test]
    fn test_save_filters() {
        let mut set = EffectSet::new();
        set.apply(EffectRecord::new(AbilityId(1), EffectDuration::Permanent));
        set.apply(EffectRecord::new(AbilityId(2), EffectDuration::Permanent));
        set.apply(timed(3, 600));
        set.apply(timed(4, 600).with_source(EffectSource::Owner));
        assert_eq!(saved(&set), vec![AbilityId(1)]);
    }

    #[test]
    fn test_same_ability_from_two_casters_flushes_both() {
        let mut set = EffectSet::new();
        let mut first = EffectRecord::new(AbilityId(1), EffectDuration::Permanent);
        first.caster = Some(ActorId(1));
        let mut second = first.clone();
        second.caster = Some(ActorId(2));
        set.apply(first.clone());
        set.apply(second.clone());
        let mut again = first.clone();
        again.stack_count = 2;
        set.apply(again.clone());
        assert_eq!(set.len(), 2);

        let ops = set.flush(PetNumber(1), &catalog(), &PetConfig::default());
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0], StoreOp::DeleteEffects { pet: PetNumber(1) });
        let inserted: Vec<_> = ops
            .into_iter()
            .filter_map(|op| match op {
                StoreOp::InsertEffect { effect, .. } => Some(effect),
                _ => None,
            })
            .collect();
        assert_eq!(inserted, vec![again, second]);
    }

    #[test]
    fn test_restore_counts_down_harmful() {
        let catalog = catalog();
        let mut set = EffectSet::new();
        assert!(!set.restore(timed(2, 100), Duration::from_secs(100), 10, &catalog));
        assert!(set.restore(timed(2, 100), Duration::from_secs(40), 10, &catalog));
        assert_eq!(
            set.get(AbilityId(2)).map(|e| e.remaining),
            Some(EffectDuration::Timed(Duration::from_secs(60)))
        );
    }

    #[test]
    fn test_restore_keeps_beneficial_time() {
        let catalog = catalog();
        let mut set = EffectSet::new();
        assert!(set.restore(timed(1, 100), Duration::from_secs(500), 10, &catalog));
        assert_eq!(
            set.get(AbilityId(1)).map(|e| e.remaining),
            Some(EffectDuration::Timed(Duration::from_secs(100)))
        );
        assert!(!set.restore(timed(4, 100), Duration::from_secs(500), 10, &catalog));
    }

    #[test]
    fn test_restore_clamps_charges() {
        let catalog = catalog();
        let mut set = EffectSet::new();
        let mut buff = timed(1, 100);
        buff.charges = 9;
        set.restore(buff, Duration::ZERO, 10, &catalog);
        assert_eq!(set.get(AbilityId(1)).map(|e| e.charges), Some(3));

        let mut debuff = timed(2, 100);
        debuff.charges = 2;
        set.restore(debuff, Duration::ZERO, 10, &catalog);
        assert_eq!(set.get(AbilityId(2)).map(|e| e.charges), Some(0));
    }

    #[test]
    fn test_expire() {
        let mut set = EffectSet::new();
        set.apply(timed(1, 2));
        set.apply(EffectRecord::new(AbilityId(2), EffectDuration::Permanent));
        set.expire(Duration::from_secs(2));
        assert!(!set.has(AbilityId(1)));
        assert!(set.has(AbilityId(2)));
    }
}
