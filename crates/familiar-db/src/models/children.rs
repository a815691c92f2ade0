//! Child rows joined to a pet by its number.

use super::child_key;
use crate::error::{Error, Result};
use familiar_core::{
    AbilityId, AbilityRow, ActiveState, ActorId, CooldownRow, DeclinedName, EffectDuration,
    EffectRecord, EffectSource,
};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Stored learned ability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredAbility {
    /// Primary key - pet and ability.
    #[primary_key]
    pub key: u64,
    pub pet: u32,
    /// Indexed for purges across all pets.
    #[secondary_key]
    pub ability: u32,
    /// Activation code, see `ActiveState::code`.
    pub active: u8,
}

impl StoredAbility {
    pub fn new(pet: u32, ability: AbilityId, active: ActiveState) -> Self {
        Self {
            key: child_key(pet, ability.raw()),
            pet,
            ability: ability.raw(),
            active: active.code(),
        }
    }

    pub fn to_row(&self) -> Result<AbilityRow> {
        let active = ActiveState::from_code(self.active).ok_or_else(|| {
            Error::Serialization(format!("pet {} ability {} active {:#x}", self.pet, self.ability, self.active))
        })?;
        Ok(AbilityRow {
            ability: AbilityId(self.ability),
            active,
        })
    }
}

/// Stored cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredCooldown {
    /// Primary key - pet and ability.
    #[primary_key]
    pub key: u64,
    pub pet: u32,
    pub ability: u32,
    pub category: u16,
    /// Unix seconds.
    pub expires_at: i64,
}

impl StoredCooldown {
    pub fn from_row(pet: u32, row: &CooldownRow) -> Self {
        Self {
            key: child_key(pet, row.ability.raw()),
            pet,
            ability: row.ability.raw(),
            category: row.category,
            expires_at: row.expires_at,
        }
    }

    pub fn to_row(&self) -> CooldownRow {
        CooldownRow {
            ability: AbilityId(self.ability),
            category: self.category,
            expires_at: self.expires_at,
        }
    }
}

/// Stored effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 4, version = 1)]
#[native_db]
pub struct StoredEffect {
    /// Primary key - pet and a per-pet row slot.
    #[primary_key]
    pub key: u64,
    pub pet: u32,
    pub ability: u32,
    pub caster: Option<u64>,
    pub effect_mask: u8,
    pub recalculate_mask: u8,
    pub stack_count: u8,
    /// Serialized current and base amounts.
    pub amounts: Vec<u8>,
    /// Milliseconds, -1 for permanent.
    pub max_duration: i64,
    /// Milliseconds, -1 for permanent.
    pub remaining: i64,
    pub charges: u8,
}

impl StoredEffect {
    /// Create from an effect record stored in `slot` of the pet's rows.
    pub fn from_effect(pet: u32, slot: u32, effect: &EffectRecord) -> Self {
        let amounts = bincode::serialize(&(effect.amounts, effect.base_amounts)).unwrap_or_default();
        Self {
            key: child_key(pet, slot),
            pet,
            ability: effect.ability.raw(),
            caster: effect.caster.map(|c| c.raw()),
            effect_mask: effect.effect_mask,
            recalculate_mask: effect.recalculate_mask,
            stack_count: effect.stack_count,
            amounts,
            max_duration: effect.max_duration.as_millis(),
            remaining: effect.remaining.as_millis(),
            charges: effect.charges,
        }
    }

    /// Row slot within the pet's key range.
    pub fn slot(&self) -> u32 {
        self.key as u32
    }

    /// Whether this row holds the same ability, caster and effect mask.
    pub fn holds(&self, effect: &EffectRecord) -> bool {
        self.ability == effect.ability.raw()
            && self.caster == effect.caster.map(|c| c.raw())
            && self.effect_mask == effect.effect_mask
    }

    /// Convert to an effect record.
    pub fn to_effect(&self) -> Result<EffectRecord> {
        let (amounts, base_amounts): ([i32; 3], [i32; 3]) = bincode::deserialize(&self.amounts)
            .map_err(|e| Error::Serialization(format!("pet {} effect {}: {}", self.pet, self.ability, e)))?;
        Ok(EffectRecord {
            ability: AbilityId(self.ability),
            caster: self.caster.map(ActorId::new),
            effect_mask: self.effect_mask,
            recalculate_mask: self.recalculate_mask,
            stack_count: self.stack_count,
            amounts,
            base_amounts,
            max_duration: EffectDuration::from_millis(self.max_duration),
            remaining: EffectDuration::from_millis(self.remaining),
            charges: self.charges,
            source: EffectSource::Cast,
        })
    }
}

/// Stored grammatical forms of a pet name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 5, version = 1)]
#[native_db]
pub struct StoredDeclinedName {
    /// Primary key - pet number.
    #[primary_key]
    pub pet: u32,
    pub forms: Vec<String>,
}

impl StoredDeclinedName {
    pub fn from_name(pet: u32, name: &DeclinedName) -> Self {
        Self {
            pet,
            forms: name.forms.to_vec(),
        }
    }

    pub fn to_name(&self) -> DeclinedName {
        let mut name = DeclinedName::default();
        for (form, stored) in name.forms.iter_mut().zip(&self.forms) {
            form.clone_from(stored);
        }
        name
    }
}
