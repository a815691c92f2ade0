//! Pet record and allocator rows.

use crate::error::{Error, Result};
use familiar_core::{
    AbilityId, ActorId, DisplayId, PetKind, PetNumber, PetRecord, ReactState, SaveMode, SpeciesId,
};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Stored pet record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredPet {
    /// Primary key - pet number.
    #[primary_key]
    pub number: u32,
    /// Owning actor.
    #[secondary_key]
    pub owner: u64,
    /// Creature template.
    pub species: u32,
    /// 0 summon, 1 hunter.
    pub kind: u8,
    pub display: u32,
    pub level: u8,
    pub experience: u32,
    pub happiness: u32,
    pub health: u32,
    pub mana: u32,
    /// 0 passive, 1 defensive, 2 aggressive.
    pub react_state: u8,
    pub name: String,
    pub renamable: bool,
    pub creation_ability: Option<u32>,
    /// Slot code, see `SaveMode::code`.
    pub slot: i16,
    /// Encoded action bar.
    pub action_bar: String,
    /// Unix seconds of the last save.
    pub saved_at: i64,
}

impl StoredPet {
    /// Create from a pet record.
    pub fn from_record(record: &PetRecord) -> Self {
        Self {
            number: record.number.raw(),
            owner: record.owner.raw(),
            species: record.species.raw(),
            kind: match record.kind {
                PetKind::Summon => 0,
                PetKind::Hunter => 1,
            },
            display: record.display.0,
            level: record.level,
            experience: record.experience,
            happiness: record.happiness,
            health: record.health,
            mana: record.mana,
            react_state: match record.react_state {
                ReactState::Passive => 0,
                ReactState::Defensive => 1,
                ReactState::Aggressive => 2,
            },
            name: record.name.clone(),
            renamable: record.renamable,
            creation_ability: record.creation_ability.map(|a| a.raw()),
            slot: record.slot.code(),
            action_bar: record.action_bar.clone(),
            saved_at: record.saved_at,
        }
    }

    /// Convert to a pet record.
    pub fn to_record(&self) -> Result<PetRecord> {
        let kind = match self.kind {
            0 => PetKind::Summon,
            1 => PetKind::Hunter,
            other => return Err(Error::Serialization(format!("pet {} kind {}", self.number, other))),
        };
        let slot = SaveMode::from_code(self.slot)
            .ok_or_else(|| Error::Serialization(format!("pet {} slot {}", self.number, self.slot)))?;
        let react_state = match self.react_state {
            0 => ReactState::Passive,
            2 => ReactState::Aggressive,
            _ => ReactState::Defensive,
        };
        Ok(PetRecord {
            number: PetNumber::new(self.number),
            owner: ActorId::new(self.owner),
            species: SpeciesId(self.species),
            kind,
            display: DisplayId(self.display),
            level: self.level,
            experience: self.experience,
            happiness: self.happiness,
            health: self.health,
            mana: self.mana,
            react_state,
            name: self.name.clone(),
            renamable: self.renamable,
            creation_ability: self.creation_ability.map(AbilityId),
            slot,
            action_bar: self.action_bar.clone(),
            saved_at: self.saved_at,
        })
    }

    pub fn is_hunter(&self) -> bool {
        self.kind == 1
    }
}

/// Last pet number handed out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 6, version = 1)]
#[native_db]
pub struct StoredCounter {
    /// Always "pet_number" - single row.
    #[primary_key]
    pub id: String,
    pub value: u32,
}

impl StoredCounter {
    pub const PET_NUMBER: &'static str = "pet_number";
}
