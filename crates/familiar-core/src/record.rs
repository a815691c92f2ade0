//! Persisted pet snapshot and the owner's stable of known pets

use crate::{AbilityId, ActorId, DisplayId, Error, PetNumber, Result, SpeciesId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Number of stable slots an owner has
pub const STABLE_SLOTS: usize = 4;

/// Companion category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PetKind {
    /// Fully owner-bound; snaps to the owner's level, uses mana
    Summon,
    /// Semi-independent; gains XP, has happiness and focus
    Hunter,
}

/// Which resource pool the pet spends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerKind {
    Mana,
    Focus,
}

impl PetKind {
    pub fn power(&self) -> PowerKind {
        match self {
            PetKind::Summon => PowerKind::Mana,
            PetKind::Hunter => PowerKind::Focus,
        }
    }
}

/// Combat stance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReactState {
    Passive,
    #[default]
    Defensive,
    Aggressive,
}

/// Where a record is saved
///
/// Ordered `Deleted < AsCurrent < Stable(1) < .. < Stable(4) < NotInSlot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaveMode {
    Deleted,
    AsCurrent,
    /// One-based stable slot
    Stable(u8),
    NotInSlot,
}

impl SaveMode {
    /// Stored slot code
    pub fn code(&self) -> i16 {
        match self {
            SaveMode::Deleted => -1,
            SaveMode::AsCurrent => 0,
            SaveMode::Stable(n) => *n as i16,
            SaveMode::NotInSlot => 100,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            -1 => Some(SaveMode::Deleted),
            0 => Some(SaveMode::AsCurrent),
            n if n >= 1 && n as usize <= STABLE_SLOTS => Some(SaveMode::Stable(n as u8)),
            100 => Some(SaveMode::NotInSlot),
            _ => None,
        }
    }

    pub fn is_stable_slot(&self) -> bool {
        matches!(self, SaveMode::Stable(_))
    }

    /// Last stable slot
    pub fn last_stable() -> Self {
        SaveMode::Stable(STABLE_SLOTS as u8)
    }
}

impl PartialOrd for SaveMode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SaveMode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code().cmp(&other.code())
    }
}

/// Five grammatical case forms of the pet name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeclinedName {
    pub forms: [String; 5],
}

/// Serializable snapshot of one pet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetRecord {
    pub number: PetNumber,
    pub owner: ActorId,
    pub species: SpeciesId,
    pub kind: PetKind,
    pub display: DisplayId,
    pub level: u8,
    pub experience: u32,
    pub happiness: u32,
    pub health: u32,
    pub mana: u32,
    pub react_state: ReactState,
    pub name: String,
    /// Whether the name may still be changed
    pub renamable: bool,
    /// Ability that created the pet; time-limited if that ability has a duration
    pub creation_ability: Option<AbilityId>,
    pub slot: SaveMode,
    /// Encoded action bar, see `ActionBar::encode`
    pub action_bar: String,
    /// Wall-clock Unix seconds of the last save
    pub saved_at: i64,
}

impl PetRecord {
    /// A blank record at level 1, not yet placed in any slot
    pub fn new(number: PetNumber, owner: ActorId, species: SpeciesId, kind: PetKind) -> Self {
        Self {
            number,
            owner,
            species,
            kind,
            display: DisplayId::default(),
            level: 1,
            experience: 0,
            happiness: 0,
            health: 0,
            mana: 0,
            react_state: ReactState::default(),
            name: String::new(),
            renamable: false,
            creation_ability: None,
            slot: SaveMode::NotInSlot,
            action_bar: String::new(),
            saved_at: 0,
        }
    }
}

/// Criterion for picking the record to load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSelection {
    pub number: Option<PetNumber>,
    pub current: bool,
    pub species: Option<SpeciesId>,
}

impl LoadSelection {
    pub fn by_number(number: PetNumber) -> Self {
        Self {
            number: Some(number),
            ..Self::default()
        }
    }

    pub fn current() -> Self {
        Self {
            current: true,
            ..Self::default()
        }
    }

    pub fn by_species(species: SpeciesId) -> Self {
        Self {
            species: Some(species),
            ..Self::default()
        }
    }
}

/// The owner's known pets: one current, a few stable slots, and the rest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetStable {
    pub current: Option<PetRecord>,
    pub stabled: [Option<PetRecord>; STABLE_SLOTS],
    pub unslotted: Vec<PetRecord>,
}

impl PetStable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.stabled.iter().all(Option::is_none) && self.unslotted.is_empty()
    }

    /// Every known record with the slot it occupies
    pub fn iter(&self) -> impl Iterator<Item = (SaveMode, &PetRecord)> {
        let current = self.current.iter().map(|r| (SaveMode::AsCurrent, r));
        let stabled = self
            .stabled
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().map(|r| (SaveMode::Stable(i as u8 + 1), r)));
        let unslotted = self.unslotted.iter().map(|r| (SaveMode::NotInSlot, r));
        current.chain(stabled).chain(unslotted)
    }

    pub fn find(&self, number: PetNumber) -> Option<&PetRecord> {
        self.iter().find(|(_, r)| r.number == number).map(|(_, r)| r)
    }

    pub fn current_number(&self) -> Option<PetNumber> {
        self.current.as_ref().map(|r| r.number)
    }

    /// Place a record according to its own slot mode
    pub fn insert(&mut self, record: PetRecord) {
        match record.slot {
            SaveMode::Deleted => {}
            SaveMode::AsCurrent => {
                if let Some(previous) = self.current.replace(record) {
                    self.unslotted.push(previous);
                }
            }
            SaveMode::Stable(n) => match self.stabled.get_mut((n as usize).wrapping_sub(1)) {
                Some(slot) if slot.is_none() => *slot = Some(record),
                _ => self.unslotted.push(record),
            },
            SaveMode::NotInSlot => self.unslotted.push(record),
        }
    }

    /// Resolve the record a load should use, with the slot it came from
    ///
    /// Precedence:
    /// 1. an explicit number: current, then stable slots, then unslotted
    /// 2. `current` requested: the current record only
    /// 3. a species: current if it matches, else the first matching unslotted
    /// 4. otherwise: current, else the first unslotted
    pub fn select(&self, selection: &LoadSelection) -> Option<(SaveMode, &PetRecord)> {
        if let Some(number) = selection.number {
            return self.iter().find(|(_, r)| r.number == number);
        }
        let current = self.current.as_ref().map(|r| (SaveMode::AsCurrent, r));
        if selection.current {
            return current;
        }
        if let Some(species) = selection.species {
            return current.filter(|(_, r)| r.species == species).or_else(|| {
                self.unslotted
                    .iter()
                    .find(|r| r.species == species)
                    .map(|r| (SaveMode::NotInSlot, r))
            });
        }
        current.or_else(|| self.unslotted.first().map(|r| (SaveMode::NotInSlot, r)))
    }

    /// Move a record into the current slot from wherever it is
    ///
    /// A stable-slot record swaps with the current one; an unslotted record
    /// pushes the current one to the unslotted list.
    pub fn promote(&mut self, number: PetNumber, from: SaveMode) -> Result<()> {
        match from {
            SaveMode::AsCurrent => match self.current_number() {
                Some(current) if current == number => Ok(()),
                _ => Err(Error::NotFound),
            },
            SaveMode::Stable(n) => {
                let slot = self
                    .stabled
                    .get_mut((n as usize).wrapping_sub(1))
                    .filter(|slot| slot.as_ref().is_some_and(|r| r.number == number))
                    .ok_or(Error::NotFound)?;
                std::mem::swap(slot, &mut self.current);
                if let Some(record) = slot.as_mut() {
                    record.slot = SaveMode::Stable(n);
                }
                if let Some(record) = self.current.as_mut() {
                    record.slot = SaveMode::AsCurrent;
                }
                Ok(())
            }
            SaveMode::NotInSlot => {
                let index = self
                    .unslotted
                    .iter()
                    .position(|r| r.number == number)
                    .ok_or(Error::NotFound)?;
                let mut record = self.unslotted.remove(index);
                record.slot = SaveMode::AsCurrent;
                if let Some(mut previous) = self.current.replace(record) {
                    previous.slot = SaveMode::NotInSlot;
                    self.unslotted.push(previous);
                }
                Ok(())
            }
            SaveMode::Deleted => Err(Error::NotFound),
        }
    }

    /// Apply the bookkeeping of a removal to the current record
    ///
    /// `record` is the snapshot taken by the save, if any.
    pub fn retire_current(&mut self, mode: SaveMode, record: Option<PetRecord>) {
        let Some(mut record) = record.or_else(|| self.current.clone()) else {
            return;
        };
        record.slot = mode;
        match mode {
            SaveMode::AsCurrent => self.current = Some(record),
            SaveMode::Deleted => self.current = None,
            SaveMode::Stable(n) => {
                self.current = None;
                if let Some(slot) = self.stabled.get_mut((n as usize).wrapping_sub(1)) {
                    *slot = Some(record);
                }
            }
            SaveMode::NotInSlot => {
                self.current = None;
                self.unslotted.push(record);
            }
        }
    }

    /// Replace the stored snapshot of the current pet
    pub fn refresh_current(&mut self, record: PetRecord) {
        if self.current_number() == Some(record.number) {
            self.current = Some(record);
        }
    }
}
