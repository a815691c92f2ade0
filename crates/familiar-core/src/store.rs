//! Persistence seam
//!
//! The core never talks to a database. Saves are folded into [`StoreOp`]
//! batches and handed to a [`PetStore`] for a single transactional commit.
//! The load fetch goes through [`AsyncFetch`], whose completions are drained
//! on the simulation thread.

use crate::{
    AbilityId, ActiveState, ActorId, CooldownRow, DeclinedName, EffectRecord, PetHandle, PetNumber,
    PetRecord, PetStable, Result, SaveMode, SessionId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One write against the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreOp {
    DeleteEffects {
        pet: PetNumber,
    },
    InsertEffect {
        pet: PetNumber,
        effect: EffectRecord,
    },
    DeleteAbility {
        pet: PetNumber,
        ability: AbilityId,
    },
    InsertAbility {
        pet: PetNumber,
        ability: AbilityId,
        active: ActiveState,
    },
    DeleteAbilities {
        pet: PetNumber,
    },
    /// Remove an ability from every pet
    PurgeAbility(AbilityId),
    DeleteCooldowns {
        pet: PetNumber,
    },
    InsertCooldown {
        pet: PetNumber,
        row: CooldownRow,
    },
    DeleteDeclinedName {
        pet: PetNumber,
    },
    /// Insert the declined forms, replacing any saved ones
    SaveDeclinedName {
        pet: PetNumber,
        name: DeclinedName,
    },
    DeletePet {
        pet: PetNumber,
    },
    /// Delete hunter-type records of `owner` in slots `from..=to`, except `except`
    DeleteHunterPetsInSlots {
        owner: ActorId,
        except: PetNumber,
        from: SaveMode,
        to: SaveMode,
    },
    /// Insert the record, replacing any with the same number
    ReplacePet(PetRecord),
}

/// A persisted ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRow {
    pub ability: AbilityId,
    pub active: ActiveState,
}

/// Everything the load fetch returns for one pet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildRows {
    pub declined_name: Option<DeclinedName>,
    pub effects: Vec<EffectRecord>,
    pub abilities: Vec<AbilityRow>,
    pub cooldowns: Vec<CooldownRow>,
}

/// Identity a load completion must still match when it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub handle: PetHandle,
    pub owner: ActorId,
    pub session: SessionId,
    pub pet: PetNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: LoadTicket,
}

#[derive(Debug)]
pub struct FetchCompletion {
    pub ticket: LoadTicket,
    pub rows: Result<ChildRows>,
}

/// Record-oriented store keyed by pet number and owner
pub trait PetStore {
    /// Apply every operation in one transaction
    fn commit(&self, ops: &[StoreOp]) -> Result<()>;

    /// Read the child records of a pet
    fn fetch_children(&self, pet: PetNumber) -> Result<ChildRows>;

    /// Rebuild an owner's stable from the persisted records
    fn load_stable(&self, owner: ActorId) -> Result<PetStable>;

    /// Allocate a pet number never handed out before
    fn next_pet_number(&self) -> Result<PetNumber>;
}

impl<T: PetStore + ?Sized> PetStore for Arc<T> {
    fn commit(&self, ops: &[StoreOp]) -> Result<()> {
        (**self).commit(ops)
    }

    fn fetch_children(&self, pet: PetNumber) -> Result<ChildRows> {
        (**self).fetch_children(pet)
    }

    fn load_stable(&self, owner: ActorId) -> Result<PetStable> {
        (**self).load_stable(owner)
    }

    fn next_pet_number(&self) -> Result<PetNumber> {
        (**self).next_pet_number()
    }
}

/// Off-thread execution of the load fetch
pub trait AsyncFetch {
    fn submit(&self, request: FetchRequest) -> Result<()>;

    /// Completions that arrived since the last call; never blocks
    fn ready(&self) -> Vec<FetchCompletion>;
}
