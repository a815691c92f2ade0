//! Database store wrapper.

use crate::error::{Error, Result};
use crate::models::*;
use familiar_core::{ActorId, ChildRows, PetNumber, PetRecord, PetStable, PetStore, StoreOp};
use native_db::transaction::RwTransaction;
use native_db::*;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, trace};

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredPet>().unwrap();
    models.define::<StoredAbility>().unwrap();
    models.define::<StoredCooldown>().unwrap();
    models.define::<StoredEffect>().unwrap();
    models.define::<StoredDeclinedName>().unwrap();
    models.define::<StoredCounter>().unwrap();
    models
});

/// Database store for pet records.
pub struct Store {
    pub(crate) db: Database<'static>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new()
            .create(&MODELS, path.as_ref())
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Apply a batch of operations in one transaction.
    ///
    /// Nothing is written unless every operation succeeds.
    pub fn apply(&self, ops: &[StoreOp]) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        for op in ops {
            trace!(?op, "Applying store op");
            apply_op(&rw, op)?;
        }
        rw.commit()?;
        debug!(ops = ops.len(), "Committed pet batch");
        Ok(())
    }

    /// Load one pet record.
    pub fn load_pet(&self, number: PetNumber) -> Result<Option<PetRecord>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredPet> = r.get().primary(number.raw())?;
        stored.map(|s| s.to_record()).transpose()
    }

    /// Read every child record of a pet.
    pub fn children(&self, pet: PetNumber) -> Result<ChildRows> {
        let r = self.db.r_transaction()?;
        let declined: Option<StoredDeclinedName> = r.get().primary(pet.raw())?;

        let effects: Vec<StoredEffect> = {
            let scan = r.scan().primary::<StoredEffect>()?;
            let iter = scan.range(child_range(pet.raw()))?;
            let rows: std::result::Result<Vec<StoredEffect>, _> = iter.collect();
            rows.map_err(|e| Error::Database(e.to_string()))?
        };
        let abilities: Vec<StoredAbility> = {
            let scan = r.scan().primary::<StoredAbility>()?;
            let iter = scan.range(child_range(pet.raw()))?;
            let rows: std::result::Result<Vec<StoredAbility>, _> = iter.collect();
            rows.map_err(|e| Error::Database(e.to_string()))?
        };
        let cooldowns: Vec<StoredCooldown> = {
            let scan = r.scan().primary::<StoredCooldown>()?;
            let iter = scan.range(child_range(pet.raw()))?;
            let rows: std::result::Result<Vec<StoredCooldown>, _> = iter.collect();
            rows.map_err(|e| Error::Database(e.to_string()))?
        };

        Ok(ChildRows {
            declined_name: declined.map(|d| d.to_name()),
            effects: effects
                .iter()
                .map(StoredEffect::to_effect)
                .collect::<Result<_>>()?,
            abilities: abilities
                .iter()
                .map(StoredAbility::to_row)
                .collect::<Result<_>>()?,
            cooldowns: cooldowns.iter().map(StoredCooldown::to_row).collect(),
        })
    }

    /// Rebuild an owner's stable.
    pub fn stable(&self, owner: ActorId) -> Result<PetStable> {
        let mut stable = PetStable::new();
        for record in self.pets_by_owner(owner)? {
            stable.insert(record.to_record()?);
        }
        Ok(stable)
    }

    /// Hand out the next pet number.
    pub fn allocate_pet_number(&self) -> Result<PetNumber> {
        let rw = self.db.rw_transaction()?;
        let current: Option<StoredCounter> =
            rw.get().primary(StoredCounter::PET_NUMBER.to_string())?;
        let value = current.map(|c| c.value).unwrap_or(0) + 1;
        rw.upsert(StoredCounter {
            id: StoredCounter::PET_NUMBER.to_string(),
            value,
        })?;
        rw.commit()?;
        Ok(PetNumber::new(value))
    }
}

impl PetStore for Store {
    fn commit(&self, ops: &[StoreOp]) -> familiar_core::Result<()> {
        Ok(self.apply(ops)?)
    }

    fn fetch_children(&self, pet: PetNumber) -> familiar_core::Result<ChildRows> {
        Ok(self.children(pet)?)
    }

    fn load_stable(&self, owner: ActorId) -> familiar_core::Result<PetStable> {
        Ok(self.stable(owner)?)
    }

    fn next_pet_number(&self) -> familiar_core::Result<PetNumber> {
        Ok(self.allocate_pet_number()?)
    }
}

fn apply_op(rw: &RwTransaction, op: &StoreOp) -> Result<()> {
    match op {
        StoreOp::DeleteEffects { pet } => {
            let rows: Vec<StoredEffect> = {
                let scan = rw.scan().primary::<StoredEffect>()?;
                let iter = scan.range(child_range(pet.raw()))?;
                let rows: std::result::Result<Vec<StoredEffect>, _> = iter.collect();
                rows.map_err(|e| Error::Database(e.to_string()))?
            };
            for row in rows {
                rw.remove(row)?;
            }
        }
        StoreOp::InsertEffect { pet, effect } => {
            let rows: Vec<StoredEffect> = {
                let scan = rw.scan().primary::<StoredEffect>()?;
                let iter = scan.range(child_range(pet.raw()))?;
                let rows: std::result::Result<Vec<StoredEffect>, _> = iter.collect();
                rows.map_err(|e| Error::Database(e.to_string()))?
            };
            // Same ability, caster and mask overwrite; anything else takes the next free slot.
            let slot = match rows.iter().find(|row| row.holds(effect)) {
                Some(row) => row.slot(),
                None => rows.last().map_or(0, |row| row.slot() + 1),
            };
            rw.upsert(StoredEffect::from_effect(pet.raw(), slot, effect))?;
        }
        StoreOp::DeleteAbility { pet, ability } => {
            let stored: Option<StoredAbility> =
                rw.get().primary(child_key(pet.raw(), ability.raw()))?;
            if let Some(s) = stored {
                rw.remove(s)?;
            }
        }
        StoreOp::InsertAbility {
            pet,
            ability,
            active,
        } => {
            rw.upsert(StoredAbility::new(pet.raw(), *ability, *active))?;
        }
        StoreOp::DeleteAbilities { pet } => {
            let rows: Vec<StoredAbility> = {
                let scan = rw.scan().primary::<StoredAbility>()?;
                let iter = scan.range(child_range(pet.raw()))?;
                let rows: std::result::Result<Vec<StoredAbility>, _> = iter.collect();
                rows.map_err(|e| Error::Database(e.to_string()))?
            };
            for row in rows {
                rw.remove(row)?;
            }
        }
        StoreOp::PurgeAbility(ability) => {
            let rows: Vec<StoredAbility> = {
                let scan = rw.scan().secondary::<StoredAbility>(StoredAbilityKey::ability)?;
                let iter = scan.start_with(ability.raw())?;
                let rows: std::result::Result<Vec<StoredAbility>, _> = iter.collect();
                rows.map_err(|e| Error::Database(e.to_string()))?
            };
            for row in rows {
                rw.remove(row)?;
            }
        }
        StoreOp::DeleteCooldowns { pet } => {
            let rows: Vec<StoredCooldown> = {
                let scan = rw.scan().primary::<StoredCooldown>()?;
                let iter = scan.range(child_range(pet.raw()))?;
                let rows: std::result::Result<Vec<StoredCooldown>, _> = iter.collect();
                rows.map_err(|e| Error::Database(e.to_string()))?
            };
            for row in rows {
                rw.remove(row)?;
            }
        }
        StoreOp::InsertCooldown { pet, row } => {
            rw.upsert(StoredCooldown::from_row(pet.raw(), row))?;
        }
        StoreOp::DeleteDeclinedName { pet } => {
            let stored: Option<StoredDeclinedName> = rw.get().primary(pet.raw())?;
            if let Some(s) = stored {
                rw.remove(s)?;
            }
        }
        StoreOp::SaveDeclinedName { pet, name } => {
            rw.upsert(StoredDeclinedName::from_name(pet.raw(), name))?;
        }
        StoreOp::DeletePet { pet } => {
            let stored: Option<StoredPet> = rw.get().primary(pet.raw())?;
            if let Some(s) = stored {
                rw.remove(s)?;
            }
        }
        StoreOp::DeleteHunterPetsInSlots {
            owner,
            except,
            from,
            to,
        } => {
            let rows: Vec<StoredPet> = {
                let scan = rw.scan().secondary::<StoredPet>(StoredPetKey::owner)?;
                let iter = scan.start_with(owner.raw())?;
                let rows: std::result::Result<Vec<StoredPet>, _> = iter.collect();
                rows.map_err(|e| Error::Database(e.to_string()))?
            };
            // Child rows stay: a displaced record is written back by number.
            for row in rows {
                if row.is_hunter()
                    && row.number != except.raw()
                    && (from.code()..=to.code()).contains(&row.slot)
                {
                    rw.remove(row)?;
                }
            }
        }
        StoreOp::ReplacePet(record) => {
            rw.upsert(StoredPet::from_record(record))?;
        }
    }
    Ok(())
}
