//! Common query patterns for the database.

use crate::error::{Error, Result};
use crate::models::*;
use crate::store::Store;
use familiar_core::{AbilityId, ActorId, PetRecord};

impl Store {
    /// Raw pet rows of one owner, ordered by pet number.
    pub(crate) fn pets_by_owner(&self, owner: ActorId) -> Result<Vec<StoredPet>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().secondary::<StoredPet>(StoredPetKey::owner)?;
        let iter = scan.start_with(owner.raw())?;
        let pets: std::result::Result<Vec<StoredPet>, _> = iter.collect();
        pets.map_err(|e| Error::Database(e.to_string()))
    }

    /// Every record of one owner.
    pub fn records_by_owner(&self, owner: ActorId) -> Result<Vec<PetRecord>> {
        self.pets_by_owner(owner)?
            .iter()
            .map(StoredPet::to_record)
            .collect()
    }

    /// Count the records of one owner.
    pub fn count_pets_by_owner(&self, owner: ActorId) -> Result<usize> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().secondary::<StoredPet>(StoredPetKey::owner)?;
        let iter = scan.start_with(owner.raw())?;
        Ok(iter.count())
    }

    /// Count the pets that know an ability.
    pub fn count_pets_with_ability(&self, ability: AbilityId) -> Result<usize> {
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredAbility>(StoredAbilityKey::ability)?;
        let iter = scan.start_with(ability.raw())?;
        Ok(iter.count())
    }
}
