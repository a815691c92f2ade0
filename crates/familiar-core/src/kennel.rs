//! Kennel - registry and driver of live pets
//!
//! The kennel owns every live [`Pet`], keyed by entity with an epoch per
//! slot so that a [`PetHandle`] from a destroyed instance never resolves.
//! It runs the load handshake against the store and the async fetch,
//! drives ticks, and turns removals into saves.
//!
//! ## Load handshake
//!
//! 1. [`Kennel::load_pet`] validates, binds the pet to its owner, and submits the fetch
//! 2. [`Kennel::complete_loads`] drains finished fetches on the simulation thread
//! 3. A completion applies only if its owner, session, and handle still match

use crate::{
    talent_reset_ops, ActorId, AsyncFetch, Catalog, EntityId, Error, FetchRequest, GameTime,
    LoadSelection, LoadTicket, OwnerClass, OwnerPets, OwnerRegistry, OwnerView, Outbox, Pet,
    PetConfig, PetHandle, PetKind, PetRecord, PetStable, PetStore, Rejection, Result, SaveMode,
    SavedVitals, SpeciesId, StoreOp, TickOutcome, World,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What to load for an owner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadRequest {
    pub selection: LoadSelection,
    /// Spawn with this percentage of maximum health instead of the saved value
    pub health_pct: Option<u32>,
}

impl LoadRequest {
    pub fn new(selection: LoadSelection) -> Self {
        Self {
            selection,
            health_pct: None,
        }
    }
}

struct Entry {
    epoch: u32,
    pet: Pet,
    /// Set while the fetch is outstanding
    pending: Option<SavedVitals>,
}

/// Live pets plus the store and fetch they persist through
pub struct Kennel<S: PetStore, F: AsyncFetch> {
    catalog: Arc<Catalog>,
    config: Arc<PetConfig>,
    store: S,
    fetch: F,
    entries: HashMap<EntityId, Entry>,
    next_epoch: u32,
}

impl<S: PetStore, F: AsyncFetch> Kennel<S, F> {
    pub fn new(catalog: Arc<Catalog>, config: Arc<PetConfig>, store: S, fetch: F) -> Self {
        Self {
            catalog,
            config,
            store,
            fetch,
            entries: HashMap::new(),
            next_epoch: 1,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &PetConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of live pets, loading ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pet(&self, handle: PetHandle) -> Option<&Pet> {
        self.entries
            .get(&handle.entity)
            .filter(|entry| entry.epoch == handle.epoch)
            .map(|entry| &entry.pet)
    }

    pub fn pet_mut(&mut self, handle: PetHandle) -> Option<&mut Pet> {
        self.entries
            .get_mut(&handle.entity)
            .filter(|entry| entry.epoch == handle.epoch)
            .map(|entry| &mut entry.pet)
    }

    /// Drain a pet's directives and notifications
    pub fn take_output(&mut self, handle: PetHandle) -> Outbox {
        self.pet_mut(handle).map(Pet::take_output).unwrap_or_default()
    }

    /// Read an owner's stable from the store, as done at login
    pub fn load_stable(&self, owner: ActorId) -> Result<PetStable> {
        self.store.load_stable(owner)
    }

    fn issue(&mut self, entity: EntityId, pet: Pet, pending: Option<SavedVitals>) -> PetHandle {
        let epoch = self.next_epoch;
        self.next_epoch = self.next_epoch.wrapping_add(1).max(1);
        self.entries.insert(entity, Entry { epoch, pet, pending });
        PetHandle { entity, epoch }
    }

    /// Start loading an owner's pet
    ///
    /// On success the pet is bound as the owner's active pet, placed in the
    /// world, and marked loading until [`Kennel::complete_loads`] sees its
    /// fetch finish.
    pub fn load_pet(
        &mut self,
        owner: &dyn OwnerView,
        pets: &mut OwnerPets,
        world: &mut dyn World,
        request: LoadRequest,
    ) -> Result<PetHandle> {
        let selection = request.selection;
        let (from, record) = pets
            .stable
            .select(&selection)
            .map(|(slot, record)| (slot, record.clone()))
            .ok_or(Error::NotFound)?;

        if pets.stable.current_number() == Some(record.number) && pets.active.is_some() {
            return Err(Error::PolicyRejected(Rejection::AlreadyCurrent));
        }
        if pets.active.is_some() {
            return Err(Error::PolicyRejected(Rejection::OwnerHasActivePet));
        }
        if !owner.in_world() {
            return Err(Error::PolicyRejected(Rejection::OwnerNotInWorld));
        }
        if owner.class() == OwnerClass::DeathKnight && !owner.can_see_undead_companion() {
            return Err(Error::PolicyRejected(Rejection::ClassVisibility));
        }

        let time_limited = record
            .creation_ability
            .and_then(|id| self.catalog.ability(id))
            .is_some_and(|def| def.is_time_limited());
        if time_limited && selection.current {
            return Err(Error::PolicyRejected(Rejection::TimeLimitedAsCurrent));
        }
        if record.kind == PetKind::Hunter {
            let species = self
                .catalog
                .species(record.species)
                .ok_or(Error::MissingTemplate(record.species))?;
            if !species.is_tameable(owner.can_tame_exotic()) {
                return Err(Error::PolicyRejected(Rejection::NotTameable));
            }
        }
        if selection.current && owner.needs_temporary_unsummon() {
            pets.temporary_unsummoned = Some(record.number);
            return Err(Error::PolicyRejected(Rejection::DeferredUnsummon));
        }

        let entity = world.allocate_entity();
        let mut pet = Pet::from_record(
            &record,
            entity,
            owner,
            self.catalog.clone(),
            self.config.clone(),
        )?;
        pet.begin_load(&record, owner);

        let position = pet.position();
        if !world.is_valid_position(&position) {
            error!(
                pet = %record.number,
                owner = %owner.id(),
                x = position.x,
                y = position.y,
                "pet spawn position is not valid"
            );
            return Err(Error::InvalidPosition {
                x: position.x,
                y: position.y,
            });
        }

        let vitals = SavedVitals::from_record(&record, selection.current, request.health_pct);
        let handle = self.issue(entity, pet, Some(vitals));
        pets.active = Some(handle);
        world.add_to_map(entity, position);

        let ticket = LoadTicket {
            handle,
            owner: owner.id(),
            session: owner.session(),
            pet: record.number,
        };
        if let Err(e) = self.fetch.submit(FetchRequest { ticket }) {
            error!(pet = %record.number, error = %e, "could not submit pet fetch");
            self.discard(handle, pets, world);
            return Err(e);
        }

        if from != SaveMode::AsCurrent {
            let previous = pets.stable.current_number();
            if let Err(e) = pets.stable.promote(record.number, from) {
                self.discard(handle, pets, world);
                return Err(e);
            }
            // The displaced record keeps its new slot in the store too.
            if let Some(moved) = previous.and_then(|n| pets.stable.find(n)).cloned() {
                if let Err(e) = self.store.commit(&[StoreOp::ReplacePet(moved)]) {
                    error!(pet = %record.number, error = %e, "could not move displaced pet");
                }
            }
        }
        if !time_limited {
            pets.last_pet_number = Some(record.number);
        }

        info!(pet = %record.number, owner = %owner.id(), %handle, ?from, "pet load started");
        Ok(handle)
    }

    /// Apply every finished fetch; returns the pets that finished loading
    pub fn complete_loads(
        &mut self,
        registry: &mut dyn OwnerRegistry,
        world: &mut dyn World,
        now: &GameTime,
    ) -> Vec<PetHandle> {
        let mut loaded = Vec::new();
        for completion in self.fetch.ready() {
            let ticket = completion.ticket;
            let handle = ticket.handle;
            let live = self
                .entries
                .get(&handle.entity)
                .is_some_and(|entry| entry.epoch == handle.epoch && !entry.pet.is_removed());
            if !live {
                debug!(pet = %ticket.pet, %handle, "fetch completed for a pet that is gone");
                continue;
            }

            let Some((owner, pets)) = registry.owner_mut(ticket.owner) else {
                warn!(pet = %ticket.pet, owner = %ticket.owner, "owner left before pet load completed");
                self.drop_entry(handle, world);
                continue;
            };
            if owner.session() != ticket.session || pets.active != Some(handle) {
                warn!(pet = %ticket.pet, %handle, error = %Error::StaleCallback, "discarding pet load");
                self.discard(handle, pets, world);
                continue;
            }

            let rows = match completion.rows {
                Ok(rows) => rows,
                Err(e) => {
                    error!(pet = %ticket.pet, error = %e, "pet fetch failed");
                    self.discard(handle, pets, world);
                    continue;
                }
            };

            let Some(entry) = self.entries.get_mut(&handle.entity) else {
                continue;
            };
            let Some(vitals) = entry.pending.take() else {
                continue;
            };
            entry.pet.finish_load(rows, owner, &*world, now, vitals);

            let purged: Vec<StoreOp> = entry
                .pet
                .take_purged()
                .into_iter()
                .map(StoreOp::PurgeAbility)
                .collect();
            if !purged.is_empty() {
                if let Err(e) = self.store.commit(&purged) {
                    error!(pet = %ticket.pet, error = %e, "could not purge unknown abilities");
                }
            }
            info!(pet = %ticket.pet, %handle, "pet loaded");
            loaded.push(handle);
        }
        loaded
    }

    /// Tick every live pet, removing those that ask for it
    pub fn update(
        &mut self,
        diff: Duration,
        registry: &mut dyn OwnerRegistry,
        world: &mut dyn World,
        now: &GameTime,
    ) {
        let mut removals = Vec::new();
        for (entity, entry) in self.entries.iter_mut() {
            let handle = PetHandle {
                entity: *entity,
                epoch: entry.epoch,
            };
            let owner = registry.owner_mut(entry.pet.owner());
            let (view, active) = match owner {
                Some((view, pets)) => (Some(view), pets.active),
                None => (None, None),
            };
            if let TickOutcome::Remove(mode) = entry.pet.update(diff, view, active, handle, &*world, now) {
                removals.push((handle, mode));
            }
        }
        for (handle, mode) in removals {
            if let Err(e) = self.remove_pet(handle, mode, registry, world, now) {
                error!(%handle, error = %e, "pet removal failed");
            }
        }
    }

    /// Save and remove a pet, settling the owner's bookkeeping
    pub fn remove_pet(
        &mut self,
        handle: PetHandle,
        mode: SaveMode,
        registry: &mut dyn OwnerRegistry,
        world: &mut dyn World,
        now: &GameTime,
    ) -> Result<()> {
        let Some(owner_id) = self.pet(handle).map(Pet::owner) else {
            return Err(Error::NotFound);
        };
        match registry.owner_mut(owner_id) {
            Some((owner, pets)) => self.remove_owned(handle, mode, owner, pets, world, now),
            None => {
                self.drop_entry(handle, world);
                Ok(())
            }
        }
    }

    /// Remove a pet whose owner the caller already holds
    pub fn remove_owned(
        &mut self,
        handle: PetHandle,
        mode: SaveMode,
        owner: &dyn OwnerView,
        pets: &mut OwnerPets,
        world: &mut dyn World,
        now: &GameTime,
    ) -> Result<()> {
        let pet = self.pet_mut(handle).ok_or(Error::NotFound)?;
        let number = pet.number();
        let saved = pet.save(mode, owner, pets, now);

        let mut result = Ok(());
        let (mode, record) = match saved {
            Some(outcome) => {
                if let Err(e) = self.store.commit(&outcome.ops) {
                    error!(pet = %number, error = %e, "pet save failed");
                    result = Err(e);
                }
                (outcome.mode, outcome.record)
            }
            None => (mode, None),
        };

        if pets.stable.current_number() == Some(number) {
            pets.stable.retire_current(mode, record);
        }
        if pets.active == Some(handle) {
            pets.active = None;
        }
        self.drop_entry(handle, world);
        info!(pet = %number, %handle, ?mode, "pet removed");
        result
    }

    /// Save a pet in place without removing it
    pub fn save_pet(
        &mut self,
        handle: PetHandle,
        mode: SaveMode,
        owner: &dyn OwnerView,
        pets: &mut OwnerPets,
        now: &GameTime,
    ) -> Result<bool> {
        let pet = self.pet_mut(handle).ok_or(Error::NotFound)?;
        let Some(outcome) = pet.save(mode, owner, pets, now) else {
            return Ok(false);
        };
        self.store.commit(&outcome.ops)?;
        Ok(true)
    }

    /// Create a freshly tamed hunter-type pet as the owner's current one
    pub fn create_tamed(
        &mut self,
        owner: &dyn OwnerView,
        pets: &mut OwnerPets,
        world: &mut dyn World,
        species: SpeciesId,
        level: u8,
        now: &GameTime,
    ) -> Result<PetHandle> {
        if pets.active.is_some() {
            return Err(Error::PolicyRejected(Rejection::OwnerHasActivePet));
        }
        let def = self
            .catalog
            .species(species)
            .ok_or(Error::MissingTemplate(species))?;
        if !def.is_tameable(owner.can_tame_exotic()) {
            return Err(Error::PolicyRejected(Rejection::NotTameable));
        }

        let number = self.store.next_pet_number()?;
        let mut record = PetRecord::new(number, owner.id(), species, PetKind::Hunter);
        record.level = level.clamp(1, owner.level().max(1));
        record.happiness = self.config.tamed_happiness;
        record.name = def.name.clone();
        record.renamable = true;
        record.slot = SaveMode::AsCurrent;

        let entity = world.allocate_entity();
        let mut pet = Pet::from_record(&record, entity, owner, self.catalog.clone(), self.config.clone())?;
        pet.finish_creation(owner);
        let position = pet.position();
        if !world.is_valid_position(&position) {
            return Err(Error::InvalidPosition {
                x: position.x,
                y: position.y,
            });
        }

        if pets.stable.current.is_some() {
            pets.stable.retire_current(SaveMode::NotInSlot, None);
        }
        pets.stable.current = Some(pet.to_record(SaveMode::AsCurrent, now.unix_secs()));

        let handle = self.issue(entity, pet, None);
        pets.active = Some(handle);
        pets.last_pet_number = Some(number);
        world.add_to_map(entity, position);
        self.save_pet(handle, SaveMode::AsCurrent, owner, pets, now)?;
        info!(pet = %number, owner = %owner.id(), %species, "pet tamed");
        Ok(handle)
    }

    /// Reset talents of every hunter-type pet the owner has
    ///
    /// The live pet resets in memory; the others lose their talent rows.
    pub fn reset_talents_for_all(&mut self, pets: &OwnerPets) -> Result<()> {
        let online = pets.active.and_then(|handle| {
            let pet = self.pet_mut(handle)?;
            pet.reset_talents();
            Some(pet.number())
        });
        let ops = talent_reset_ops(&pets.stable, online, &self.catalog);
        if ops.is_empty() {
            return Ok(());
        }
        self.store.commit(&ops)
    }

    /// Unbind and drop a pet without saving it
    fn discard(&mut self, handle: PetHandle, pets: &mut OwnerPets, world: &mut dyn World) {
        if pets.active == Some(handle) {
            pets.active = None;
        }
        self.drop_entry(handle, world);
    }

    fn drop_entry(&mut self, handle: PetHandle, world: &mut dyn World) {
        let matches = self
            .entries
            .get(&handle.entity)
            .is_some_and(|entry| entry.epoch == handle.epoch);
        if !matches {
            return;
        }
        if let Some(mut entry) = self.entries.remove(&handle.entity) {
            entry.pet.mark_removed();
            world.remove_from_map(handle.entity);
        }
    }
}
