//! Test doubles: owners, world, store, and fetch

use crate::{
    AbilityDef, AbilityId, AbilityRange, AbilityRow, ActorId, AsyncFetch, Catalog, ChildRows,
    CooldownRow, CreatureType, DeclinedName, EffectRecord, EntityId, Error, FamilyDef, FamilyId,
    FetchCompletion, FetchRequest, MapKind, OwnerClass, OwnerPets, OwnerRegistry, OwnerView, Pet,
    PetAura, PetConfig, PetHandle, PetKind, PetNumber, PetRecord, PetStable, PetStore, Position,
    Result, SessionId, SpeciesDef, SpeciesId, StoreOp, TalentDef, TalentId, World,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub struct FakeOwner {
    pub id: ActorId,
    pub session: SessionId,
    pub entity: EntityId,
    pub level: u8,
    pub class: OwnerClass,
    pub in_world: bool,
    pub persisted: bool,
    pub can_tame_exotic: bool,
    pub sees_undead: bool,
    pub temp_unsummon: bool,
    pub position: Position,
    pub combat_target: Option<EntityId>,
    pub talent_bonus: u32,
    pub auras: Vec<PetAura>,
}

impl FakeOwner {
    pub fn new(class: OwnerClass, level: u8) -> Self {
        Self {
            id: ActorId(1),
            session: SessionId(1),
            entity: EntityId(1),
            level,
            class,
            in_world: true,
            persisted: true,
            can_tame_exotic: false,
            sees_undead: false,
            temp_unsummon: false,
            position: Position::default(),
            combat_target: None,
            talent_bonus: 0,
            auras: Vec::new(),
        }
    }

    pub fn hunter(level: u8) -> Self {
        Self::new(OwnerClass::Hunter, level)
    }

    pub fn warlock(level: u8) -> Self {
        Self::new(OwnerClass::Warlock, level)
    }

    pub fn mage(level: u8) -> Self {
        Self::new(OwnerClass::Mage, level)
    }
}

impl OwnerView for FakeOwner {
    fn id(&self) -> ActorId {
        self.id
    }
    fn session(&self) -> SessionId {
        self.session
    }
    fn entity(&self) -> EntityId {
        self.entity
    }
    fn level(&self) -> u8 {
        self.level
    }
    fn class(&self) -> OwnerClass {
        self.class
    }
    fn in_world(&self) -> bool {
        self.in_world
    }
    fn is_persisted(&self) -> bool {
        self.persisted
    }
    fn can_tame_exotic(&self) -> bool {
        self.can_tame_exotic
    }
    fn can_see_undead_companion(&self) -> bool {
        self.sees_undead
    }
    fn needs_temporary_unsummon(&self) -> bool {
        self.temp_unsummon
    }
    fn position(&self) -> Position {
        self.position
    }
    fn combat_target(&self) -> Option<EntityId> {
        self.combat_target
    }
    fn pet_talent_bonus(&self) -> u32 {
        self.talent_bonus
    }
    fn pet_auras(&self) -> Vec<PetAura> {
        self.auras.clone()
    }
}

#[derive(Debug, Default)]
pub struct FakeRegistry {
    owners: HashMap<ActorId, (FakeOwner, OwnerPets)>,
}

impl FakeRegistry {
    pub fn add(&mut self, owner: FakeOwner, pets: OwnerPets) {
        self.owners.insert(owner.id, (owner, pets));
    }

    pub fn get_mut(&mut self, id: ActorId) -> (&mut FakeOwner, &mut OwnerPets) {
        let (owner, pets) = self.owners.get_mut(&id).expect("owner registered");
        (owner, pets)
    }
}

impl OwnerRegistry for FakeRegistry {
    fn owner_mut(&mut self, id: ActorId) -> Option<(&dyn OwnerView, &mut OwnerPets)> {
        self.owners
            .get_mut(&id)
            .map(|(owner, pets)| (&*owner as &dyn OwnerView, pets))
    }
}

#[derive(Debug)]
pub struct FakeWorld {
    pub next_entity: u64,
    pub alive: HashSet<EntityId>,
    pub positions: HashMap<EntityId, Position>,
    pub blocked_sight: HashSet<EntityId>,
    pub map: MapKind,
    pub visibility: f32,
    pub invalid_positions: bool,
    pub on_map: HashSet<EntityId>,
}

impl FakeWorld {
    pub fn new() -> Self {
        Self {
            next_entity: 100,
            alive: HashSet::new(),
            positions: HashMap::new(),
            blocked_sight: HashSet::new(),
            map: MapKind::Open,
            visibility: 100.0,
            invalid_positions: false,
            on_map: HashSet::new(),
        }
    }

    pub fn spawn(&mut self, entity: EntityId, position: Position) {
        self.alive.insert(entity);
        self.positions.insert(entity, position);
    }

    pub fn kill(&mut self, entity: EntityId) {
        self.alive.remove(&entity);
    }
}

impl World for FakeWorld {
    fn allocate_entity(&mut self) -> EntityId {
        self.next_entity += 1;
        EntityId(self.next_entity)
    }
    fn is_valid_position(&self, _position: &Position) -> bool {
        !self.invalid_positions
    }
    fn add_to_map(&mut self, entity: EntityId, position: Position) {
        self.on_map.insert(entity);
        self.positions.insert(entity, position);
        self.alive.insert(entity);
    }
    fn remove_from_map(&mut self, entity: EntityId) {
        self.on_map.remove(&entity);
        self.alive.remove(&entity);
    }
    fn map_kind(&self) -> MapKind {
        self.map
    }
    fn visibility_range(&self) -> f32 {
        self.visibility
    }
    fn is_alive(&self, entity: EntityId) -> bool {
        self.alive.contains(&entity)
    }
    fn position_of(&self, entity: EntityId) -> Option<Position> {
        self.positions.get(&entity).copied()
    }
    fn line_of_sight(&self, _from: EntityId, to: EntityId) -> bool {
        !self.blocked_sight.contains(&to)
    }
}

fn ability(id: u32, name: &str, edit: impl FnOnce(&mut AbilityDef)) -> AbilityDef {
    let mut def = AbilityDef::new(AbilityId(id));
    def.name = name.to_string();
    edit(&mut def);
    def
}

/// A small catalog covering ranks, talents, passives, and summons
///
/// - 100 Growl: autocastable
/// - 101..=103 Bite: three melee ranks at levels 10/20/30
/// - 300 Avoidance: passive
/// - 400 Mend: positive, ranged
/// - 500..=502 Cobra Reflexes: talent ranks
/// - 600 Summon Elemental: creation ability lasting one minute
/// - 700 owner aura, 800 family passive
pub fn ranked_catalog() -> Arc<Catalog> {
    let mut catalog = Catalog::new();
    catalog.insert_ability(ability(100, "Growl", |d| {
        d.autocastable = true;
        d.range = AbilityRange { max: 30.0, melee: false };
        d.cooldown_ms = 5_000;
        d.spell_level = 1;
    }));
    for (id, level) in [(101, 10), (102, 20), (103, 30)] {
        catalog.insert_ability(ability(id, "Bite", |d| {
            d.autocastable = true;
            d.prev_rank = (id > 101).then(|| AbilityId(id - 1));
            d.next_rank = (id < 103).then(|| AbilityId(id + 1));
            d.range = AbilityRange { max: 5.0, melee: true };
            d.cooldown_ms = 10_000;
            d.spell_level = level;
        }));
    }
    catalog.insert_ability(ability(300, "Avoidance", |d| d.passive = true));
    catalog.insert_ability(ability(400, "Mend", |d| {
        d.positive = true;
        d.range = AbilityRange { max: 40.0, melee: false };
        d.cooldown_ms = 5_000;
    }));
    for id in 500..=502 {
        catalog.insert_ability(ability(id, "Cobra Reflexes", |d| {
            d.passive = true;
            d.spell_level = 20;
        }));
    }
    catalog.insert_talent(TalentDef {
        id: TalentId(1),
        pet_talent_mask: 1,
        ranks: vec![AbilityId(500), AbilityId(501), AbilityId(502)],
    });
    catalog.insert_ability(ability(600, "Summon Elemental", |d| d.duration_ms = Some(60_000)));
    catalog.insert_ability(ability(700, "Owner Aura", |d| d.positive = true));
    catalog.insert_ability(ability(800, "Wolf Passive", |d| d.passive = true));

    catalog.insert_family(FamilyDef {
        id: FamilyId(1),
        name: "Wolf".to_string(),
        talent_type: Some(0),
        passives: vec![AbilityId(800)],
        levelup: vec![(10, AbilityId(101)), (20, AbilityId(102)), (30, AbilityId(103))],
        min_scale: 0.8,
        max_scale: 1.2,
        min_scale_level: 10,
        max_scale_level: 60,
    });

    let mut wolf = SpeciesDef::new(SpeciesId(1));
    wolf.name = "Gray Wolf".to_string();
    wolf.family = Some(FamilyId(1));
    wolf.tameable = true;
    wolf.default_abilities = vec![AbilityId(100)];
    catalog.insert_species(wolf);

    let mut imp = SpeciesDef::new(SpeciesId(2));
    imp.name = "Imp".to_string();
    imp.creature_type = CreatureType::Demon;
    imp.default_abilities = vec![AbilityId(400)];
    catalog.insert_species(imp);

    let mut hound = SpeciesDef::new(SpeciesId(3));
    hound.name = "Core Hound".to_string();
    hound.family = Some(FamilyId(1));
    hound.tameable = true;
    hound.exotic = true;
    catalog.insert_species(hound);

    Arc::new(catalog)
}

/// A saved record of the fixture species for `kind`
pub fn stored_pet(number: PetNumber, owner: ActorId, kind: PetKind, level: u8) -> PetRecord {
    let species = match kind {
        PetKind::Hunter => SpeciesId(1),
        PetKind::Summon => SpeciesId(2),
    };
    let mut record = PetRecord::new(number, owner, species, kind);
    record.level = level;
    record.happiness = 700_000;
    record.health = 100;
    record.mana = 50;
    record.name = "Fang".to_string();
    record.saved_at = 9_000;
    record
}

/// A loaded pet, outside any kennel
pub fn summoned(owner: &FakeOwner, catalog: Arc<Catalog>, kind: PetKind, level: u8) -> Pet {
    summoned_with(owner, catalog, kind, level, |_| {})
}

pub fn summoned_with(
    owner: &FakeOwner,
    catalog: Arc<Catalog>,
    kind: PetKind,
    level: u8,
    edit: impl FnOnce(&mut PetRecord),
) -> Pet {
    let mut record = stored_pet(PetNumber(1), owner.id, kind, level);
    edit(&mut record);
    let mut pet = Pet::from_record(
        &record,
        EntityId(1_000),
        owner,
        catalog,
        Arc::new(PetConfig::default()),
    )
    .expect("species exists");
    pet.init_stats_for_level();
    pet.set_loading(false);
    pet
}

pub fn handle(pet: &Pet) -> PetHandle {
    PetHandle {
        entity: pet.entity(),
        epoch: 1,
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<PetNumber, PetRecord>,
    declined: HashMap<PetNumber, DeclinedName>,
    effects: HashMap<PetNumber, Vec<EffectRecord>>,
    abilities: HashMap<PetNumber, Vec<AbilityRow>>,
    cooldowns: HashMap<PetNumber, Vec<CooldownRow>>,
    last_number: u32,
    commits: usize,
}

/// In-memory store applying operations the way the database would
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put(&self, record: PetRecord) {
        let mut state = self.lock();
        state.last_number = state.last_number.max(record.number.raw());
        state.records.insert(record.number, record);
    }

    pub fn record(&self, pet: PetNumber) -> Option<PetRecord> {
        self.lock().records.get(&pet).cloned()
    }

    pub fn ability(&self, pet: PetNumber, ability: AbilityId) -> Option<crate::ActiveState> {
        self.lock()
            .abilities
            .get(&pet)
            .and_then(|rows| rows.iter().find(|row| row.ability == ability))
            .map(|row| row.active)
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }
}

impl PetStore for MemoryStore {
    fn commit(&self, ops: &[StoreOp]) -> Result<()> {
        let mut state = self.lock();
        for op in ops {
            match op {
                StoreOp::DeleteEffects { pet } => {
                    state.effects.remove(pet);
                }
                StoreOp::InsertEffect { pet, effect } => {
                    state.effects.entry(*pet).or_default().push(effect.clone());
                }
                StoreOp::DeleteAbility { pet, ability } => {
                    if let Some(rows) = state.abilities.get_mut(pet) {
                        rows.retain(|row| row.ability != *ability);
                    }
                }
                StoreOp::InsertAbility { pet, ability, active } => {
                    state.abilities.entry(*pet).or_default().push(AbilityRow {
                        ability: *ability,
                        active: *active,
                    });
                }
                StoreOp::DeleteAbilities { pet } => {
                    state.abilities.remove(pet);
                }
                StoreOp::PurgeAbility(ability) => {
                    for rows in state.abilities.values_mut() {
                        rows.retain(|row| row.ability != *ability);
                    }
                }
                StoreOp::DeleteCooldowns { pet } => {
                    state.cooldowns.remove(pet);
                }
                StoreOp::InsertCooldown { pet, row } => {
                    state.cooldowns.entry(*pet).or_default().push(*row);
                }
                StoreOp::DeleteDeclinedName { pet } => {
                    state.declined.remove(pet);
                }
                StoreOp::SaveDeclinedName { pet, name } => {
                    state.declined.insert(*pet, name.clone());
                }
                StoreOp::DeletePet { pet } => {
                    state.records.remove(pet);
                }
                StoreOp::DeleteHunterPetsInSlots {
                    owner,
                    except,
                    from,
                    to,
                } => {
                    state.records.retain(|number, record| {
                        !(record.owner == *owner
                            && record.kind == PetKind::Hunter
                            && number != except
                            && record.slot >= *from
                            && record.slot <= *to)
                    });
                }
                StoreOp::ReplacePet(record) => {
                    state.records.insert(record.number, record.clone());
                }
            }
        }
        state.commits += 1;
        Ok(())
    }

    fn fetch_children(&self, pet: PetNumber) -> Result<ChildRows> {
        let state = self.lock();
        Ok(ChildRows {
            declined_name: state.declined.get(&pet).cloned(),
            effects: state.effects.get(&pet).cloned().unwrap_or_default(),
            abilities: state.abilities.get(&pet).cloned().unwrap_or_default(),
            cooldowns: state.cooldowns.get(&pet).cloned().unwrap_or_default(),
        })
    }

    fn load_stable(&self, owner: ActorId) -> Result<PetStable> {
        let state = self.lock();
        let mut records: Vec<_> = state
            .records
            .values()
            .filter(|record| record.owner == owner)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.number);
        let mut stable = PetStable::new();
        for record in records {
            stable.insert(record);
        }
        Ok(stable)
    }

    fn next_pet_number(&self) -> Result<PetNumber> {
        let mut state = self.lock();
        state.last_number += 1;
        Ok(PetNumber(state.last_number))
    }
}

/// Fetch that completes when the test says so
#[derive(Debug, Clone)]
pub struct ManualFetch {
    store: MemoryStore,
    queue: Rc<RefCell<Vec<FetchRequest>>>,
    held: Rc<Cell<bool>>,
    failing: Rc<Cell<bool>>,
    refusing: Rc<Cell<bool>>,
}

impl ManualFetch {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            queue: Rc::default(),
            held: Rc::default(),
            failing: Rc::default(),
            refusing: Rc::default(),
        }
    }

    /// Keep completions back until released
    pub fn hold(&self, held: bool) {
        self.held.set(held);
    }

    /// Complete every fetch with an error
    pub fn fail(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Reject new submissions outright
    pub fn refuse(&self, refusing: bool) {
        self.refusing.set(refusing);
    }
}

impl AsyncFetch for ManualFetch {
    fn submit(&self, request: FetchRequest) -> Result<()> {
        if self.refusing.get() {
            return Err(Error::Store("fetch queue closed".to_string()));
        }
        self.queue.borrow_mut().push(request);
        Ok(())
    }

    fn ready(&self) -> Vec<FetchCompletion> {
        if self.held.get() {
            return Vec::new();
        }
        let requests: Vec<_> = self.queue.borrow_mut().drain(..).collect();
        requests
            .into_iter()
            .map(|request| FetchCompletion {
                ticket: request.ticket,
                rows: if self.failing.get() {
                    Err(Error::Store("fetch failed".to_string()))
                } else {
                    self.store.fetch_children(request.ticket.pet)
                },
            })
            .collect()
    }
}
