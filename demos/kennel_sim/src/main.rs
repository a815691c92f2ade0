//! Kennel Simulation Example
//!
//! Drives one hunter's companion through its whole life against an in-memory
//! store: tame, fight, level, save, reload from the background fetch, and
//! stable it away.
//!
//! Set `RUST_LOG=debug` to follow the store batches.

use familiar_core::{
    AbilityId, ActorId, Directive, EntityId, GameTime, Kennel, LoadRequest, LoadSelection,
    MapKind, Notification, OwnerClass, OwnerPets, OwnerRegistry, OwnerView, PetAura, PetHandle,
    PetStore, Position, SaveMode, SessionId, SpeciesId, World,
};
use familiar_db::{FetchWorker, Store};
use familiar_script::{load_config_str, Loader};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(100);
const GROWL: AbilityId = AbilityId(100);
const WOLF: SpeciesId = SpeciesId(1);

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

struct Hunter {
    id: ActorId,
    session: SessionId,
    entity: EntityId,
    level: u8,
    position: Position,
    combat_target: Option<EntityId>,
}

impl OwnerView for Hunter {
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
        OwnerClass::Hunter
    }
    fn in_world(&self) -> bool {
        true
    }
    fn is_persisted(&self) -> bool {
        true
    }
    fn can_tame_exotic(&self) -> bool {
        false
    }
    fn can_see_undead_companion(&self) -> bool {
        false
    }
    fn needs_temporary_unsummon(&self) -> bool {
        false
    }
    fn position(&self) -> Position {
        self.position
    }
    fn combat_target(&self) -> Option<EntityId> {
        self.combat_target
    }
    fn pet_talent_bonus(&self) -> u32 {
        0
    }
    fn pet_auras(&self) -> Vec<PetAura> {
        Vec::new()
    }
}

#[derive(Default)]
struct Roster {
    owners: HashMap<ActorId, (Hunter, OwnerPets)>,
}

impl Roster {
    fn get_mut(&mut self, id: ActorId) -> Option<(&mut Hunter, &mut OwnerPets)> {
        self.owners.get_mut(&id).map(|(owner, pets)| (owner, pets))
    }
}

impl OwnerRegistry for Roster {
    fn owner_mut(&mut self, id: ActorId) -> Option<(&dyn OwnerView, &mut OwnerPets)> {
        self.owners
            .get_mut(&id)
            .map(|(owner, pets)| (&*owner as &dyn OwnerView, pets))
    }
}

/// A flat open field where everything can see everything
struct Field {
    next_entity: u64,
    positions: HashMap<EntityId, Position>,
}

impl Field {
    fn new() -> Self {
        Self {
            next_entity: 1000,
            positions: HashMap::new(),
        }
    }

    fn spawn(&mut self, position: Position) -> EntityId {
        let entity = self.allocate_entity();
        self.positions.insert(entity, position);
        entity
    }
}

impl World for Field {
    fn allocate_entity(&mut self) -> EntityId {
        self.next_entity += 1;
        EntityId::new(self.next_entity)
    }
    fn is_valid_position(&self, position: &Position) -> bool {
        position.x.is_finite() && position.y.is_finite() && position.z.is_finite()
    }
    fn add_to_map(&mut self, entity: EntityId, position: Position) {
        self.positions.insert(entity, position);
    }
    fn remove_from_map(&mut self, entity: EntityId) {
        self.positions.remove(&entity);
    }
    fn map_kind(&self) -> MapKind {
        MapKind::Open
    }
    fn visibility_range(&self) -> f32 {
        100.0
    }
    fn is_alive(&self, entity: EntityId) -> bool {
        self.positions.contains_key(&entity)
    }
    fn position_of(&self, entity: EntityId) -> Option<Position> {
        self.positions.get(&entity).copied()
    }
    fn line_of_sight(&self, _from: EntityId, _to: EntityId) -> bool {
        true
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn print_pet<S: PetStore>(kennel: &Kennel<S, FetchWorker>, handle: PetHandle) {
    let Some(pet) = kennel.pet(handle) else {
        println!("  (no pet)");
        return;
    };
    println!(
        "  {} #{} level {} xp {}/{} health {} happiness {:?}",
        pet.name(),
        pet.number().raw(),
        pet.level(),
        pet.experience(),
        pet.next_level_xp(),
        pet.health(),
        pet.happiness_tier(),
    );
    let known: Vec<_> = pet.abilities().known().map(|(id, _)| id.raw()).collect();
    println!("  abilities {:?}, {} cooldown(s)", known, pet.cooldowns().len());
}

fn drain<S: PetStore>(kennel: &mut Kennel<S, FetchWorker>, handle: PetHandle) {
    let output = kennel.take_output(handle);
    for directive in &output.directives {
        match directive {
            Directive::Cast { ability, target } => println!("  -> cast {} on {}", ability, target),
            other => println!("  -> {:?}", other),
        }
    }
    for notification in &output.notifications {
        match notification {
            Notification::CooldownsRestored { cooldowns, .. } => {
                println!("  <- {} cooldown(s) restored", cooldowns.len())
            }
            other => println!("  <- {:?}", other),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    println!("=== Familiar Kennel Simulation ===\n");

    let mut loader = Loader::new();
    loader.load_str(include_str!("../data/catalog.ron"))?;
    let catalog = Arc::new(loader.finish()?);
    let config = Arc::new(load_config_str(include_str!("../data/config.ron"))?);

    let store = Arc::new(Store::in_memory()?);
    let worker = FetchWorker::spawn(store.clone())?;
    let mut kennel = Kennel::new(catalog, config, store.clone(), worker);

    let mut now = GameTime::at_unix(1_700_000_000);
    let mut field = Field::new();
    let owner_id = ActorId::new(1);
    let owner_entity = field.spawn(Position::new(0.0, 0.0, 0.0));
    let mut roster = Roster::default();
    roster.owners.insert(
        owner_id,
        (
            Hunter {
                id: owner_id,
                session: SessionId(1),
                entity: owner_entity,
                level: 12,
                position: Position::new(0.0, 0.0, 0.0),
                combat_target: None,
            },
            OwnerPets::default(),
        ),
    );

    // Tame
    println!("Taming a wolf:");
    let handle = {
        let (owner, pets) = roster.get_mut(owner_id).ok_or("owner missing")?;
        kennel.create_tamed(&*owner, pets, &mut field, WOLF, 10, &now)?
    };
    print_pet(&kennel, handle);
    drain(&mut kennel, handle);

    // Fight
    println!("\nA boar wanders in:");
    let boar = field.spawn(Position::new(4.0, 0.0, 0.0));
    if let Some((owner, _)) = roster.get_mut(owner_id) {
        owner.combat_target = Some(boar);
    }
    if let Some(pet) = kennel.pet_mut(handle) {
        pet.set_in_combat(true);
        pet.cast_when_available(GROWL, Some(boar), None, false);
    }
    for _ in 0..3 {
        now.advance(TICK);
        kennel.update(TICK, &mut roster, &mut field, &now);
        drain(&mut kennel, handle);
    }
    field.remove_from_map(boar);
    if let Some(pet) = kennel.pet_mut(handle) {
        pet.set_in_combat(false);
        pet.give_xp(900, 12);
    }
    println!("  boar defeated");
    print_pet(&kennel, handle);
    drain(&mut kennel, handle);

    // Dismiss
    println!("\nDismissing the pet (saved as current):");
    kennel.remove_pet(handle, SaveMode::AsCurrent, &mut roster, &mut field, &now)?;
    println!("  {} live pet(s)", kennel.len());

    // Relog and reload through the fetch worker
    println!("\nCalling the pet back:");
    now.advance(Duration::from_secs(2));
    let handle = {
        let stable = kennel.load_stable(owner_id)?;
        let (owner, pets) = roster.get_mut(owner_id).ok_or("owner missing")?;
        pets.stable = stable;
        let request = LoadRequest::new(LoadSelection::current());
        kennel.load_pet(&*owner, pets, &mut field, request)?
    };
    let mut loaded = false;
    for _ in 0..200 {
        if kennel.complete_loads(&mut roster, &mut field, &now).contains(&handle) {
            loaded = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    if !loaded {
        return Err("pet load did not complete".into());
    }
    print_pet(&kennel, handle);
    drain(&mut kennel, handle);

    // Stable
    println!("\nMoving the pet to stable slot 1:");
    kennel.remove_pet(handle, SaveMode::Stable(1), &mut roster, &mut field, &now)?;
    let stable = store.load_stable(owner_id)?;
    for (slot, record) in stable.iter() {
        println!("  {:?}: {} (level {})", slot, record.name, record.level);
    }

    info!("Simulation complete");
    Ok(())
}
