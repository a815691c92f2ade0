//! Read-only views of the owner and the simulation world
//!
//! Operations receive these explicitly instead of reaching for globals, so
//! tests can hand in fakes.

use crate::{AbilityId, ActorId, EntityId, PetHandle, PetNumber, PetStable, SessionId};

/// A point in the world
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerClass {
    Hunter,
    Warlock,
    DeathKnight,
    Mage,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapKind {
    #[default]
    Open,
    Dungeon,
    Battleground,
    Arena,
}

impl MapKind {
    pub fn is_pvp(&self) -> bool {
        matches!(self, MapKind::Battleground | MapKind::Arena)
    }
}

/// Owner-granted effect kept on the owner's permanent pets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PetAura {
    pub ability: AbilityId,
    /// Dropped when a non-current pet is summoned
    pub removed_on_pet_change: bool,
}

/// The owning actor as the core sees it
pub trait OwnerView {
    fn id(&self) -> ActorId;
    fn session(&self) -> SessionId;
    fn entity(&self) -> EntityId;
    fn level(&self) -> u8;
    fn class(&self) -> OwnerClass;
    fn in_world(&self) -> bool;
    /// Whether the owner is a saved actor (pets of transient owners are never saved)
    fn is_persisted(&self) -> bool;
    fn can_tame_exotic(&self) -> bool;
    /// Class-specific rule letting the owner keep an undead companion
    fn can_see_undead_companion(&self) -> bool;
    /// The owner is in a state where the pet must stay unsummoned for now
    fn needs_temporary_unsummon(&self) -> bool;
    fn position(&self) -> Position;
    fn combat_target(&self) -> Option<EntityId>;
    /// Extra talent points granted by owner effects
    fn pet_talent_bonus(&self) -> u32;
    fn pet_auras(&self) -> Vec<PetAura>;
}

/// Owner-side pet bookkeeping held by the simulation
#[derive(Debug, Clone, Default)]
pub struct OwnerPets {
    pub stable: PetStable,
    /// The live controlled pet
    pub active: Option<PetHandle>,
    /// Pet waiting to be resummoned after a temporary unsummon
    pub temporary_unsummoned: Option<PetNumber>,
    pub last_pet_number: Option<PetNumber>,
}

impl OwnerPets {
    pub fn new(stable: PetStable) -> Self {
        Self {
            stable,
            ..Self::default()
        }
    }
}

/// Live owners, looked up when a load completes or a pet ticks
pub trait OwnerRegistry {
    /// The owner and its pet bookkeeping, if the actor is still online
    fn owner_mut(&mut self, id: ActorId) -> Option<(&dyn OwnerView, &mut OwnerPets)>;
}

/// The simulation the pet lives in
pub trait World {
    fn allocate_entity(&mut self) -> EntityId;
    fn is_valid_position(&self, position: &Position) -> bool;
    fn add_to_map(&mut self, entity: EntityId, position: Position);
    fn remove_from_map(&mut self, entity: EntityId);
    fn map_kind(&self) -> MapKind;
    fn visibility_range(&self) -> f32;
    fn is_alive(&self, entity: EntityId) -> bool;
    fn position_of(&self, entity: EntityId) -> Option<Position>;
    fn line_of_sight(&self, from: EntityId, to: EntityId) -> bool;
}
