//! Identity types for companions, owners, and catalog entries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime identifier for a simulation entity (pet, owner, target)
///
/// Allocated fresh every time a pet enters the world, so it never survives a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new entity ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// Persistent identifier of the owning actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl ActorId {
    /// Create a new actor ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor:{}", self.0)
    }
}

/// Identifier of one login session of an owner
///
/// A load completion that arrives after the owner reconnected carries the old
/// session and is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

/// Stable pet identity across saves; join key of every child record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PetNumber(pub u32);

impl PetNumber {
    /// Create a new pet number
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// Get the raw number
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PetNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pet#{}", self.0)
    }
}

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Get the raw ID value
            pub fn raw(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

catalog_id!(
    /// Ability (spell) identifier; effects are keyed by the ability that applies them
    AbilityId,
    "ability"
);
catalog_id!(
    /// Creature template a pet is instantiated from
    SpeciesId,
    "species"
);
catalog_id!(
    /// Creature family (shared passives, level-up list, talent tree)
    FamilyId,
    "family"
);
catalog_id!(
    /// Talent tree node
    TalentId,
    "talent"
);

/// Model shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub u32);

/// Weak reference to a live pet instance: entity identity plus registry epoch
///
/// A handle whose epoch no longer matches the registry slot refers to a
/// destroyed instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct PetHandle {
    pub(crate) entity: EntityId,
    pub(crate) epoch: u32,
}

impl PetHandle {
    pub fn new(entity: EntityId, epoch: u32) -> Self {
        Self { entity, epoch }
    }

    /// The runtime entity this handle points at
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Registry epoch the handle was issued in
    pub fn epoch(&self) -> u32 {
        self.epoch
    }
}

impl fmt::Display for PetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.entity, self.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id() {
        let id = EntityId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "entity:42");
    }

    #[test]
    fn test_catalog_ids_display() {
        assert_eq!(AbilityId(17).to_string(), "ability:17");
        assert_eq!(SpeciesId(3).to_string(), "species:3");
        assert_eq!(PetNumber::new(9).to_string(), "pet#9");
    }

    #[test]
    fn test_handle_display() {
        let handle = PetHandle {
            entity: EntityId::new(5),
            epoch: 2,
        };
        assert_eq!(handle.to_string(), "entity:5@2");
    }
}
