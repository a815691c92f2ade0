//! Familiar Core - companion lifecycle, persistence diffing, and tick state machines
//!
//! This crate holds everything about an owned companion that does not depend
//! on a particular database or simulation:
//! - Identity types and the two simulation clocks
//! - The static catalog (abilities, ranks, talents, families, species)
//! - The pet stable with slot selection and promotion
//! - Ability book, cooldown table, effect set, and action bar with dirty tracking
//! - The live [`Pet`] with its load, save, level, talent, and tick logic
//! - The [`Kennel`] registry driving loads, ticks, and removals
//!
//! ## Seams
//!
//! The core talks to the outside through traits, never globals:
//! - [`PetStore`] - transactional record store
//! - [`AsyncFetch`] - off-thread child-record fetch
//! - [`OwnerView`] / [`OwnerRegistry`] - the owning actor and its bookkeeping
//! - [`World`] - map placement, visibility, and line of sight
//!
//! Movement and combat orders come back as [`Directive`]s and client-facing
//! facts as [`Notification`]s, drained through [`Pet::take_output`].

mod ability;
mod action_bar;
pub mod catalog;
mod collab;
mod config;
mod cooldown;
mod effect;
mod error;
mod identity;
mod kennel;
mod pet;
mod record;
mod signal;
mod stats;
mod store;
mod talent;
pub mod time;

#[cfg(test)]
mod fixtures;

pub use ability::{AbilityBook, AbilityEntry, AbilityKind, ActiveState, DirtyState};
pub use action_bar::{
    ActionBar, ActionSlot, SlotKind, ACTION_BAR_SLOTS, COMMAND_ATTACK, COMMAND_FOLLOW, COMMAND_STAY,
    REACT_AGGRESSIVE, REACT_DEFENSIVE, REACT_PASSIVE,
};
pub use catalog::{
    AbilityDef, AbilityRange, Catalog, CreatureType, DamageFormula, EffectFlags, FamilyDef,
    LevelStats, SpeciesDef, TalentDef, MAX_RANK_STEPS,
};
pub use collab::{MapKind, OwnerClass, OwnerPets, OwnerRegistry, OwnerView, PetAura, Position, World};
pub use config::PetConfig;
pub use cooldown::{CooldownEntry, CooldownRow, CooldownTable, GlobalCooldowns};
pub use effect::{is_persistable, EffectDuration, EffectRecord, EffectSet, EffectSource};
pub use error::{Error, Rejection, Result};
pub use identity::{
    AbilityId, ActorId, DisplayId, EntityId, FamilyId, PetHandle, PetNumber, SessionId, SpeciesId,
    TalentId,
};
pub use kennel::{Kennel, LoadRequest};
pub use pet::{ControlState, DeferredCast, LifeState, Pet, SaveOutcome, SavedVitals, TickOutcome};
pub use record::{
    DeclinedName, LoadSelection, PetKind, PetRecord, PetStable, PowerKind, ReactState, SaveMode,
    STABLE_SLOTS,
};
pub use signal::{Directive, Notification, Outbox};
pub use stats::{food_benefit, native_scale, DerivedStats, HappinessTier, HUNTER_STAT_KEY};
pub use store::{
    AbilityRow, AsyncFetch, ChildRows, FetchCompletion, FetchRequest, LoadTicket, PetStore, StoreOp,
};
pub use talent::{max_talent_points, talent_reset_ops, TalentPoints};
pub use time::GameTime;
