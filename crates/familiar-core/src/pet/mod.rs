//! The live companion instance
//!
//! A [`Pet`] is built from a [`PetRecord`] by the kennel, ticks through
//! [`Pet::update`], and is folded back into a record and store operations
//! on save.

mod abilities;
mod deferred;
mod level;
mod lifecycle;
mod persist;

pub use deferred::DeferredCast;
pub use lifecycle::{LifeState, TickOutcome};
pub use persist::{SaveOutcome, SavedVitals};

use crate::{
    native_scale, AbilityBook, AbilityId, ActionBar, ActorId, Catalog, CooldownTable, CreatureType,
    DeclinedName, DerivedStats, DisplayId, EffectSet, EntityId, Error, FamilyId, GlobalCooldowns,
    HappinessTier, OwnerClass, OwnerView, Outbox, PetConfig, PetKind, PetNumber, PetRecord, Position,
    PowerKind, ReactState, Result, SaveMode, SpeciesId, TalentPoints,
};
use std::sync::Arc;
use std::time::Duration;

/// Movement and command flags of a controlled pet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlState {
    pub command_attack: bool,
    pub command_follow: bool,
    pub at_stay: bool,
    pub following: bool,
    pub returning: bool,
}

impl ControlState {
    /// Attack on command
    pub fn attacking() -> Self {
        Self {
            command_attack: true,
            ..Self::default()
        }
    }

    /// Back to the owner's side
    pub fn follow() -> Self {
        Self {
            command_follow: true,
            returning: true,
            ..Self::default()
        }
    }

    /// Hold the current spot, keeping the attack command
    pub fn stay(self) -> Self {
        Self {
            command_attack: self.command_attack,
            at_stay: true,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct Pet {
    catalog: Arc<Catalog>,
    config: Arc<PetConfig>,

    number: PetNumber,
    entity: EntityId,
    owner: ActorId,
    owner_entity: EntityId,
    species: SpeciesId,
    family: Option<FamilyId>,
    creature_type: CreatureType,
    kind: PetKind,
    display: DisplayId,
    name: String,
    renamable: bool,
    declined_name: Option<DeclinedName>,
    creation_ability: Option<AbilityId>,
    time_limited: bool,
    react_state: ReactState,

    level: u8,
    experience: u32,
    next_level_xp: u32,
    stats: DerivedStats,
    health: u32,
    mana: u32,
    focus: u32,
    happiness: u32,
    talent_bonus: u32,
    talents: TalentPoints,

    life: LifeState,
    loading: bool,
    in_combat: bool,
    possessed: bool,
    lootable: bool,
    skinnable: bool,
    control: ControlState,
    position: Position,
    remaining_duration: Option<Duration>,
    regen_timer: Duration,
    happiness_timer: Duration,

    abilities: AbilityBook,
    cooldowns: CooldownTable,
    global_cooldowns: GlobalCooldowns,
    effects: EffectSet,
    action_bar: ActionBar,
    deferred: Option<DeferredCast>,
    outbox: Outbox,
    purged: Vec<AbilityId>,
}

impl Pet {
    /// Bind a record to a fresh runtime identity
    ///
    /// The pet starts out loading, at the record's level, with no abilities.
    pub fn from_record(
        record: &PetRecord,
        entity: EntityId,
        owner: &dyn OwnerView,
        catalog: Arc<Catalog>,
        config: Arc<PetConfig>,
    ) -> Result<Self> {
        let species = catalog
            .species(record.species)
            .ok_or(Error::MissingTemplate(record.species))?;
        let family = species.family;
        let creature_type = species.creature_type;
        let time_limited = record
            .creation_ability
            .and_then(|id| catalog.ability(id))
            .is_some_and(|def| def.is_time_limited());
        let remaining_duration = record
            .creation_ability
            .and_then(|id| catalog.ability(id))
            .and_then(|def| def.duration_ms)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        let regen_timer = config.focus_regen_interval();
        let happiness_timer = config.happiness_interval();
        let focus = match record.kind.power() {
            PowerKind::Focus => config.max_focus,
            PowerKind::Mana => 0,
        };

        Ok(Self {
            catalog,
            config,
            number: record.number,
            entity,
            owner: owner.id(),
            owner_entity: owner.entity(),
            species: record.species,
            family,
            creature_type,
            kind: record.kind,
            display: record.display,
            name: record.name.clone(),
            renamable: record.renamable,
            declined_name: None,
            creation_ability: record.creation_ability,
            time_limited,
            react_state: record.react_state,
            level: record.level.max(1),
            experience: 0,
            next_level_xp: 0,
            stats: DerivedStats::default(),
            health: record.health,
            mana: record.mana,
            focus,
            happiness: record.happiness,
            talent_bonus: owner.pet_talent_bonus(),
            talents: TalentPoints::default(),
            life: LifeState::Alive,
            loading: true,
            in_combat: false,
            possessed: false,
            lootable: false,
            skinnable: false,
            control: ControlState::follow(),
            position: owner.position(),
            remaining_duration,
            regen_timer,
            happiness_timer,
            abilities: AbilityBook::new(),
            cooldowns: CooldownTable::new(),
            global_cooldowns: GlobalCooldowns::new(),
            effects: EffectSet::new(),
            action_bar: ActionBar::default(),
            deferred: None,
            outbox: Outbox::new(),
            purged: Vec::new(),
        })
    }

    pub fn number(&self) -> PetNumber {
        self.number
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn species(&self) -> SpeciesId {
        self.species
    }

    pub fn kind(&self) -> PetKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declined_name(&self) -> Option<&DeclinedName> {
        self.declined_name.as_ref()
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn experience(&self) -> u32 {
        self.experience
    }

    pub fn next_level_xp(&self) -> u32 {
        self.next_level_xp
    }

    pub fn stats(&self) -> &DerivedStats {
        &self.stats
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn mana(&self) -> u32 {
        self.mana
    }

    pub fn focus(&self) -> u32 {
        self.focus
    }

    pub fn happiness(&self) -> u32 {
        self.happiness
    }

    pub fn happiness_tier(&self) -> HappinessTier {
        HappinessTier::of(self.happiness, self.config.happiness_tier_size)
    }

    /// Add happiness (food), capped at the maximum
    pub fn feed(&mut self, amount: u32) {
        self.happiness = (self.happiness + amount).min(self.config.max_happiness);
    }

    pub fn power(&self) -> PowerKind {
        self.kind.power()
    }

    pub fn react_state(&self) -> ReactState {
        self.react_state
    }

    pub fn set_react_state(&mut self, state: ReactState) {
        self.react_state = state;
    }

    pub fn talents(&self) -> TalentPoints {
        self.talents
    }

    pub fn life(&self) -> LifeState {
        self.life
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_removed(&self) -> bool {
        self.life == LifeState::Removed
    }

    pub fn is_time_limited(&self) -> bool {
        self.time_limited
    }

    pub fn remaining_duration(&self) -> Option<Duration> {
        self.remaining_duration
    }

    pub fn set_in_combat(&mut self, in_combat: bool) {
        self.in_combat = in_combat;
    }

    pub fn set_possessed(&mut self, possessed: bool) {
        self.possessed = possessed;
    }

    pub fn control(&self) -> ControlState {
        self.control
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn abilities(&self) -> &AbilityBook {
        &self.abilities
    }

    pub fn cooldowns(&self) -> &CooldownTable {
        &self.cooldowns
    }

    pub fn effects(&self) -> &EffectSet {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectSet {
        &mut self.effects
    }

    pub fn action_bar(&self) -> &ActionBar {
        &self.action_bar
    }

    pub fn deferred_cast(&self) -> Option<&DeferredCast> {
        self.deferred.as_ref()
    }

    /// Output accumulated since the last drain
    pub fn take_output(&mut self) -> Outbox {
        self.outbox.take()
    }

    pub fn rename(&mut self, name: impl Into<String>, declined: Option<DeclinedName>) -> bool {
        if !self.renamable {
            return false;
        }
        self.name = name.into();
        self.declined_name = declined;
        self.renamable = false;
        true
    }

    /// Whether the owner keeps this pet across sessions and gets its owner auras
    pub fn is_permanent_for(&self, owner: &dyn OwnerView) -> bool {
        match self.kind {
            PetKind::Hunter => true,
            PetKind::Summon => match owner.class() {
                OwnerClass::Warlock => self.creature_type == CreatureType::Demon,
                OwnerClass::DeathKnight => self.creature_type == CreatureType::Undead,
                OwnerClass::Mage => self.config.permanent_mage_companion == Some(self.species),
                _ => false,
            },
        }
    }

    /// Display scale; hunter-type pets grow with level
    pub fn native_scale(&self) -> f32 {
        match (self.kind, self.family.and_then(|id| self.catalog.family(id))) {
            (PetKind::Hunter, Some(family)) => native_scale(family, self.level),
            _ => 1.0,
        }
    }

    /// Snapshot for the store
    pub fn to_record(&self, slot: SaveMode, saved_at: i64) -> PetRecord {
        PetRecord {
            number: self.number,
            owner: self.owner,
            species: self.species,
            kind: self.kind,
            display: self.display,
            level: self.level,
            experience: self.experience,
            happiness: self.happiness,
            health: self.health,
            mana: self.mana,
            react_state: self.react_state,
            name: self.name.clone(),
            renamable: self.renamable,
            creation_ability: self.creation_ability,
            slot,
            action_bar: if self.time_limited {
                String::new()
            } else {
                self.action_bar.encode()
            },
            saved_at,
        }
    }

    /// Abilities found unknown while loading; the kennel purges them from the store
    pub(crate) fn take_purged(&mut self) -> Vec<AbilityId> {
        std::mem::take(&mut self.purged)
    }

    pub(crate) fn load_action_bar(&mut self, encoded: &str) {
        if !self.time_limited {
            self.action_bar = ActionBar::decode_or_default(encoded);
        }
    }

    #[cfg(test)]
    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub(crate) fn mark_removed(&mut self) {
        self.life = LifeState::Removed;
        self.deferred = None;
    }
}
