//! Saving a pet and finishing its load

use super::abilities::Origin;
use super::{LifeState, Pet};
use crate::{
    AbilityKind, ChildRows, GameTime, MapKind, Notification, OwnerPets, OwnerView, PetKind,
    PetRecord, SaveMode, StoreOp, World,
};
use std::time::Duration;
use tracing::{debug, error};

/// The result of a save: operations to commit and the snapshot written
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub ops: Vec<StoreOp>,
    /// Mode actually used; a conflicting temporary unsummon can change it
    pub mode: SaveMode,
    /// Record written, absent when the pet was deleted
    pub record: Option<PetRecord>,
}

/// Values from the pet record that the load completion applies last
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedVitals {
    pub health: u32,
    pub mana: u32,
    pub saved_at: i64,
    /// The record was loaded as the owner's current pet
    pub current: bool,
    /// Override saved health with a percentage of the maximum
    pub health_pct: Option<u32>,
}

impl SavedVitals {
    pub fn from_record(record: &PetRecord, current: bool, health_pct: Option<u32>) -> Self {
        Self {
            health: record.health,
            mana: record.mana,
            saved_at: record.saved_at,
            current,
            health_pct,
        }
    }
}

impl Pet {
    /// Fold the pet into store operations for `mode`
    ///
    /// Returns `None` when nothing may be saved: the owner is transient, the
    /// pet is still loading, or its species is gone.
    pub fn save(
        &mut self,
        mode: SaveMode,
        owner: &dyn OwnerView,
        pets: &mut OwnerPets,
        now: &GameTime,
    ) -> Option<SaveOutcome> {
        if !owner.is_persisted() || self.loading || self.catalog.species(self.species).is_none() {
            return None;
        }

        let mut mode = mode;
        if mode == SaveMode::AsCurrent {
            if let Some(pending) = pets.temporary_unsummoned.filter(|n| *n != self.number) {
                // The pending pet takes the current slot when it comes back.
                if self.kind == PetKind::Hunter {
                    debug!(pet = %self.number, %pending, "save skipped for temporary unsummon");
                    return None;
                }
                mode = SaveMode::NotInSlot;
            }
        }

        let mut ops = self.effects.flush(self.number, &self.catalog, &self.config);
        if mode > SaveMode::AsCurrent {
            self.effects.clear();
        }
        ops.extend(self.abilities.flush(self.number));
        ops.extend(self.cooldowns.flush(self.number, now, &self.config));

        if mode >= SaveMode::AsCurrent {
            ops.push(StoreOp::DeletePet { pet: self.number });
            if self.kind == PetKind::Hunter
                && (mode == SaveMode::AsCurrent || mode > SaveMode::last_stable())
            {
                ops.push(StoreOp::DeleteHunterPetsInSlots {
                    owner: self.owner,
                    except: self.number,
                    from: SaveMode::AsCurrent,
                    to: SaveMode::last_stable(),
                });
            }
            if let Some(name) = &self.declined_name {
                ops.push(StoreOp::SaveDeclinedName {
                    pet: self.number,
                    name: name.clone(),
                });
            }
            let record = self.to_record(mode, now.unix_secs());
            if pets.stable.current_number() == Some(self.number) {
                let mut snapshot = record.clone();
                snapshot.slot = SaveMode::AsCurrent;
                pets.stable.refresh_current(snapshot);
            }
            ops.push(StoreOp::ReplacePet(record.clone()));
            return Some(SaveOutcome {
                ops,
                mode,
                record: Some(record),
            });
        }

        self.effects.clear();
        let pet = self.number;
        ops.extend([
            StoreOp::DeletePet { pet },
            StoreOp::DeleteDeclinedName { pet },
            StoreOp::DeleteEffects { pet },
            StoreOp::DeleteAbilities { pet },
            StoreOp::DeleteCooldowns { pet },
        ]);
        Some(SaveOutcome {
            ops,
            mode,
            record: None,
        })
    }

    /// Synchronous half of a load: level, stats, and action bar from the record
    pub(crate) fn begin_load(&mut self, record: &PetRecord, owner: &dyn OwnerView) {
        if self.kind == PetKind::Summon {
            self.level = owner.level().max(1);
        }
        self.init_stats_for_level();
        self.experience = record.experience;
        self.sync_level_with_owner(owner.level());
        self.load_action_bar(&record.action_bar);
        if let Some(ability) = self.creation_ability {
            self.outbox.notify(Notification::CastInProgress {
                pet: self.entity,
                ability,
            });
        }
    }

    /// Set up a pet that has no stored rows yet
    pub(crate) fn finish_creation(&mut self, owner: &dyn OwnerView) {
        self.init_stats_for_level();
        self.learn_family_passives();
        self.init_levelup_abilities();
        self.init_talents_for_level();
        self.cast_pet_auras(owner, true);
        self.loading = false;
        self.outbox.notify(Notification::ActionBarRefresh { pet: self.entity });
    }

    /// Apply the fetched child records and finish the load
    pub fn finish_load(
        &mut self,
        rows: ChildRows,
        owner: &dyn OwnerView,
        world: &dyn World,
        now: &GameTime,
        vitals: SavedVitals,
    ) {
        let catalog = self.catalog.clone();
        self.init_talents_for_level();

        let elapsed = Duration::from_secs(now.secs_since(vitals.saved_at));
        for effect in rows.effects {
            self.effects.restore(effect, elapsed, self.level, &catalog);
        }

        if !self.time_limited {
            for row in &rows.abilities {
                self.add_ability(row.ability, row.active, Origin::Stored, AbilityKind::Normal);
            }
            self.init_talents_for_level();

            let mut restored = Vec::new();
            for row in &rows.cooldowns {
                if !catalog.has_ability(row.ability) {
                    error!(pet = %self.number, ability = %row.ability, "cooldown for unknown ability, skipping");
                    continue;
                }
                if let Some(left) = self.cooldowns.restore(row, now) {
                    restored.push((row.ability, left));
                }
            }
            if !restored.is_empty() {
                self.outbox.notify(Notification::CooldownsRestored {
                    pet: self.entity,
                    cooldowns: restored,
                });
            }

            self.learn_family_passives();
            self.init_levelup_abilities();

            if world.map_kind() == MapKind::Arena && self.config.arena_restricts_effects {
                self.effects.remove_where(|effect| {
                    catalog
                        .ability(effect.ability)
                        .is_some_and(|def| def.effect.arena_restricted)
                });
            }
            self.cast_pet_auras(owner, vitals.current);
        } else {
            self.learn_family_passives();
            self.init_levelup_abilities();
        }

        self.cleanup_action_bar();

        if self.kind == PetKind::Hunter {
            self.declined_name = rows.declined_name;
        }

        let mut health = vitals.health;
        if let Some(pct) = vitals.health_pct {
            health = (self.stats.max_health as u64 * pct.min(100) as u64 / 100) as u32;
        }
        if self.kind == PetKind::Summon && !vitals.current {
            self.health = self.stats.max_health;
            self.mana = self.stats.max_mana;
        } else if self.kind == PetKind::Hunter && health == 0 {
            self.health = 0;
            self.life = LifeState::JustDied;
        } else {
            self.health = health.min(self.stats.max_health);
            self.mana = vitals.mana.min(self.stats.max_mana);
        }

        self.loading = false;
        self.outbox.notify(Notification::ActionBarRefresh { pet: self.entity });
        self.outbox.notify(Notification::TalentsChanged {
            pet: self.entity,
            free_points: self.talents.free(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ranked_catalog, summoned, summoned_with, FakeOwner, FakeWorld};
    use crate::{
        AbilityId, AbilityRow, ActiveState, CooldownRow, EffectDuration, EffectRecord, PetNumber,
        PetStable,
    };

    fn owner_pets(pet: &Pet) -> OwnerPets {
        let mut stable = PetStable::new();
        let mut record = pet.to_record(SaveMode::AsCurrent, 0);
        record.slot = SaveMode::AsCurrent;
        stable.insert(record);
        OwnerPets::new(stable)
    }

    fn vitals(health: u32, current: bool) -> SavedVitals {
        SavedVitals {
            health,
            mana: 0,
            saved_at: 900,
            current,
            health_pct: None,
        }
    }

    #[test]
    fn test_save_as_current_replaces_record() {
        let owner = FakeOwner::hunter(40);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        let mut pets = owner_pets(&pet);
        pet.learn_ability(AbilityId(100));
        pet.feed(1_000);

        let outcome = pet
            .save(SaveMode::AsCurrent, &owner, &mut pets, &GameTime::at_unix(5_000))
            .expect("saved");
        assert_eq!(outcome.mode, SaveMode::AsCurrent);
        assert!(outcome.ops.contains(&StoreOp::InsertAbility {
            pet: pet.number(),
            ability: AbilityId(100),
            active: ActiveState::Disabled,
        }));
        assert!(outcome.ops.contains(&StoreOp::DeleteHunterPetsInSlots {
            owner: owner.id,
            except: pet.number(),
            from: SaveMode::AsCurrent,
            to: SaveMode::Stable(4),
        }));
        assert!(matches!(outcome.ops.last(), Some(StoreOp::ReplacePet(r)) if r.saved_at == 5_000));
        assert_eq!(
            pets.stable.current.as_ref().map(|r| r.happiness),
            Some(pet.happiness())
        );
    }

    #[test]
    fn test_stable_save_strips_effects() {
        let owner = FakeOwner::hunter(40);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        let mut pets = owner_pets(&pet);
        pet.effects_mut().apply(EffectRecord::new(
            AbilityId(400),
            EffectDuration::Timed(Duration::from_secs(600)),
        ));

        let outcome = pet
            .save(SaveMode::Stable(2), &owner, &mut pets, &GameTime::at_unix(5_000))
            .expect("saved");
        assert!(pet.effects().is_empty());
        assert!(outcome
            .ops
            .iter()
            .any(|op| matches!(op, StoreOp::InsertEffect { effect, .. } if effect.ability == AbilityId(400))));
        assert!(!outcome
            .ops
            .iter()
            .any(|op| matches!(op, StoreOp::DeleteHunterPetsInSlots { .. })));
        assert_eq!(outcome.record.map(|r| r.slot), Some(SaveMode::Stable(2)));
    }

    #[test]
    fn test_temporary_unsummon_conflict() {
        let hunter = FakeOwner::hunter(40);
        let mut pet = summoned(&hunter, ranked_catalog(), PetKind::Hunter, 40);
        let mut pets = owner_pets(&pet);
        pets.temporary_unsummoned = Some(PetNumber(99));
        assert!(pet
            .save(SaveMode::AsCurrent, &hunter, &mut pets, &GameTime::at_unix(5_000))
            .is_none());

        let warlock = FakeOwner::warlock(40);
        let mut imp = summoned(&warlock, ranked_catalog(), PetKind::Summon, 40);
        let outcome = imp
            .save(SaveMode::AsCurrent, &warlock, &mut pets, &GameTime::at_unix(5_000))
            .expect("saved");
        assert_eq!(outcome.mode, SaveMode::NotInSlot);
    }

    #[test]
    fn test_save_is_noop_for_transient_or_loading() {
        let mut owner = FakeOwner::hunter(40);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        let mut pets = owner_pets(&pet);
        let now = GameTime::at_unix(5_000);

        pet.set_loading(true);
        assert!(pet.save(SaveMode::AsCurrent, &owner, &mut pets, &now).is_none());
        pet.set_loading(false);
        owner.persisted = false;
        assert!(pet.save(SaveMode::AsCurrent, &owner, &mut pets, &now).is_none());
    }

    #[test]
    fn test_delete_removes_children() {
        let owner = FakeOwner::hunter(40);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        let mut pets = owner_pets(&pet);
        let outcome = pet
            .save(SaveMode::Deleted, &owner, &mut pets, &GameTime::at_unix(5_000))
            .expect("saved");
        let pet_number = pet.number();
        for op in [
            StoreOp::DeletePet { pet: pet_number },
            StoreOp::DeleteDeclinedName { pet: pet_number },
            StoreOp::DeleteAbilities { pet: pet_number },
            StoreOp::DeleteCooldowns { pet: pet_number },
        ] {
            assert!(outcome.ops.contains(&op));
        }
        assert!(outcome.record.is_none());
        assert!(!outcome.ops.iter().any(|op| matches!(op, StoreOp::ReplacePet(_))));
    }

    #[test]
    fn test_zero_health_hunter_loads_dead() {
        let owner = FakeOwner::hunter(40);
        let world = FakeWorld::new();
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        pet.set_loading(true);
        pet.finish_load(ChildRows::default(), &owner, &world, &GameTime::at_unix(1_000), vitals(0, true));
        assert!(!pet.is_loading());
        assert_eq!(pet.life(), LifeState::JustDied);
        assert_eq!(pet.health(), 0);
    }

    #[test]
    fn test_vitals_applied_on_load() {
        let owner = FakeOwner::warlock(40);
        let world = FakeWorld::new();
        let mut imp = summoned(&owner, ranked_catalog(), PetKind::Summon, 40);
        imp.set_loading(true);
        imp.finish_load(ChildRows::default(), &owner, &world, &GameTime::at_unix(1_000), vitals(10, false));
        assert_eq!(imp.health(), imp.stats().max_health);

        let mut current = summoned(&owner, ranked_catalog(), PetKind::Summon, 40);
        current.set_loading(true);
        current.finish_load(ChildRows::default(), &owner, &world, &GameTime::at_unix(1_000), vitals(10, true));
        assert_eq!(current.health(), 10);

        let mut healed = summoned(&owner, ranked_catalog(), PetKind::Summon, 40);
        healed.set_loading(true);
        let mut pct = vitals(10, true);
        pct.health_pct = Some(50);
        healed.finish_load(ChildRows::default(), &owner, &world, &GameTime::at_unix(1_000), pct);
        assert_eq!(healed.health(), healed.stats().max_health / 2);
    }

    #[test]
    fn test_children_restored_on_load() {
        let owner = FakeOwner::hunter(40);
        let world = FakeWorld::new();
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        pet.set_loading(true);
        pet.take_output();
        let rows = ChildRows {
            declined_name: None,
            effects: vec![EffectRecord::new(
                AbilityId(400),
                EffectDuration::Timed(Duration::from_secs(600)),
            )],
            abilities: vec![
                AbilityRow {
                    ability: AbilityId(100),
                    active: ActiveState::Enabled,
                },
                AbilityRow {
                    ability: AbilityId(4242),
                    active: ActiveState::Disabled,
                },
            ],
            cooldowns: vec![
                CooldownRow {
                    ability: AbilityId(100),
                    category: 0,
                    expires_at: 1_030,
                },
                CooldownRow {
                    ability: AbilityId(4343),
                    category: 0,
                    expires_at: 1_030,
                },
            ],
        };
        pet.finish_load(rows, &owner, &world, &GameTime::at_unix(1_000), vitals(100, true));

        assert_eq!(pet.abilities().get(AbilityId(100)).map(|e| e.active), Some(ActiveState::Enabled));
        assert_eq!(
            pet.abilities().get(AbilityId(100)).map(|e| e.state),
            Some(crate::DirtyState::Unchanged)
        );
        assert_eq!(pet.take_purged(), vec![AbilityId(4242)]);
        assert!(pet.effects().has(AbilityId(400)));
        assert!(pet.abilities().knows(AbilityId(800)));
        assert!(pet.abilities().knows(AbilityId(103)));

        let notes = pet.take_output().notifications;
        assert!(notes.contains(&Notification::CooldownsRestored {
            pet: pet.entity(),
            cooldowns: vec![(AbilityId(100), Duration::from_secs(30))],
        }));
        assert!(!notes
            .iter()
            .any(|n| matches!(n, Notification::AbilityLearned { .. })));
    }

    #[test]
    fn test_time_limited_skips_stored_abilities() {
        let owner = FakeOwner::mage(30);
        let world = FakeWorld::new();
        let mut pet = summoned_with(&owner, ranked_catalog(), PetKind::Summon, 30, |record| {
            record.creation_ability = Some(AbilityId(600));
        });
        pet.set_loading(true);
        let rows = ChildRows {
            abilities: vec![AbilityRow {
                ability: AbilityId(100),
                active: ActiveState::Enabled,
            }],
            ..ChildRows::default()
        };
        pet.finish_load(rows, &owner, &world, &GameTime::at_unix(1_000), vitals(10, false));
        assert!(!pet.abilities().knows(AbilityId(100)));
        assert!(pet
            .to_record(SaveMode::NotInSlot, 0)
            .action_bar
            .is_empty());
    }
}
