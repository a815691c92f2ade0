//! Per-tick update and death handling

use super::Pet;
use crate::{CreatureType, GameTime, OwnerView, PetHandle, PetKind, PowerKind, SaveMode, World};
use std::time::Duration;
use tracing::{debug, error};

/// Where the pet stands between life and removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    /// Died this tick; becomes a corpse on the next update
    JustDied,
    Corpse {
        remove_at: Duration,
    },
    /// Taken out of the world; the kennel drops it
    Removed,
}

/// What the kennel should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Remove(SaveMode),
}

impl Pet {
    /// Advance the pet by one tick
    ///
    /// `owner_active` is what the owner believes its active pet is; a pet
    /// that is not that pet removes itself.
    pub fn update(
        &mut self,
        diff: Duration,
        owner: Option<&dyn OwnerView>,
        owner_active: Option<PetHandle>,
        handle: PetHandle,
        world: &dyn World,
        now: &GameTime,
    ) -> TickOutcome {
        if self.loading {
            return TickOutcome::Continue;
        }

        match self.life {
            LifeState::Removed => TickOutcome::Continue,
            LifeState::JustDied => {
                self.enter_corpse(world, now);
                TickOutcome::Continue
            }
            LifeState::Corpse { remove_at } => {
                if self.kind != PetKind::Hunter || remove_at <= now.uptime {
                    TickOutcome::Remove(SaveMode::NotInSlot)
                } else {
                    TickOutcome::Continue
                }
            }
            LifeState::Alive => self.update_alive(diff, owner, owner_active, handle, world, now),
        }
    }

    fn update_alive(
        &mut self,
        diff: Duration,
        owner: Option<&dyn OwnerView>,
        owner_active: Option<PetHandle>,
        handle: PetHandle,
        world: &dyn World,
        now: &GameTime,
    ) -> TickOutcome {
        let Some(owner) = owner else {
            return TickOutcome::Remove(SaveMode::NotInSlot);
        };
        let out_of_range = self.position.distance(&owner.position()) > world.visibility_range();
        if (out_of_range && !self.possessed) || owner_active.is_none() {
            return TickOutcome::Remove(SaveMode::NotInSlot);
        }
        if owner_active != Some(handle) {
            error!(
                pet = %self.number,
                owner = %self.owner,
                %handle,
                "pet is not its owner's active pet"
            );
            if self.kind == PetKind::Hunter {
                panic!(
                    "hunter pet {} lost track of owner {} (handle {})",
                    self.number, self.owner, handle
                );
            }
            return TickOutcome::Remove(SaveMode::NotInSlot);
        }

        if let Some(left) = self.remaining_duration {
            if left > diff {
                self.remaining_duration = Some(left - diff);
            } else {
                let mode = match self.kind {
                    PetKind::Summon => SaveMode::NotInSlot,
                    PetKind::Hunter => SaveMode::Deleted,
                };
                return TickOutcome::Remove(mode);
            }
        }

        if self.power() == PowerKind::Focus {
            if self.regen_timer > diff {
                self.regen_timer -= diff;
            } else {
                self.regenerate_focus();
                self.regen_timer = (self.config.focus_regen_interval() + self.regen_timer).saturating_sub(diff);
            }
        }

        self.update_deferred(owner, world, now);

        if self.kind == PetKind::Hunter {
            if self.happiness_timer > diff {
                self.happiness_timer -= diff;
            } else {
                self.lose_happiness();
                self.happiness_timer = (self.config.happiness_interval() + self.happiness_timer).saturating_sub(diff);
            }
        }

        self.effects.expire(diff);
        TickOutcome::Continue
    }

    fn regenerate_focus(&mut self) {
        self.focus = (self.focus + self.config.focus_regen_amount).min(self.config.max_focus);
    }

    fn lose_happiness(&mut self) {
        if self.happiness == 0 {
            return;
        }
        let mut loss = self.config.happiness_loss;
        if self.in_combat {
            loss = (loss as f32 * self.config.combat_happiness_multiplier) as u32;
        }
        self.happiness = self.happiness.saturating_sub(loss);
    }

    /// The pet died this tick
    pub fn kill(&mut self) {
        if self.life != LifeState::Alive {
            return;
        }
        self.life = LifeState::JustDied;
        self.health = 0;
        self.deferred = None;
        self.lootable = true;
        self.skinnable = self.creature_type == CreatureType::Beast;
    }

    fn enter_corpse(&mut self, world: &dyn World, now: &GameTime) {
        self.life = LifeState::Corpse {
            remove_at: now.uptime + self.config.corpse_retention(),
        };
        if self.kind == PetKind::Hunter {
            self.lootable = false;
            self.skinnable = false;
            if !world.map_kind().is_pvp() {
                self.happiness = self.happiness.saturating_sub(self.config.happiness_tier_size);
            }
        }
        debug!(pet = %self.number, happiness = self.happiness, "pet corpse");
    }

    /// Bring a dead pet back with full health
    pub fn revive(&mut self, owner: &dyn OwnerView) -> bool {
        if !matches!(self.life, LifeState::JustDied | LifeState::Corpse { .. }) {
            return false;
        }
        self.life = LifeState::Alive;
        self.health = self.stats.max_health;
        self.lootable = false;
        self.skinnable = false;
        self.cast_pet_auras(owner, true);
        true
    }

    pub fn is_lootable(&self) -> bool {
        self.lootable
    }

    pub fn is_skinnable(&self) -> bool {
        self.skinnable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{handle, ranked_catalog, summoned, FakeOwner, FakeWorld};
    use crate::{MapKind, Position};

    const TICK: Duration = Duration::from_millis(100);

    fn tick(pet: &mut Pet, owner: &FakeOwner, world: &FakeWorld, now: &mut GameTime, diff: Duration) -> TickOutcome {
        now.advance(diff);
        let h = handle(pet);
        pet.update(diff, Some(owner), Some(h), h, world, now)
    }

    #[test]
    fn test_hunter_corpse_lingers_then_removed() {
        let owner = FakeOwner::hunter(40);
        let world = FakeWorld::new();
        let mut now = GameTime::at_unix(1_000);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        let before = pet.happiness();

        pet.kill();
        assert_eq!(pet.life(), LifeState::JustDied);
        assert_eq!(tick(&mut pet, &owner, &world, &mut now, TICK), TickOutcome::Continue);
        assert!(matches!(pet.life(), LifeState::Corpse { .. }));
        assert_eq!(pet.happiness(), before - 333_000);
        assert!(!pet.is_lootable());

        assert_eq!(
            tick(&mut pet, &owner, &world, &mut now, Duration::from_secs(60)),
            TickOutcome::Continue
        );
        assert_eq!(
            tick(&mut pet, &owner, &world, &mut now, Duration::from_secs(300)),
            TickOutcome::Remove(SaveMode::NotInSlot)
        );
    }

    #[test]
    fn test_summon_corpse_removed_at_once() {
        let owner = FakeOwner::warlock(30);
        let world = FakeWorld::new();
        let mut now = GameTime::at_unix(1_000);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Summon, 30);
        pet.kill();
        tick(&mut pet, &owner, &world, &mut now, TICK);
        assert_eq!(
            tick(&mut pet, &owner, &world, &mut now, TICK),
            TickOutcome::Remove(SaveMode::NotInSlot)
        );
    }

    #[test]
    fn test_no_happiness_loss_on_pvp_death() {
        let owner = FakeOwner::hunter(40);
        let mut world = FakeWorld::new();
        world.map = MapKind::Arena;
        let mut now = GameTime::at_unix(1_000);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        let before = pet.happiness();
        pet.kill();
        tick(&mut pet, &owner, &world, &mut now, TICK);
        assert_eq!(pet.happiness(), before);
    }

    #[test]
    fn test_ownership_checks_remove() {
        let mut owner = FakeOwner::warlock(30);
        let world = FakeWorld::new();
        let now = GameTime::at_unix(1_000);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Summon, 30);
        let h = handle(&pet);

        let gone = pet.update(TICK, None, Some(h), h, &world, &now);
        assert_eq!(gone, TickOutcome::Remove(SaveMode::NotInSlot));

        let inactive = pet.update(TICK, Some(&owner), None, h, &world, &now);
        assert_eq!(inactive, TickOutcome::Remove(SaveMode::NotInSlot));

        let other = PetHandle {
            entity: h.entity,
            epoch: h.epoch + 1,
        };
        let mismatch = pet.update(TICK, Some(&owner), Some(other), h, &world, &now);
        assert_eq!(mismatch, TickOutcome::Remove(SaveMode::NotInSlot));

        owner.position = Position::new(500.0, 0.0, 0.0);
        let far = pet.update(TICK, Some(&owner), Some(h), h, &world, &now);
        assert_eq!(far, TickOutcome::Remove(SaveMode::NotInSlot));

        pet.set_possessed(true);
        let possessed = pet.update(TICK, Some(&owner), Some(h), h, &world, &now);
        assert_eq!(possessed, TickOutcome::Continue);
    }

    #[test]
    #[should_panic(expected = "lost track of owner")]
    fn test_hunter_ownership_mismatch_is_fatal() {
        let owner = FakeOwner::hunter(40);
        let world = FakeWorld::new();
        let now = GameTime::at_unix(1_000);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        let h = handle(&pet);
        let other = PetHandle {
            entity: h.entity,
            epoch: h.epoch + 1,
        };
        pet.update(TICK, Some(&owner), Some(other), h, &world, &now);
    }

    #[test]
    fn test_time_limited_summon_expires() {
        let owner = FakeOwner::mage(30);
        let world = FakeWorld::new();
        let mut now = GameTime::at_unix(1_000);
        let mut pet = crate::fixtures::summoned_with(&owner, ranked_catalog(), PetKind::Summon, 30, |record| {
            record.creation_ability = Some(crate::AbilityId(600));
        });
        assert!(pet.is_time_limited());
        assert_eq!(
            tick(&mut pet, &owner, &world, &mut now, Duration::from_secs(59)),
            TickOutcome::Continue
        );
        assert_eq!(
            tick(&mut pet, &owner, &world, &mut now, Duration::from_secs(1)),
            TickOutcome::Remove(SaveMode::NotInSlot)
        );
    }

    #[test]
    fn test_focus_and_happiness_timers() {
        let owner = FakeOwner::hunter(40);
        let world = FakeWorld::new();
        let mut now = GameTime::at_unix(1_000);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        pet.focus = 0;
        let happiness = pet.happiness();

        tick(&mut pet, &owner, &world, &mut now, Duration::from_secs(4));
        assert_eq!(pet.focus(), 24);

        tick(&mut pet, &owner, &world, &mut now, Duration::from_millis(3_500));
        assert_eq!(pet.happiness(), happiness - 670);

        pet.set_in_combat(true);
        tick(&mut pet, &owner, &world, &mut now, Duration::from_millis(7_500));
        assert_eq!(pet.happiness(), happiness - 670 - 1_005);
    }

    #[test]
    fn test_happiness_timer_carries_overshoot() {
        let owner = FakeOwner::hunter(40);
        let world = FakeWorld::new();
        let mut now = GameTime::at_unix(1_000);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        let happiness = pet.happiness();

        tick(&mut pet, &owner, &world, &mut now, Duration::from_millis(8_000));
        assert_eq!(pet.happiness(), happiness - 670);

        // 500ms of the first tick count toward the next interval
        tick(&mut pet, &owner, &world, &mut now, Duration::from_millis(7_000));
        assert_eq!(pet.happiness(), happiness - 1_340);
    }

    #[test]
    fn test_revive_restores_health() {
        let owner = FakeOwner::hunter(40);
        let mut pet = summoned(&owner, ranked_catalog(), PetKind::Hunter, 40);
        assert!(!pet.revive(&owner));
        pet.kill();
        assert_eq!(pet.health(), 0);
        assert!(pet.revive(&owner));
        assert!(pet.is_alive());
        assert_eq!(pet.health(), pet.stats().max_health);
    }
}
