//! Learning and unlearning abilities, autocast, talents

use super::Pet;
use crate::{
    max_talent_points, AbilityDef, AbilityEntry, AbilityId, AbilityKind, ActiveState, Directive,
    DirtyState, EffectDuration, EffectRecord, EffectSource, Notification, OwnerView, SlotKind,
    MAX_RANK_STEPS,
};
use tracing::error;

/// Where an ability being added comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Learned now; the store has not seen it
    Learned,
    /// Read back from the store
    Stored,
}

impl Pet {
    /// Learn an ability, telling the owner unless the pet is still loading
    pub fn learn_ability(&mut self, ability: AbilityId) -> bool {
        if !self.add_ability(ability, ActiveState::Decide, Origin::Learned, AbilityKind::Normal) {
            return false;
        }
        if !self.loading {
            self.outbox.notify(Notification::AbilityLearned {
                pet: self.entity,
                ability,
            });
        }
        true
    }

    /// Unlearn an ability, optionally falling back to its previous rank
    pub fn unlearn_ability(&mut self, ability: AbilityId, learn_prev: bool, clear_bar: bool) -> bool {
        if !self.remove_ability(ability, learn_prev, clear_bar) {
            return false;
        }
        if !self.loading {
            self.outbox.notify(Notification::AbilityUnlearned {
                pet: self.entity,
                ability,
            });
        }
        true
    }

    /// Learn an ability and every higher rank after it
    pub fn learn_high_rank(&mut self, ability: AbilityId) {
        let mut next = Some(ability);
        for _ in 0..MAX_RANK_STEPS {
            let Some(current) = next else {
                break;
            };
            self.learn_ability(current);
            next = self.catalog.next_rank(current).filter(|n| *n != current);
        }
    }

    /// Turn autocast on or off for an autocastable ability
    pub fn toggle_autocast(&mut self, ability: AbilityId, on: bool) {
        let autocastable = self
            .catalog
            .ability(ability)
            .is_some_and(|def| def.autocastable);
        if !autocastable {
            return;
        }
        let state = if on { ActiveState::Enabled } else { ActiveState::Disabled };
        if self.abilities.set_active(ability, state) {
            self.action_bar.set_kind(ability, state.into());
        }
    }

    pub(crate) fn add_ability(
        &mut self,
        ability: AbilityId,
        active: ActiveState,
        origin: Origin,
        kind: AbilityKind,
    ) -> bool {
        let catalog = self.catalog.clone();
        let Some(def) = catalog.ability(ability) else {
            error!(pet = %self.number, %ability, "ability does not exist");
            if origin == Origin::Stored {
                self.purged.push(ability);
            }
            return false;
        };

        let mut state = match origin {
            Origin::Learned => DirtyState::New,
            Origin::Stored => DirtyState::Unchanged,
        };
        if let Some(existing) = self.abilities.get(ability).copied() {
            if existing.state == DirtyState::Removed {
                let previous = self.abilities.take_removed(ability).unwrap_or(existing.active);
                state = DirtyState::Changed { previous };
            } else if origin == Origin::Stored && existing.state != DirtyState::Unchanged {
                // Learned during load before the stored copy arrived.
                self.abilities.mark_unchanged(ability);
                self.toggle_autocast(ability, active == ActiveState::Enabled);
                return false;
            } else {
                return false;
            }
        }

        let mut active = match active {
            ActiveState::Decide if def.autocastable => ActiveState::Disabled,
            ActiveState::Decide => ActiveState::Passive,
            other => other,
        };

        if let Some((talent, _)) = catalog.talent_of(ability) {
            for rank in talent.ranks.iter().copied() {
                if rank != ability && self.abilities.knows(rank) {
                    self.remove_ability(rank, false, false);
                }
            }
        } else if catalog.is_ranked(ability) {
            let known: Vec<(AbilityId, ActiveState)> = self
                .abilities
                .known()
                .map(|(id, entry)| (id, entry.active))
                .collect();
            for (other, other_active) in known {
                if !catalog.has_ability(other) || !catalog.is_different_rank_of(ability, other) {
                    continue;
                }
                if !catalog.is_higher_rank_of(ability, other) {
                    return false;
                }
                active = other_active;
                if active == ActiveState::Enabled {
                    self.toggle_autocast(other, false);
                }
                self.unlearn_ability(other, false, false);
                break;
            }
        }

        self.abilities.insert(ability, AbilityEntry { active, state, kind });

        if def.passive {
            self.apply_passive(def);
        } else {
            self.action_bar
                .add_ability(ability, active.into(), |other| catalog.is_different_rank_of(ability, other));
        }
        self.toggle_autocast(ability, active == ActiveState::Enabled);

        let cost = catalog.talent_cost(ability);
        if cost > 0 {
            self.talents.spend(cost);
            self.talents.max = max_talent_points(self.level, self.talent_bonus);
        }
        true
    }

    pub(crate) fn remove_ability(&mut self, ability: AbilityId, learn_prev: bool, clear_bar: bool) -> bool {
        if !self.abilities.remove(ability) {
            return false;
        }
        self.effects.remove(ability);

        let cost = self.catalog.talent_cost(ability);
        if cost > 0 {
            self.talents.refund(cost);
            self.talents.max = max_talent_points(self.level, self.talent_bonus);
        }

        let mut learned_prev = false;
        if learn_prev {
            if let Some(prev) = self.catalog.prev_rank(ability).filter(|p| *p != ability) {
                self.learn_ability(prev);
                learned_prev = true;
            }
        }

        if clear_bar && !learned_prev && self.action_bar.remove_ability(ability) && !self.loading {
            self.outbox.notify(Notification::ActionBarRefresh { pet: self.entity });
        }
        true
    }

    fn apply_passive(&mut self, def: &AbilityDef) {
        let duration = match def.duration_ms {
            Some(ms) if ms > 0 => EffectDuration::Timed(std::time::Duration::from_millis(ms)),
            _ => EffectDuration::Permanent,
        };
        self.effects
            .apply(EffectRecord::new(def.id, duration).with_source(EffectSource::Passive));
        self.outbox.direct(Directive::Cast {
            ability: def.id,
            target: self.entity,
        });
    }

    /// Learn the creature family's passives
    pub fn learn_family_passives(&mut self) {
        let Some(family) = self.family.and_then(|id| self.catalog.family(id)) else {
            return;
        };
        let passives = family.passives.clone();
        for ability in passives {
            self.add_ability(ability, ActiveState::Decide, Origin::Learned, AbilityKind::FamilyPassive);
        }
    }

    /// Bring level-gated abilities in line with the current level
    ///
    /// The family list is walked from the highest level down so that losing
    /// levels falls back to lower ranks and gaining them learns forward.
    pub fn init_levelup_abilities(&mut self) {
        let level = self.level;
        let levelup: Vec<(u8, AbilityId)> = self
            .family
            .and_then(|id| self.catalog.family(id))
            .map(|family| family.levelup.clone())
            .unwrap_or_default();
        for (required, ability) in levelup.into_iter().rev() {
            if required > level {
                self.unlearn_ability(ability, true, true);
            } else {
                self.learn_ability(ability);
            }
        }

        let defaults: Vec<AbilityId> = self
            .catalog
            .species(self.species)
            .map(|species| species.default_abilities.clone())
            .unwrap_or_default();
        for ability in defaults {
            let Some(spell_level) = self.catalog.ability(ability).map(|def| def.spell_level) else {
                continue;
            };
            if spell_level > level {
                self.unlearn_ability(ability, true, true);
            } else {
                self.learn_ability(ability);
            }
        }
    }

    /// Recompute the allotment, resetting talents if it no longer covers them
    pub fn init_talents_for_level(&mut self) {
        let max = max_talent_points(self.level, self.talent_bonus);
        self.talents.max = max;
        if self.talents.needs_reset() {
            self.reset_talents();
        }
        self.talents.max = max;
        if !self.loading {
            self.outbox.notify(Notification::TalentsChanged {
                pet: self.entity,
                free_points: self.talents.free(),
            });
        }
    }

    /// Unlearn every talent of the family's tree and refund all points
    pub fn reset_talents(&mut self) -> bool {
        let catalog = self.catalog.clone();
        let Some(talent_type) = self
            .family
            .and_then(|id| catalog.family(id))
            .and_then(|family| family.talent_type)
        else {
            return false;
        };
        let max = max_talent_points(self.level, self.talent_bonus);
        if self.talents.used == 0 {
            self.talents.max = max;
            return false;
        }

        let mask = 1u32.checked_shl(talent_type as u32).unwrap_or(0);
        for talent in catalog.talents().filter(|t| t.pet_talent_mask & mask != 0) {
            for rank in &talent.ranks {
                let known: Vec<AbilityId> = self
                    .abilities
                    .known()
                    .map(|(id, _)| id)
                    .filter(|id| catalog.first_rank(*id) == *rank)
                    .collect();
                for ability in known {
                    self.unlearn_ability(ability, false, true);
                }
            }
        }
        self.talents.used = 0;
        self.talents.max = max;
        if !self.loading {
            self.outbox.notify(Notification::TalentsChanged {
                pet: self.entity,
                free_points: self.talents.free(),
            });
        }
        true
    }

    /// Apply the owner's pet auras to a permanent pet
    ///
    /// Summoning a pet that is not the owner's current one drops the auras
    /// that do not carry over.
    pub fn cast_pet_auras(&mut self, owner: &dyn OwnerView, current: bool) {
        if !self.is_permanent_for(owner) {
            return;
        }
        for aura in owner.pet_auras() {
            if !current && aura.removed_on_pet_change {
                self.outbox
                    .direct(Directive::DropOwnerPetAura { ability: aura.ability });
            } else {
                self.effects.apply(
                    EffectRecord::new(aura.ability, EffectDuration::Permanent)
                        .with_source(EffectSource::Owner),
                );
            }
        }
    }

    /// Clear bar slots of unknown abilities and sync autocast from the bar
    pub fn cleanup_action_bar(&mut self) {
        let abilities = &self.abilities;
        let autocast = self.action_bar.cleanup(|id| abilities.knows(id));
        for (ability, on) in autocast {
            self.toggle_autocast(ability, on);
        }
    }

    /// Place an ability on a specific bar kind, as the owner's client asks
    pub fn set_bar_kind(&mut self, ability: AbilityId, kind: SlotKind) {
        match kind {
            SlotKind::Enabled => self.toggle_autocast(ability, true),
            SlotKind::Disabled => self.toggle_autocast(ability, false),
            _ => self.action_bar.set_kind(ability, kind),
        }
    }
}
