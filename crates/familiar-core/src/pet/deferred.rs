//! Casts queued until the pet can perform them

use super::{ControlState, Pet};
use crate::{AbilityId, Directive, EntityId, GameTime, OwnerView, World};

/// A cast the owner ordered while the pet could not yet perform it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredCast {
    pub ability: AbilityId,
    pub target: EntityId,
    /// Who to attack after a positive cast, if anyone
    pub fallback: Option<EntityId>,
    pub positive: bool,
}

impl Pet {
    /// Queue a cast; a newer request replaces any pending one
    pub fn cast_when_available(
        &mut self,
        ability: AbilityId,
        target: Option<EntityId>,
        fallback: Option<EntityId>,
        positive: bool,
    ) {
        let Some(target) = target else {
            return;
        };
        if ability.raw() == 0 {
            return;
        }
        self.deferred = Some(DeferredCast {
            ability,
            target,
            fallback,
            positive,
        });
    }

    pub fn clear_deferred_cast(&mut self) {
        self.deferred = None;
    }

    pub(crate) fn update_deferred(&mut self, owner: &dyn OwnerView, world: &dyn World, now: &GameTime) {
        let Some(request) = self.deferred else {
            return;
        };

        if !world.is_alive(request.target) {
            self.deferred = None;
            self.outbox.direct(Directive::StopMoving);
            match owner.combat_target().filter(|t| world.is_alive(*t)) {
                Some(target) => {
                    self.outbox.direct(Directive::Attack { target });
                    self.control = ControlState::attacking();
                }
                None => self.follow_owner(),
            }
            return;
        }

        let catalog = self.catalog.clone();
        let Some(def) = catalog.ability(request.ability) else {
            self.deferred = None;
            return;
        };

        let mut max_range = def.range.max;
        if def.range.melee {
            max_range -= 2.0 * self.config.min_melee_reach;
        }
        let in_range = world
            .position_of(request.target)
            .is_some_and(|at| self.position.distance(&at) < max_range.max(0.0));
        if !in_range || !world.line_of_sight(self.entity, request.target) {
            return;
        }
        if self.global_cooldowns.is_active(def.gcd_category, now)
            || self.cooldowns.is_active(request.ability, now)
        {
            return;
        }

        self.outbox.direct(Directive::StopMoving);
        self.control = self.control.stay();

        let cooldown = if def.cooldown_on_event {
            self.config.infinite_cooldown()
        } else {
            def.cooldown()
        };
        if !cooldown.is_zero() {
            self.cooldowns.start(request.ability, def.category, cooldown, now);
        }
        self.global_cooldowns.start(def.gcd_category, def.gcd(), now);

        self.outbox.direct(Directive::Cast {
            ability: request.ability,
            target: request.target,
        });
        self.deferred = None;

        if request.positive {
            match request.fallback.filter(|t| world.is_alive(*t)) {
                Some(target) => {
                    self.outbox.direct(Directive::Attack { target });
                    self.control = ControlState::attacking();
                }
                None => self.follow_owner(),
            }
        }
    }

    fn follow_owner(&mut self) {
        self.outbox.direct(Directive::Follow {
            leader: self.owner_entity,
            distance: self.config.follow_distance,
        });
        self.control = ControlState::follow();
    }
}
