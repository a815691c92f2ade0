//! Output of pet operations
//!
//! The core decides *what* should happen; the simulation performs it.
//! [`Directive`]s are orders for movement, combat, and ability execution.
//! [`Notification`]s are facts the messaging layer forwards to the owner.

use crate::{AbilityId, EntityId};
use std::time::Duration;

/// An order for the simulation to carry out
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    StopMoving,
    Cast { ability: AbilityId, target: EntityId },
    Attack { target: EntityId },
    Follow { leader: EntityId, distance: f32 },
    /// Drop an owner aura that does not carry over to this pet
    DropOwnerPetAura { ability: AbilityId },
}

/// Something the owner's client should learn about
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    AbilityLearned { pet: EntityId, ability: AbilityId },
    AbilityUnlearned { pet: EntityId, ability: AbilityId },
    CooldownCleared { pet: EntityId, ability: AbilityId },
    CooldownsRestored { pet: EntityId, cooldowns: Vec<(AbilityId, Duration)> },
    /// The creation ability went off as the pet appeared
    CastInProgress { pet: EntityId, ability: AbilityId },
    ActionBarRefresh { pet: EntityId },
    TalentsChanged { pet: EntityId, free_points: u32 },
}

/// Accumulated output, drained by the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outbox {
    pub directives: Vec<Directive>,
    pub notifications: Vec<Notification>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direct(&mut self, directive: Directive) {
        self.directives.push(directive);
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty() && self.notifications.is_empty()
    }

    pub fn take(&mut self) -> Outbox {
        std::mem::take(self)
    }
}
