//! Learned abilities with activation mode and dirty tracking
//!
//! Every entry carries a [`DirtyState`] describing how it differs from the
//! store. [`AbilityBook::flush`] folds the book into store operations and
//! leaves every entry `Unchanged`, so a second flush without mutation
//! produces nothing.

use crate::{AbilityId, PetNumber, StoreOp};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Activation mode of a learned ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiveState {
    /// Resolve from the ability definition when learned
    Decide,
    Passive,
    /// Autocastable, autocast off
    Disabled,
    /// Autocastable, autocast on
    Enabled,
}

impl ActiveState {
    /// Stored code
    pub fn code(&self) -> u8 {
        match self {
            ActiveState::Decide => 0x00,
            ActiveState::Passive => 0x01,
            ActiveState::Disabled => 0x81,
            ActiveState::Enabled => 0xC1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(ActiveState::Decide),
            0x01 => Some(ActiveState::Passive),
            0x81 => Some(ActiveState::Disabled),
            0xC1 => Some(ActiveState::Enabled),
            _ => None,
        }
    }
}

/// Where an ability came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityKind {
    Normal,
    /// Granted by the creature family; never persisted
    FamilyPassive,
}

/// Difference between the in-memory entry and the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    Unchanged,
    New,
    /// Stored row exists with the `previous` activation mode
    Changed { previous: ActiveState },
    /// Stored row exists but the ability was unlearned
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityEntry {
    pub active: ActiveState,
    pub state: DirtyState,
    pub kind: AbilityKind,
}

impl AbilityEntry {
    pub fn is_known(&self) -> bool {
        self.state != DirtyState::Removed
    }
}

/// The pet's ability collection
#[derive(Debug, Clone, Default)]
pub struct AbilityBook {
    entries: IndexMap<AbilityId, AbilityEntry>,
}

impl AbilityBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AbilityId) -> Option<&AbilityEntry> {
        self.entries.get(&id)
    }

    /// Known and not pending removal
    pub fn knows(&self, id: AbilityId) -> bool {
        self.entries.get(&id).is_some_and(AbilityEntry::is_known)
    }

    /// Known abilities in learn order
    pub fn known(&self) -> impl Iterator<Item = (AbilityId, &AbilityEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_known())
            .map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.known().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write an entry as-is, replacing whatever was there
    pub fn insert(&mut self, id: AbilityId, entry: AbilityEntry) {
        self.entries.insert(id, entry);
    }

    /// Drop a `Removed` entry so it can be learned again
    ///
    /// Returns the activation mode the stored row had.
    pub fn take_removed(&mut self, id: AbilityId) -> Option<ActiveState> {
        match self.entries.get(&id) {
            Some(entry) if entry.state == DirtyState::Removed => {
                self.entries.shift_remove(&id).map(|entry| entry.active)
            }
            _ => None,
        }
    }

    /// Mark settled after a load; a pending change is forgotten
    pub fn mark_unchanged(&mut self, id: AbilityId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.state = DirtyState::Unchanged;
        }
    }

    /// Unlearn; an entry the store never saw is erased outright
    pub fn remove(&mut self, id: AbilityId) -> bool {
        match self.entries.get(&id).map(|entry| entry.state) {
            None | Some(DirtyState::Removed) => false,
            Some(DirtyState::New) => {
                self.entries.shift_remove(&id);
                true
            }
            Some(_) => {
                if let Some(entry) = self.entries.get_mut(&id) {
                    entry.state = DirtyState::Removed;
                }
                true
            }
        }
    }

    /// Change the activation mode, tracking the change for the next flush
    pub fn set_active(&mut self, id: AbilityId, active: ActiveState) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        if !entry.is_known() || entry.active == active {
            return false;
        }
        entry.state = match entry.state {
            DirtyState::Unchanged => DirtyState::Changed {
                previous: entry.active,
            },
            other => other,
        };
        entry.active = active;
        true
    }

    /// Whether any entry would produce a store write
    pub fn is_dirty(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.kind == AbilityKind::Normal && entry.state != DirtyState::Unchanged)
    }

    /// Fold the book into store operations and settle every entry
    pub fn flush(&mut self, pet: PetNumber) -> Vec<StoreOp> {
        let mut ops = Vec::new();
        self.entries.retain(|id, entry| {
            if entry.kind == AbilityKind::FamilyPassive {
                return true;
            }
            let insert = StoreOp::InsertAbility {
                pet,
                ability: *id,
                active: entry.active,
            };
            match entry.state {
                DirtyState::Unchanged => {}
                DirtyState::New => ops.push(insert),
                DirtyState::Changed { .. } => {
                    ops.push(StoreOp::DeleteAbility { pet, ability: *id });
                    ops.push(insert);
                }
                DirtyState::Removed => {
                    ops.push(StoreOp::DeleteAbility { pet, ability: *id });
                    return false;
                }
            }
            entry.state = DirtyState::Unchanged;
            true
        });
        ops
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
