//! The pet's ten-slot action bar

use crate::{AbilityId, ActiveState};
use std::fmt::Write;

pub const ACTION_BAR_SLOTS: usize = 10;

/// What a slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Ability slot; the ability is passive or the slot is empty
    Passive,
    /// Ability slot with autocast off
    Disabled,
    /// Ability slot with autocast on
    Enabled,
    Command,
    Reaction,
}

impl SlotKind {
    pub fn code(&self) -> u32 {
        match self {
            SlotKind::Passive => 0x01,
            SlotKind::Disabled => 0x81,
            SlotKind::Enabled => 0xC1,
            SlotKind::Command => 0x07,
            SlotKind::Reaction => 0x06,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x01 => Some(SlotKind::Passive),
            0x81 => Some(SlotKind::Disabled),
            0xC1 => Some(SlotKind::Enabled),
            0x07 => Some(SlotKind::Command),
            0x06 => Some(SlotKind::Reaction),
            _ => None,
        }
    }

    pub fn is_ability(&self) -> bool {
        matches!(self, SlotKind::Passive | SlotKind::Disabled | SlotKind::Enabled)
    }
}

impl From<ActiveState> for SlotKind {
    fn from(state: ActiveState) -> Self {
        match state {
            ActiveState::Enabled => SlotKind::Enabled,
            ActiveState::Disabled => SlotKind::Disabled,
            ActiveState::Passive | ActiveState::Decide => SlotKind::Passive,
        }
    }
}

/// Command actions
pub const COMMAND_STAY: u32 = 0;
pub const COMMAND_FOLLOW: u32 = 1;
pub const COMMAND_ATTACK: u32 = 2;

/// Reaction actions
pub const REACT_PASSIVE: u32 = 0;
pub const REACT_DEFENSIVE: u32 = 1;
pub const REACT_AGGRESSIVE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSlot {
    pub kind: SlotKind,
    pub action: u32,
}

impl ActionSlot {
    const EMPTY: ActionSlot = ActionSlot {
        kind: SlotKind::Passive,
        action: 0,
    };

    /// Ability held by this slot, if any
    pub fn ability(&self) -> Option<AbilityId> {
        (self.kind.is_ability() && self.action != 0).then_some(AbilityId(self.action))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBar {
    slots: [ActionSlot; ACTION_BAR_SLOTS],
}

impl Default for ActionBar {
    /// Commands, four empty ability slots, then reactions
    fn default() -> Self {
        let command = |action| ActionSlot {
            kind: SlotKind::Command,
            action,
        };
        let reaction = |action| ActionSlot {
            kind: SlotKind::Reaction,
            action,
        };
        Self {
            slots: [
                command(COMMAND_ATTACK),
                command(COMMAND_FOLLOW),
                command(COMMAND_STAY),
                ActionSlot::EMPTY,
                ActionSlot::EMPTY,
                ActionSlot::EMPTY,
                ActionSlot::EMPTY,
                reaction(REACT_AGGRESSIVE),
                reaction(REACT_DEFENSIVE),
                reaction(REACT_PASSIVE),
            ],
        }
    }
}

impl ActionBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, index: usize) -> Option<&ActionSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[ActionSlot] {
        &self.slots
    }

    pub fn contains(&self, ability: AbilityId) -> bool {
        self.slots.iter().any(|slot| slot.ability() == Some(ability))
    }

    /// `"kind action "` for every slot in index order
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for slot in &self.slots {
            let _ = write!(out, "{} {} ", slot.kind.code(), slot.action);
        }
        out
    }

    /// Parse an encoded bar; `None` if any pair is missing or malformed
    pub fn decode(encoded: &str) -> Option<Self> {
        let numbers: Vec<u32> = encoded
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;
        if numbers.len() != ACTION_BAR_SLOTS * 2 {
            return None;
        }
        let mut bar = Self::default();
        for (slot, pair) in bar.slots.iter_mut().zip(numbers.chunks_exact(2)) {
            *slot = ActionSlot {
                kind: SlotKind::from_code(pair[0])?,
                action: pair[1],
            };
        }
        Some(bar)
    }

    /// Decode, falling back to the default layout
    pub fn decode_or_default(encoded: &str) -> Self {
        Self::decode(encoded).unwrap_or_default()
    }

    /// Put an ability on the bar
    ///
    /// `replaces` names abilities of the same rank chain already on the bar;
    /// the first one found is overwritten. Otherwise the first empty ability
    /// slot is used. Returns false if the bar is full.
    pub fn add_ability(
        &mut self,
        ability: AbilityId,
        kind: SlotKind,
        mut same_chain: impl FnMut(AbilityId) -> bool,
    ) -> bool {
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.ability() == Some(ability)) {
            slot.kind = kind;
            return true;
        }
        let target = self
            .slots
            .iter()
            .position(|slot| slot.ability().is_some_and(&mut same_chain))
            .or_else(|| {
                self.slots
                    .iter()
                    .position(|slot| slot.kind.is_ability() && slot.action == 0)
            });
        match target {
            Some(index) => {
                self.slots[index] = ActionSlot {
                    kind,
                    action: ability.raw(),
                };
                true
            }
            None => false,
        }
    }

    /// Empty every slot holding `ability`
    pub fn remove_ability(&mut self, ability: AbilityId) -> bool {
        let mut removed = false;
        for slot in self.slots.iter_mut().filter(|slot| slot.ability() == Some(ability)) {
            *slot = ActionSlot::EMPTY;
            removed = true;
        }
        removed
    }

    pub fn set_kind(&mut self, ability: AbilityId, kind: SlotKind) {
        for slot in self.slots.iter_mut().filter(|slot| slot.ability() == Some(ability)) {
            slot.kind = kind;
        }
    }

    /// Clear slots whose ability is not known; report autocast for the rest
    ///
    /// Returns `(ability, autocast_on)` for every remaining ability slot.
    pub fn cleanup(&mut self, mut knows: impl FnMut(AbilityId) -> bool) -> Vec<(AbilityId, bool)> {
        let mut autocast = Vec::new();
        for slot in self.slots.iter_mut() {
            let Some(ability) = slot.ability() else {
                continue;
            };
            if knows(ability) {
                autocast.push((ability, slot.kind == SlotKind::Enabled));
            } else {
                *slot = ActionSlot::EMPTY;
            }
        }
        autocast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_encoding() {
        let encoded = ActionBar::default().encode();
        assert_eq!(encoded, "7 2 7 1 7 0 1 0 1 0 1 0 1 0 6 2 6 1 6 0 ");
        assert_eq!(ActionBar::decode(&encoded), Some(ActionBar::default()));
    }

    #[test]
    fn test_decode_short_falls_back() {
        assert_eq!(ActionBar::decode("7 2 7 1"), None);
        assert_eq!(ActionBar::decode_or_default("7 2 x"), ActionBar::default());
        assert_eq!(ActionBar::decode_or_default(""), ActionBar::default());
    }

    #[test]
    fn test_add_fills_first_empty_slot() {
        let mut bar = ActionBar::default();
        assert!(bar.add_ability(AbilityId(100), SlotKind::Disabled, |_| false));
        assert!(bar.add_ability(AbilityId(200), SlotKind::Enabled, |_| false));
        assert_eq!(bar.slot(3).and_then(ActionSlot::ability), Some(AbilityId(100)));
        assert_eq!(bar.slot(4).and_then(ActionSlot::ability), Some(AbilityId(200)));
    }

    #[test]
    fn test_add_replaces_same_chain() {
        let mut bar = ActionBar::default();
        bar.add_ability(AbilityId(100), SlotKind::Enabled, |_| false);
        bar.add_ability(AbilityId(101), SlotKind::Enabled, |id| id == AbilityId(100));
        assert!(!bar.contains(AbilityId(100)));
        assert_eq!(bar.slot(3).and_then(ActionSlot::ability), Some(AbilityId(101)));
    }

    #[test]
    fn test_bar_full() {
        let mut bar = ActionBar::default();
        for id in 1..=4 {
            assert!(bar.add_ability(AbilityId(id), SlotKind::Passive, |_| false));
        }
        assert!(!bar.add_ability(AbilityId(5), SlotKind::Passive, |_| false));
    }

    #[test]
    fn test_cleanup_clears_unknown() {
        let mut bar = ActionBar::default();
        bar.add_ability(AbilityId(1), SlotKind::Enabled, |_| false);
        bar.add_ability(AbilityId(2), SlotKind::Disabled, |_| false);
        let autocast = bar.cleanup(|id| id == AbilityId(1));
        assert_eq!(autocast, vec![(AbilityId(1), true)]);
        assert!(!bar.contains(AbilityId(2)));
    }
}
