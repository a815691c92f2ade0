//! Talent point accounting

use crate::{Catalog, PetKind, PetNumber, PetStable, StoreOp};

/// Talent points a pet of `level` may spend
///
/// Nothing below level 20, then one point per four levels past 16, plus
/// whatever the owner grants.
pub fn max_talent_points(level: u8, owner_bonus: u32) -> u32 {
    let base = if level >= 20 { (level as u32 - 16) / 4 } else { 0 };
    base + owner_bonus
}

/// Used points against the allotment for the current level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TalentPoints {
    pub used: u32,
    pub max: u32,
}

impl TalentPoints {
    pub fn free(&self) -> u32 {
        self.max.saturating_sub(self.used)
    }

    /// Whether the allotment no longer covers what is spent
    pub fn needs_reset(&self) -> bool {
        self.max == 0 || self.used > self.max
    }

    pub fn spend(&mut self, cost: u32) {
        self.used += cost;
    }

    pub fn refund(&mut self, cost: u32) {
        self.used = self.used.saturating_sub(cost);
    }
}

/// Store operations that strip talents from every offline pet of an owner
///
/// The online pet, if any, resets in memory instead.
pub fn talent_reset_ops(stable: &PetStable, online: Option<PetNumber>, catalog: &Catalog) -> Vec<StoreOp> {
    let mut talents: Vec<_> = catalog.talent_abilities().collect();
    talents.sort();
    stable
        .iter()
        .map(|(_, record)| record)
        .filter(|record| record.kind == PetKind::Hunter && Some(record.number) != online)
        .flat_map(|record| {
            talents.iter().map(move |ability| StoreOp::DeleteAbility {
                pet: record.number,
                ability: *ability,
            })
        })
        .collect()
}
