//! On-disk layout of a catalog file
//!
//! Every section is optional, so content can be split across files:
//!
//! ```ron
//! (
//!     abilities: [
//!         (id: 100, name: "Growl", autocastable: true, cooldown_ms: 5000),
//!     ],
//!     species: [
//!         (id: 1, name: "Gray Wolf", family: Some(1), tameable: true, default_abilities: [100]),
//!     ],
//! )
//! ```

use familiar_core::{AbilityDef, FamilyDef, LevelStats, SpeciesDef, TalentDef};
use serde::{Deserialize, Serialize};

/// One catalog file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub abilities: Vec<AbilityDef>,
    pub talents: Vec<TalentDef>,
    pub families: Vec<FamilyDef>,
    pub species: Vec<SpeciesDef>,
    pub level_stats: Vec<LevelStats>,
    /// XP needed to finish each level, starting at level 1
    pub xp_per_level: Vec<u32>,
}

impl CatalogFile {
    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
            && self.talents.is_empty()
            && self.families.is_empty()
            && self.species.is_empty()
            && self.level_stats.is_empty()
            && self.xp_per_level.is_empty()
    }
}
