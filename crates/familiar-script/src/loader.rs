//! RON catalog and config loader

use crate::error::{Error, Result};
use crate::schema::CatalogFile;
use familiar_core::{AbilityId, Catalog, FamilyId, PetConfig, SpeciesId, TalentId};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Loader for RON catalog files
///
/// Files are merged in load order; an id defined twice is an error.
#[derive(Debug, Default)]
pub struct Loader {
    file: CatalogFile,
    abilities: HashSet<AbilityId>,
    talents: HashSet<TalentId>,
    families: HashSet<FamilyId>,
    species: HashSet<SpeciesId>,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loading catalog file");
        self.load_str(&content)
    }

    /// Load all RON files from a directory, recursing into subdirectories
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        // Directory order is platform dependent.
        entries.sort();

        for file_path in entries {
            if file_path.extension().is_some_and(|e| e == "ron") {
                self.load_file(&file_path)?;
            } else if file_path.is_dir() {
                self.load_directory(&file_path)?;
            }
        }

        Ok(())
    }

    /// Merge a catalog from a RON string
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let file: CatalogFile = ron::from_str(content)?;
        if file.is_empty() {
            return Err(Error::InvalidSchema("catalog file defines nothing".to_string()));
        }

        for def in &file.abilities {
            if !self.abilities.insert(def.id) {
                return Err(Error::DuplicateDefinition(def.id.to_string()));
            }
        }
        for def in &file.talents {
            if !self.talents.insert(def.id) {
                return Err(Error::DuplicateDefinition(def.id.to_string()));
            }
        }
        for def in &file.families {
            if !self.families.insert(def.id) {
                return Err(Error::DuplicateDefinition(def.id.to_string()));
            }
        }
        for def in &file.species {
            if !self.species.insert(def.id) {
                return Err(Error::DuplicateDefinition(def.id.to_string()));
            }
        }
        if !file.xp_per_level.is_empty() && !self.file.xp_per_level.is_empty() {
            return Err(Error::DuplicateDefinition("xp_per_level".to_string()));
        }

        let CatalogFile {
            abilities,
            talents,
            families,
            species,
            level_stats,
            xp_per_level,
        } = file;
        self.file.abilities.extend(abilities);
        self.file.talents.extend(talents);
        self.file.families.extend(families);
        self.file.species.extend(species);
        self.file.level_stats.extend(level_stats);
        if !xp_per_level.is_empty() {
            self.file.xp_per_level = xp_per_level;
        }
        Ok(())
    }

    /// Check cross references and build the catalog
    pub fn finish(self) -> Result<Catalog> {
        self.validate()?;

        let file = self.file;
        info!(
            abilities = file.abilities.len(),
            talents = file.talents.len(),
            families = file.families.len(),
            species = file.species.len(),
            "Catalog loaded"
        );

        let mut catalog = Catalog::new();
        for def in file.abilities {
            catalog.insert_ability(def);
        }
        for def in file.talents {
            catalog.insert_talent(def);
        }
        for def in file.families {
            catalog.insert_family(def);
        }
        for def in file.species {
            catalog.insert_species(def);
        }
        for stats in file.level_stats {
            catalog.insert_level_stats(stats);
        }
        catalog.set_xp_table(file.xp_per_level);
        Ok(catalog)
    }

    /// Get the merged definitions (for inspection during loading)
    pub fn file(&self) -> &CatalogFile {
        &self.file
    }

    fn validate(&self) -> Result<()> {
        let ability = |from: String, id: AbilityId| -> Result<()> {
            if self.abilities.contains(&id) {
                Ok(())
            } else {
                Err(Error::UnknownReference {
                    from,
                    to: id.to_string(),
                })
            }
        };

        for def in &self.file.abilities {
            for rank in def.prev_rank.iter().chain(def.next_rank.iter()) {
                ability(def.id.to_string(), *rank)?;
            }
        }
        for def in &self.file.talents {
            if def.ranks.is_empty() {
                return Err(Error::InvalidSchema(format!("{} has no ranks", def.id)));
            }
            for rank in &def.ranks {
                ability(def.id.to_string(), *rank)?;
            }
        }
        for def in &self.file.families {
            for id in def.passives.iter().chain(def.levelup.iter().map(|(_, id)| id)) {
                ability(def.id.to_string(), *id)?;
            }
            if def.levelup.windows(2).any(|w| w[0].0 > w[1].0) {
                return Err(Error::InvalidSchema(format!(
                    "{} levelup list is not in level order",
                    def.id
                )));
            }
        }
        for def in &self.file.species {
            if let Some(family) = def.family {
                if !self.families.contains(&family) {
                    return Err(Error::UnknownReference {
                        from: def.id.to_string(),
                        to: family.to_string(),
                    });
                }
            }
            for id in def.default_abilities.iter().chain(&def.bonus_effects) {
                ability(def.id.to_string(), *id)?;
            }
        }
        Ok(())
    }
}

/// Parse companion tunables; missing fields take their defaults
pub fn load_config_str(content: &str) -> Result<PetConfig> {
    let config: PetConfig = ron::from_str(content)?;
    if config.max_level == 0 {
        return Err(Error::InvalidSchema("max_level must be at least 1".to_string()));
    }
    if config.happiness_tier_size == 0 {
        return Err(Error::InvalidSchema(
            "happiness_tier_size must be positive".to_string(),
        ));
    }
    Ok(config)
}

/// Read companion tunables from a RON file
pub fn load_config_file(path: impl AsRef<Path>) -> Result<PetConfig> {
    let content = fs::read_to_string(path.as_ref())?;
    load_config_str(&content)
}
