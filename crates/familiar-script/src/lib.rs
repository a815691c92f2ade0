//! Familiar Script - RON loader for companion content
//!
//! Loads from RON files:
//! - Ability, talent, family, and species definitions
//! - Per-level base stats and the XP curve
//! - Companion tunables ([`familiar_core::PetConfig`])
//!
//! Cross references are checked when the loader finishes, so a catalog that
//! loads is one the core can walk without missing entries.

mod error;
mod loader;
mod schema;

pub use error::{Error, Result};
pub use loader::{load_config_file, load_config_str, Loader};
pub use schema::CatalogFile;
