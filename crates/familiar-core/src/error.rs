//! Error types for familiar-core

use crate::SpeciesId;
use thiserror::Error;

/// Why a load was declined without creating a pet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The owner already has an active pet
    OwnerHasActivePet,
    /// The owner is not placed in the simulation
    OwnerNotInWorld,
    /// The selected record is already the owner's live current pet
    AlreadyCurrent,
    /// Time-limited summons are never restored as current
    TimeLimitedAsCurrent,
    /// The species needs a taming permission the owner lacks
    NotTameable,
    /// The owner's class-specific visibility rule hides this companion kind
    ClassVisibility,
    /// The owner must temporarily unsummon; the record is tagged pending
    DeferredUnsummon,
}

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("no pet record matches the selection")]
    NotFound,

    #[error("spawn position is not valid (x: {x}, y: {y})")]
    InvalidPosition { x: f32, y: f32 },

    #[error("load rejected: {0:?}")]
    PolicyRejected(Rejection),

    #[error("load completion observed a stale binding")]
    StaleCallback,

    #[error("pet is not bound to its owner's active pet")]
    InconsistentOwnership,

    #[error("species template not found: {0}")]
    MissingTemplate(SpeciesId),

    #[error("store error: {0}")]
    Store(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
