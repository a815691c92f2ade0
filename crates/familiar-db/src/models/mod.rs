//! Database models for persistent storage.

mod children;
mod pet;

pub use children::*;
pub use pet::*;

/// Composite primary key of a child row: pet number in the high half,
/// ability id (or effect row slot) in the low half.
pub fn child_key(pet: u32, low: u32) -> u64 {
    ((pet as u64) << 32) | low as u64
}

/// Inclusive primary-key range covering every child row of a pet.
pub fn child_range(pet: u32) -> std::ops::RangeInclusive<u64> {
    child_key(pet, 0)..=child_key(pet, u32::MAX)
}
