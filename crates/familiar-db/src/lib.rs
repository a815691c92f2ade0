//! Familiar DB - Database layer using native_db
//!
//! Provides persistent storage for:
//! - Pet records, keyed by pet number and indexed by owner
//! - Child records: abilities, cooldowns, effects, declined names
//! - The pet number allocator
//!
//! [`Store`] implements [`familiar_core::PetStore`]; [`FetchWorker`] runs the
//! load fetch on a background thread and implements [`familiar_core::AsyncFetch`].

mod error;
mod models;
mod queries;
mod store;
mod worker;

pub use error::{Error, Result};
pub use store::Store;
pub use worker::FetchWorker;
