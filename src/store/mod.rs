//! Field stores backing the key tree
//!
//! Provides:
//! - The [`Store`] contract every backing store implements
//! - [`MemoryStore`], the in-process reference implementation
//! - Glob and regex key patterns shared by `keys` scans and cascading flushes
//! - A change feed mirroring the store's mutations

pub mod config;
mod contract;
mod events;
mod memory;
pub mod pattern;
mod value;

pub use config::MemoryStoreConfig;
pub use contract::{FieldReply, FieldWrites, Store, StoreError, StoreResult};
pub use events::{StoreChange, StoreChangeOperation};
pub use memory::{MemoryStore, StoreStats};
pub use pattern::KeyPattern;
pub use value::FieldValue;
