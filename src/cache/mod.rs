//! Cache Module
//!
//! Bounded LRU index with TTL expiry, the storage envelope codec, and the
//! facade binding them to a key-value store.

mod entry;
mod facade;
mod index;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{now_ms, Envelope, IndexEntry};
pub use facade::Cache;
pub use index::{BoundedCacheIndex, IndexSnapshot, RemovalHook};

// == Public Constants ==
/// Default maximum number of keys tracked by the index
pub const DEFAULT_CAPACITY: usize = 99;

/// Default entry TTL in milliseconds (one year)
pub const DEFAULT_TTL_MS: i64 = 365 * 24 * 60 * 60 * 1000;

/// Reserved store key holding the persisted index snapshot.
/// Application keys must never collide with it.
pub const INDEX_STATE_KEY: &str = "__race_cache_index__";
