//! Race Cache - fresh-but-fast values from slow producers
//!
//! Races an asynchronous producer against a bounded LRU+TTL cache: callers
//! get the last good value instantly while the producer refreshes the cache
//! in the background.

pub mod cache;
pub mod config;
pub mod error;
pub mod race;
pub mod storage;
pub mod tasks;

pub use cache::Cache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use race::{race_cache, race_cache_with_outcome, OutcomeKind, RaceOptions, RaceOutcome};
pub use storage::{KeyValueStore, MemoryStore};
pub use tasks::spawn_refresh_task;
