//! Cache Facade Module
//!
//! Binds one bounded cache index to one key-value store and keeps them
//! convergent: every value mutation is mirrored into the index, index
//! evictions delete the backing value, and the index's own state is persisted
//! under a reserved key so a later process can resume where this one left
//! off.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::entry::Envelope;
use crate::cache::index::{BoundedCacheIndex, IndexSnapshot};
use crate::cache::INDEX_STATE_KEY;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::storage::KeyValueStore;

// == Cache ==
/// Public cache surface over a key-value store.
///
/// Cloning is cheap; clones share the same store and index. A read never
/// waits on index bookkeeping: recency touches, snapshot persistence and
/// stale-value deletion are all fire-and-forget.
///
/// All methods, including the synchronous ones, must run inside a Tokio
/// runtime since bookkeeping is spawned.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
    index: Arc<Mutex<BoundedCacheIndex>>,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache with a fresh index of the given capacity.
    pub fn new(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self::assemble(store, BoundedCacheIndex::new(capacity))
    }

    // == Open ==
    /// Creates a cache, rehydrating the index from the snapshot persisted
    /// under the reserved key if one exists.
    ///
    /// A missing or unparseable snapshot falls back to a fresh index at
    /// `capacity`; a rehydrated snapshot keeps the capacity it was saved
    /// with.
    pub async fn open(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let index = match store.get(INDEX_STATE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<IndexSnapshot>(&raw) {
                Ok(snapshot) => BoundedCacheIndex::from_snapshot(snapshot),
                Err(err) => {
                    warn!(error = %err, "discarding unparseable index snapshot");
                    BoundedCacheIndex::new(capacity)
                }
            },
            Ok(None) => BoundedCacheIndex::new(capacity),
            Err(err) => {
                warn!(error = %err, "could not load index snapshot, starting fresh");
                BoundedCacheIndex::new(capacity)
            }
        };

        Self::assemble(store, index)
    }

    /// Opens a cache sized from the process configuration.
    pub async fn from_config(store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        Self::open(store, config.capacity).await
    }

    /// Wires the removal hook: an eviction in the index is the sole path
    /// that deletes stale values from the underlying store.
    fn assemble(store: Arc<dyn KeyValueStore>, mut index: BoundedCacheIndex) -> Self {
        let hook_store = Arc::clone(&store);
        index.set_removal_hook(Arc::new(move |key: &str| {
            let store = Arc::clone(&hook_store);
            let key = key.to_string();
            tokio::spawn(async move {
                if let Err(err) = store.unset(&key).await {
                    debug!(key = %key, error = %err, "evicted key could not be removed from store");
                }
            });
        }));

        Self {
            store,
            index: Arc::new(Mutex::new(index)),
        }
    }

    // == Get ==
    /// Reads a value, treating missing, expired and corrupt envelopes as
    /// absent.
    ///
    /// A store read failure is logged and conflated with a miss. On a miss
    /// the stale value is deleted best-effort; on any read the index recency
    /// is touched and its snapshot re-persisted, without the caller waiting
    /// on either.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %key, error = %err, "store read failed, treating as miss");
                None
            }
        };

        let value = raw.as_deref().and_then(Envelope::<T>::open);

        if value.is_none() {
            let store = Arc::clone(&self.store);
            let stale = key.to_string();
            tokio::spawn(async move {
                let _ = store.unset(&stale).await;
            });
        }

        self.lock_index().get(key);
        self.spawn_persist();

        value
    }

    // == Set ==
    /// Writes a value with the given TTL.
    ///
    /// Returns once the store write acknowledges; mirroring into the index
    /// and snapshot persistence are not awaited by the caller.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_ms: i64) -> Result<()> {
        let raw = Envelope::seal(value, ttl_ms)?;
        self.store
            .set(key, &raw)
            .await
            .map_err(CacheError::Store)?;

        self.lock_index().set(key, ttl_ms);
        self.spawn_persist();
        Ok(())
    }

    // == Unset ==
    /// Removes a key from the store and the index.
    pub async fn unset(&self, key: &str) -> Result<()> {
        self.store.unset(key).await.map_err(CacheError::Store)?;

        self.lock_index().unset(key);
        self.spawn_persist();
        Ok(())
    }

    // == Clear ==
    /// Empties the store and the index, then persists the empty snapshot.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await.map_err(CacheError::Store)?;

        self.lock_index().clear();
        self.spawn_persist();
        Ok(())
    }

    // == Set Capacity ==
    /// Changes the index capacity, evicting least-recently-used keys if
    /// shrinking below the current size.
    pub fn set_capacity(&self, capacity: usize) {
        self.lock_index().set_capacity(capacity);
        self.spawn_persist();
    }

    // == Size ==
    /// Number of keys the index currently tracks.
    ///
    /// This reflects the admission-control structure, not the store's item
    /// count, and may include entries awaiting a lazy prune.
    pub fn size(&self) -> usize {
        self.lock_index().size()
    }

    // == Refresh ==
    /// Forces a full prune pass over the index and re-persists it.
    pub fn refresh(&self) {
        self.lock_index().refresh();
        self.spawn_persist();
    }

    fn lock_index(&self) -> std::sync::MutexGuard<'_, BoundedCacheIndex> {
        // Mutations are synchronous and never held across an await, so the
        // lock can only be poisoned by a panic mid-mutation.
        self.index.lock().expect("cache index lock poisoned")
    }

    /// Persists the index snapshot under the reserved key, fire-and-forget.
    fn spawn_persist(&self) {
        let snapshot = self.lock_index().snapshot();
        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "index snapshot could not be encoded");
                return;
            }
        };

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(err) = store.set(INDEX_STATE_KEY, &json).await {
                warn!(error = %err, "index snapshot could not be persisted");
            }
        });
    }
}
