//! Storage Module
//!
//! The key-value store contract the cache persists through, plus the
//! in-memory implementation used by default and in tests.
//!
//! The store is deliberately minimal: per-key last-write-wins, no ordering or
//! atomicity guarantees. Anything exposing this surface (an on-disk store, a
//! remote service) can back the cache.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

// == Key-Value Store Contract ==
/// Asynchronous string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Stores a value under the key, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removes the key. Removing an absent key is not an error.
    async fn unset(&self, key: &str) -> anyhow::Result<()>;

    /// Removes every key.
    async fn clear(&self) -> anyhow::Result<()>;
}

// == Memory Store ==
/// `HashMap`-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor returning the trait-object form the cache
    /// consumes.
    pub fn shared() -> Arc<dyn KeyValueStore> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.data
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn unset(&self, key: &str) -> anyhow::Result<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.data.write().await.clear();
        Ok(())
    }
}
