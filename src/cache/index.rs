//! Bounded Cache Index Module
//!
//! LRU recency tracking with per-entry expiry and lazy pruning. The index
//! decides which keys survive capacity pressure; actual values live in the
//! key-value store and are deleted through the removal hook.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::entry::{now_ms, IndexEntry};
use crate::cache::DEFAULT_CAPACITY;

/// Callback invoked once per key removed from the index, whatever the reason
/// (expiry, capacity eviction, explicit unset or clear).
pub type RemovalHook = Arc<dyn Fn(&str) + Send + Sync>;

// == Index Snapshot ==
/// Serializable state of the index, persisted so a later process can resume
/// with the same recency and expiry bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Maximum number of tracked keys
    pub capacity: usize,
    /// Recency order, most-recently-used first
    pub list: Vec<String>,
    /// Per-key expiry records
    pub cache: HashMap<String, IndexEntry>,
}

// == Bounded Cache Index ==
/// Capacity-limited key index with LRU ordering and lazy expiry sweeps.
///
/// Keys are stored in a `VecDeque` where:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Every traversal rebuilds the recency list, dropping keys that have expired
/// or lost their map entry, so bookkeeping stays convergent without a
/// background sweep.
pub struct BoundedCacheIndex {
    /// Maximum number of tracked keys
    capacity: usize,
    /// Key to expiry record
    entries: HashMap<String, IndexEntry>,
    /// Recency order of keys
    order: VecDeque<String>,
    /// Fired once per removed key
    on_remove: Option<RemovalHook>,
}

impl std::fmt::Debug for BoundedCacheIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCacheIndex")
            .field("capacity", &self.capacity)
            .field("order", &self.order)
            .finish()
    }
}

impl Default for BoundedCacheIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BoundedCacheIndex {
    // == Constructor ==
    /// Creates an empty index holding at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
            on_remove: None,
        }
    }

    /// Restores an index from a previously persisted snapshot.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        Self {
            capacity: snapshot.capacity,
            entries: snapshot.cache,
            order: snapshot.list.into(),
            on_remove: None,
        }
    }

    /// Installs the removal callback.
    pub fn set_removal_hook(&mut self, hook: RemovalHook) {
        self.on_remove = Some(hook);
    }

    fn trigger_remove(&self, key: &str) {
        if let Some(hook) = &self.on_remove {
            hook(key);
        }
    }

    // == Get ==
    /// Returns the entry if present and unexpired, promoting the key to
    /// most-recently-used.
    ///
    /// An expired entry is treated as absent and removed through the normal
    /// prune machinery. On a hit, every other key encountered while the
    /// recency list is rebuilt is checked too, and stale ones are pruned with
    /// the removal hook firing once each.
    pub fn get(&mut self, key: &str) -> Option<IndexEntry> {
        let entry = *self.entries.get(key)?;

        let now = now_ms();
        if entry.is_expired_at(now) {
            self.unset(key);
            return None;
        }

        let mut fresh = VecDeque::with_capacity(self.order.len());
        fresh.push_back(key.to_string());

        let old_order = std::mem::take(&mut self.order);
        for k in old_order {
            if k == key {
                continue;
            }
            let live = self.entries.get(&k).map_or(false, |e| !e.is_expired_at(now));
            if live {
                fresh.push_back(k);
            } else {
                self.entries.remove(&k);
                self.trigger_remove(&k);
            }
        }
        self.order = fresh;

        Some(entry)
    }

    // == Set ==
    /// Inserts or refreshes a key with a new TTL, promoting it to the front.
    ///
    /// The remaining keys are then walked in recency order: expired ones are
    /// pruned without counting toward capacity, and once the surviving count
    /// reaches capacity every further key is evicted regardless of its own
    /// expiry. The cutoff applies among still-valid entries only.
    pub fn set(&mut self, key: &str, ttl_ms: i64) {
        let now = now_ms();
        self.entries.insert(
            key.to_string(),
            IndexEntry {
                expires_at: now + ttl_ms,
            },
        );

        let mut survivors = 1usize;
        let mut fresh = VecDeque::with_capacity(self.order.len() + 1);
        fresh.push_back(key.to_string());

        let old_order = std::mem::take(&mut self.order);
        for k in old_order {
            if k == key {
                continue;
            }

            if survivors >= self.capacity {
                self.entries.remove(&k);
                self.trigger_remove(&k);
                continue;
            }

            let live = self.entries.get(&k).map_or(false, |e| !e.is_expired_at(now));
            if live {
                fresh.push_back(k);
                survivors += 1;
            } else {
                self.entries.remove(&k);
                self.trigger_remove(&k);
            }
        }
        self.order = fresh;
    }

    // == Unset ==
    /// Marks a key as virtually expired and forces a prune pass.
    ///
    /// Removal always goes through the eviction machinery so the hook fires
    /// exactly the same way as for expiry; there is no immediate-delete path.
    pub fn unset(&mut self, key: &str) {
        let present = match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = 0;
                true
            }
            None => false,
        };
        if present {
            self.refresh();
        }
    }

    // == Clear ==
    /// Fires the removal hook for every tracked key, then empties the index.
    ///
    /// No expiry re-check: keys already individually expired but not yet
    /// pruned still get their callback.
    pub fn clear(&mut self) {
        let old_order = std::mem::take(&mut self.order);
        for key in &old_order {
            self.trigger_remove(key);
        }
        self.entries.clear();
    }

    // == Set Capacity ==
    /// Changes the capacity, evicting from the least-recently-used end until
    /// the index fits. Growing evicts nothing.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;

        while self.order.len() > capacity {
            if let Some(key) = self.order.pop_back() {
                self.entries.remove(&key);
                self.trigger_remove(&key);
            }
        }
    }

    // == Size ==
    /// Current length of the recency list.
    ///
    /// This counts entries not yet lazily pruned, so it can exceed the number
    /// of live keys until the next traversal touches them.
    pub fn size(&self) -> usize {
        self.order.len()
    }

    // == Refresh ==
    /// Full prune pass with no other mutation: drops every expired or
    /// map-less key from the recency list, firing the hook per key.
    pub fn refresh(&mut self) {
        if self.order.is_empty() {
            return;
        }

        let now = now_ms();
        let mut fresh = VecDeque::with_capacity(self.order.len());

        let old_order = std::mem::take(&mut self.order);
        for k in old_order {
            let live = self.entries.get(&k).map_or(false, |e| !e.is_expired_at(now));
            if live {
                fresh.push_back(k);
            } else {
                self.entries.remove(&k);
                self.trigger_remove(&k);
            }
        }
        self.order = fresh;
    }

    // == Snapshot ==
    /// Serializable copy of the current state.
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            capacity: self.capacity,
            list: self.order.iter().cloned().collect(),
            cache: self.entries.clone(),
        }
    }

    /// Recency order, most-recently-used first. Test and debug aid.
    #[allow(dead_code)]
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }
}
