//! Property-Based Tests for the Cache Module
//!
//! Uses proptest to verify the index invariants: capacity is never exceeded,
//! recency ordering drives eviction, keys are unique in the recency list, and
//! snapshots restore identical state.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::cache::{BoundedCacheIndex, Cache, IndexSnapshot};
use crate::storage::MemoryStore;

// == Test Configuration ==
const TEST_TTL_MS: i64 = 600_000;

// == Strategies ==
/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}"
}

/// Generates a sequence of index operations for testing
#[derive(Debug, Clone)]
enum IndexOp {
    Set { key: String },
    Get { key: String },
    Unset { key: String },
}

fn index_op_strategy() -> impl Strategy<Value = IndexOp> {
    prop_oneof![
        key_strategy().prop_map(|key| IndexOp::Set { key }),
        key_strategy().prop_map(|key| IndexOp::Get { key }),
        key_strategy().prop_map(|key| IndexOp::Unset { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For all capacities and sequences of set calls, the recency list never
    // holds more keys than capacity immediately after a set completes.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..20,
        keys in prop::collection::vec(key_strategy(), 1..100)
    ) {
        let mut index = BoundedCacheIndex::new(capacity);

        for key in keys {
            index.set(&key, TEST_TTL_MS);
            prop_assert!(
                index.size() <= capacity,
                "Index size {} exceeds capacity {}",
                index.size(),
                capacity
            );
        }
    }

    // A key appears at most once in the recency list, whatever the sequence
    // of operations.
    #[test]
    fn prop_keys_unique_in_order(ops in prop::collection::vec(index_op_strategy(), 1..100)) {
        let mut index = BoundedCacheIndex::new(10);

        for op in ops {
            match op {
                IndexOp::Set { key } => index.set(&key, TEST_TTL_MS),
                IndexOp::Get { key } => { index.get(&key); }
                IndexOp::Unset { key } => index.unset(&key),
            }

            let keys = index.keys();
            let unique: HashSet<&String> = keys.iter().collect();
            prop_assert_eq!(unique.len(), keys.len(), "Duplicate key in recency list");
        }
    }

    // Promoting a key via get protects it from the next capacity eviction.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(key_strategy(), 3..8),
        new_key in key_strategy()
    ) {
        // Deduplicate keys to ensure unique entries
        let unique_keys: Vec<String> = keys
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let mut index = BoundedCacheIndex::new(capacity);

        for key in &unique_keys {
            index.set(key, TEST_TTL_MS);
        }

        // The first-inserted key would be evicted next; touch it
        let accessed = unique_keys[0].clone();
        index.get(&accessed);

        // The second-inserted key is now the eviction candidate
        let expected_victim = unique_keys[1].clone();

        index.set(&new_key, TEST_TTL_MS);

        prop_assert!(
            index.get(&accessed).is_some(),
            "Accessed key '{}' should not be evicted after being touched",
            accessed
        );
        prop_assert!(
            index.get(&expected_victim).is_none(),
            "Key '{}' should have been evicted as least recently used",
            expected_victim
        );
        prop_assert!(index.get(&new_key).is_some(), "New key should exist");
    }

    // The removal hook fires exactly once per evicted key under capacity
    // pressure.
    #[test]
    fn prop_removal_hook_once_per_key(
        capacity in 1usize..10,
        keys in prop::collection::vec(key_strategy(), 1..60)
    ) {
        let removed = Arc::new(Mutex::new(Vec::<String>::new()));
        let mut index = BoundedCacheIndex::new(capacity);
        let sink = Arc::clone(&removed);
        index.set_removal_hook(Arc::new(move |key: &str| {
            sink.lock().unwrap().push(key.to_string());
        }));

        let unique_sets: HashSet<String> = keys.iter().cloned().collect();
        for key in &keys {
            index.set(key, TEST_TTL_MS);
        }

        // Every key is either still tracked or was reported exactly once
        // since its last insertion; with no re-insertion after removal, total
        // removals == inserted uniques - survivors
        let survivors: HashSet<String> = index.keys().into_iter().collect();
        let removed = removed.lock().unwrap();
        let removed_set: HashSet<String> = removed.iter().cloned().collect();

        for key in &unique_sets {
            prop_assert!(
                survivors.contains(key) || removed_set.contains(key),
                "Key '{}' vanished without a removal callback",
                key
            );
        }
        for key in &survivors {
            prop_assert!(unique_sets.contains(key));
        }
    }

    // Restoring from a snapshot reconstructs identical ordering.
    #[test]
    fn prop_snapshot_roundtrip(keys in prop::collection::vec(key_strategy(), 1..30)) {
        let mut index = BoundedCacheIndex::new(50);
        for key in &keys {
            index.set(key, TEST_TTL_MS);
        }

        let json = serde_json::to_string(&index.snapshot()).unwrap();
        let snapshot: IndexSnapshot = serde_json::from_str(&json).unwrap();
        let restored = BoundedCacheIndex::from_snapshot(snapshot);

        prop_assert_eq!(restored.keys(), index.keys(), "Snapshot order mismatch");
        prop_assert_eq!(restored.size(), index.size());
    }
}

// Facade-level property: values written within capacity read back intact.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn prop_facade_roundtrip(entries in prop::collection::vec((key_strategy(), any::<u32>()), 1..20)) {
        // Last write wins per key
        let mut expected = std::collections::HashMap::new();
        for (key, value) in &entries {
            expected.insert(key.clone(), *value);
        }

        tokio_test::block_on(async {
            let cache = Cache::new(MemoryStore::shared(), 50);

            for (key, value) in &entries {
                cache.set(key, value, TEST_TTL_MS).await.unwrap();
            }

            for (key, value) in &expected {
                let got = cache.get::<u32>(key).await;
                prop_assert_eq!(got, Some(*value), "Round-trip mismatch for key '{}'", key);
            }

            Ok(())
        })?;
    }
}
