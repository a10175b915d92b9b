//! Create-on-miss cache keyed by identity.
//!
//! # Design
//!
//! - DashMap of slots: sharded, lookups only touch one shard
//! - Slot = `Arc<OnceCell<V>>`: the value is built at most once per key
//! - The shard guard is released before initialisation runs, so `init` may
//!   use the cache itself without deadlocking
//!
//! A failed initialisation removes its slot unless another caller is already
//! waiting on it; that caller then retries `init` in the same slot.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::hash::Hash;
use std::sync::Arc;

/// Identity-keyed cache that constructs each value exactly once.
pub struct IdentityCache<K, V> {
    slots: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> IdentityCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Get the value for `key` if it has been constructed.
    #[inline]
    pub fn get(&self, key: &K) -> Option<V> {
        self.slots
            .get(key)
            .and_then(|slot| slot.value().get().cloned())
    }

    /// Get the value for `key`, constructing it with `init` on a miss.
    ///
    /// Concurrent callers racing on the same key all observe the value built
    /// by a single `init` invocation.
    pub fn get_or_try_insert_with<E, F>(&self, key: &K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let slot = Arc::clone(
            self.slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        match slot.get_or_try_init(init) {
            Ok(value) => Ok(value.clone()),
            Err(err) => {
                // Only the map and this caller hold the slot: nobody can retry it
                self.slots
                    .remove_if(key, |_, s| Arc::ptr_eq(s, &slot) && Arc::strong_count(s) == 2);
                Err(err)
            }
        }
    }

    /// Number of constructed values.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().get().is_some())
            .count()
    }

    /// Check if no value has been constructed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all constructed values.
    pub fn values(&self) -> Vec<V> {
        self.slots
            .iter()
            .filter_map(|slot| slot.value().get().cloned())
            .collect()
    }
}

impl<K, V> Default for IdentityCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for IdentityCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache")
            .field("len", &self.len())
            .finish()
    }
}
