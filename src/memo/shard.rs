//! A sharded concurrent map with atomic get-or-insert.
//!
//! Keys hash to one of a power-of-two number of shards, each a cache-padded
//! `RwLock<HashMap>`. Lookups take the shard read lock; insertion takes the
//! write lock and goes through the entry API, so racing inserters of one key
//! always converge on the first value stored.

use std::collections::hash_map::{Entry, RandomState};
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_utils::CachePadded;

type Shard<K, V, S> = CachePadded<RwLock<HashMap<K, V, S>>>;

pub(crate) struct ShardedMap<K, V, S = RandomState> {
    shards: Box<[Shard<K, V, S>]>,
    hasher: S,
}

impl<K, V> ShardedMap<K, V> {
    pub(crate) fn new(shards: usize) -> Self {
        Self::with_hasher(shards, RandomState::new())
    }
}

impl<K, V, S: Clone> ShardedMap<K, V, S> {
    pub(crate) fn with_hasher(shards: usize, hasher: S) -> Self {
        debug_assert!(shards.is_power_of_two());
        let shards = (0..shards)
            .map(|_| CachePadded::new(RwLock::new(HashMap::with_hasher(hasher.clone()))))
            .collect();
        Self { shards, hasher }
    }
}

impl<K, V, S> ShardedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn shard(&self, key: &K) -> &RwLock<HashMap<K, V, S>> {
        let hash = self.hasher.hash_one(key);
        // High bits: the shard maps consume the low ones.
        let index = (hash >> 32) as usize & (self.shards.len() - 1);
        &self.shards[index]
    }

    /// Returns a clone of the value stored for `key`.
    pub(crate) fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        read(self.shard(key)).get(key).cloned()
    }

    /// Returns the value stored for `key`, inserting `make(key)` first if
    /// there is none. `make` runs at most once per key across all threads.
    /// The flag is `true` if this call inserted.
    pub(crate) fn get_or_insert_with<F>(&self, key: &K, make: F) -> (V, bool)
    where
        K: Clone,
        V: Clone,
        F: FnOnce(&K) -> V,
    {
        let shard = self.shard(key);
        if let Some(value) = read(shard).get(key) {
            return (value.clone(), false);
        }
        match write(shard).entry(key.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let value = make(entry.key());
                (entry.insert(value).clone(), true)
            }
        }
    }

    /// Number of entries across all shards.
    pub(crate) fn len(&self) -> usize {
        self.shards.iter().map(|shard| read(&**shard).len()).sum()
    }

    /// Visits every value, one shard at a time.
    pub(crate) fn for_each_value(&self, mut f: impl FnMut(&V)) {
        for shard in self.shards.iter() {
            read(&**shard).values().for_each(&mut f);
        }
    }
}

// Values are inserted fully built, so a poisoned shard is still consistent.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
