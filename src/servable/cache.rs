//! Least-recently-used cache with a soft size buffer.
//!
//! The cache may grow to `capacity + buffer` entries. One insert past that
//! evicts least-recently-used entries until `capacity` remain, so evictions
//! happen in batches instead of on every insert. A capacity of zero disables
//! eviction entirely.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

pub struct LruCache<K, V> {
    capacity: usize,
    buffer: usize,
    entries: HashMap<K, (V, u64)>,
    /// Recency tick -> key, oldest first.
    order: BTreeMap<u64, K>,
    tick: u64,
}

impl<K: Clone + Eq + Hash, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize, buffer: usize) -> Self {
        Self {
            capacity,
            buffer,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let (value, last) = self.entries.get_mut(key)?;
        self.tick += 1;
        self.order.remove(&*last);
        *last = self.tick;
        self.order.insert(self.tick, key.clone());
        Some(value.clone())
    }

    /// Insert or replace `key`, then prune if the buffer is exhausted.
    pub fn insert(&mut self, key: K, value: V) {
        let tick = self.next_tick();
        if let Some((_, last)) = self.entries.insert(key.clone(), (value, tick)) {
            self.order.remove(&last);
        }
        self.order.insert(tick, key);
        self.prune();
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (value, tick) = self.entries.remove(key)?;
        self.order.remove(&tick);
        Some(value)
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }

    fn prune(&mut self) {
        if self.capacity == 0 || self.entries.len() <= self.capacity + self.buffer {
            return;
        }
        while self.entries.len() > self.capacity {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&key);
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
