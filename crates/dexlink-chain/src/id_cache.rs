use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Map with a fixed capacity that evicts in insertion order.
///
/// Re-inserting an existing key updates its value but keeps its original
/// position in the eviction queue.
#[derive(Debug, Clone)]
pub struct BoundedInsertionMap<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K, V> BoundedInsertionMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert a value, returning the entry evicted to make room, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.order
                .pop_front()
                .and_then(|old| self.entries.remove(&old).map(|v| (old, v)))
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        evicted
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
