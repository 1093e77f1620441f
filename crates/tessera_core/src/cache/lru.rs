//! Bounded map with least-recently-used eviction.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// LRU map.
///
/// Every entry carries the tick of its last use; a second index ordered by
/// tick yields the eviction victim in `O(log n)`.
#[derive(Debug)]
pub(crate) struct LruMap<K, V> {
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
    capacity: usize,
    tick: u64,
}

impl<K: Hash + Eq + Clone, V> LruMap<K, V> {
    /// Creates an empty map. A capacity of 0 is treated as 1.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            capacity: capacity.max(1),
            tick: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the entry without changing its recency.
    pub(crate) fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(value, _)| value)
    }

    /// Returns the entry and marks it most recently used.
    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.next_tick();
        let (value, used) = self.entries.get_mut(key)?;
        self.order.remove(used);
        *used = tick;
        self.order.insert(tick, key.clone());
        Some(value)
    }

    /// Inserts or replaces an entry, marking it most recently used.
    ///
    /// Returns the entry evicted to make room, if any.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let tick = self.next_tick();
        if let Some((old, used)) = self.entries.get_mut(&key) {
            *old = value;
            self.order.remove(used);
            *used = tick;
            self.order.insert(tick, key);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.pop_oldest()
        } else {
            None
        };
        self.order.insert(tick, key.clone());
        self.entries.insert(key, (value, tick));
        evicted
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let (value, used) = self.entries.remove(key)?;
        self.order.remove(&used);
        Some(value)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Iterates entries from least to most recently used.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .values()
            .filter_map(|key| self.entries.get(key).map(|(value, _)| (key, value)))
    }

    fn pop_oldest(&mut self) -> Option<(K, V)> {
        let (_, key) = self.order.pop_first()?;
        let (value, _) = self.entries.remove(&key)?;
        Some((key, value))
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut map = LruMap::new(2);
        assert!(map.insert(1, "a").is_none());
        assert!(map.insert(2, "b").is_none());
        assert_eq!(map.get(&1), Some(&"a"));
        assert_eq!(map.insert(3, "c"), Some((2, "b")));
        assert!(map.contains(&1));
        assert!(map.contains(&3));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn replace_touches_entry() {
        let mut map = LruMap::new(2);
        map.insert(1, "a");
        map.insert(2, "b");
        assert!(map.insert(1, "A").is_none());
        assert_eq!(map.insert(3, "c"), Some((2, "b")));
        assert_eq!(map.peek(&1), Some(&"A"));
    }

    #[test]
    fn peek_does_not_touch() {
        let mut map = LruMap::new(2);
        map.insert(1, "a");
        map.insert(2, "b");
        assert_eq!(map.peek(&1), Some(&"a"));
        assert_eq!(map.insert(3, "c"), Some((1, "a")));
    }

    #[test]
    fn remove_and_clear() {
        let mut map = LruMap::new(0);
        map.insert(1, "a");
        assert_eq!(map.remove(&1), Some("a"));
        assert!(map.remove(&1).is_none());
        map.insert(2, "b");
        map.clear();
        assert_eq!(map.len(), 0);
        assert_eq!(map.iter().count(), 0);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(capacity in 1usize..8, keys in prop::collection::vec(0u8..16, 0..64)) {
            let mut map = LruMap::new(capacity);
            for key in keys {
                map.insert(key, ());
                prop_assert!(map.len() <= capacity);
                prop_assert_eq!(map.iter().count(), map.len());
            }
        }
    }
}
