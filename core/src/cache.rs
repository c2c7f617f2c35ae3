//! Bounded caches for per-user state.
//!
//! RULE: no process-global maps. Anything that remembers per-user state
//! between calls receives a `BoundedCache` from its owner, and every
//! implementation has a hard capacity with a defined eviction policy.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

pub trait BoundedCache<K, V>: Send {
    /// Look up `key`, marking it as recently used.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Insert or replace. Returns the entry evicted to make room, if any.
    fn put(&mut self, key: K, value: V) -> Option<(K, V)>;

    fn remove(&mut self, key: &K) -> Option<V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;
}

/// Least-recently-used eviction once `capacity` entries are held.
pub struct LruBoundedCache<K: Hash + Eq, V> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V> LruBoundedCache<K, V> {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { inner: LruCache::new(capacity) }
    }
}

impl<K, V> BoundedCache<K, V> for LruBoundedCache<K, V>
where
    K: Hash + Eq + Send,
    V: Send,
{
    fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.inner.contains(&key) {
            self.inner.put(key, value);
            return None;
        }
        self.inner.push(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn capacity(&self) -> usize {
        self.inner.cap().get()
    }
}
