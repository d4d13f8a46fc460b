use std::{
    collections::HashMap,
    hash::Hash,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use parking_lot::RwLock;

use crate::prelude::*;

/// Expiring cache whose entries can also be dropped by tag.
///
/// Every invalidation bumps the generation. A value computed before an invalidation is
/// handed back to the caller but not stored.
pub struct TtlCache<K, V> {
    ttl: Duration,
    generation: AtomicU64,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

struct Entry<V> {
    value: Arc<V>,
    expires_at: Instant,
    tags: &'static [&'static str],
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, generation: AtomicU64::new(0), entries: RwLock::default() }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<Arc<V>> {
        self.entries
            .read()
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    /// Take this before computing a value to be inserted.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Insert or replace the entry, returning the shared value.
    ///
    /// The entry is not stored when anything has been invalidated since `generation`.
    pub fn insert(
        &self,
        key: K,
        value: V,
        tags: &'static [&'static str],
        generation: u64,
    ) -> Arc<V> {
        let value = Arc::new(value);
        let mut entries = self.entries.write();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(generation, "stale value, not cached");
            return value;
        }
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(key, Entry { value: value.clone(), expires_at: now + self.ttl, tags });
        value
    }

    /// Drop every entry carrying the tag.
    pub fn invalidate_tag(&self, tag: &str) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        let n_before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|entry_tag| *entry_tag == tag));
        debug!(tag, n_dropped = n_before - entries.len(), "invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_expire() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.insert("key", 42, &["offers"], cache.generation());
        assert_eq!(cache.get(&"key").as_deref(), Some(&42));
        assert!(cache.get(&"other").is_none());
        assert!(cache.get_at(&"key", Instant::now() + Duration::from_secs(301)).is_none());
    }

    #[test]
    fn test_invalidate_tag() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.insert(1, "ranking", &["offers"], cache.generation());
        cache.insert(2, "prices", &["prices"], cache.generation());
        cache.invalidate_tag("offers");
        assert!(cache.get(&1).is_none());
        assert!(cache.get(&2).is_some());
    }

    #[test]
    fn test_invalidated_while_computing() {
        let cache = TtlCache::new(Duration::from_secs(300));
        let generation = cache.generation();
        cache.invalidate_tag("offers");
        let value = cache.insert("key", 1, &["offers"], generation);
        assert_eq!(*value, 1);
        assert!(cache.get(&"key").is_none());

        cache.insert("key", 2, &["offers"], cache.generation());
        assert_eq!(cache.get(&"key").as_deref(), Some(&2));
    }

    #[test]
    fn test_replace() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.insert("key", 1, &[], cache.generation());
        let shared = cache.insert("key", 2, &[], cache.generation());
        assert_eq!(*shared, 2);
        assert_eq!(cache.get(&"key").as_deref(), Some(&2));
    }
}
