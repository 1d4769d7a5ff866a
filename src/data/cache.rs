use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// TtlCache – explicit time-bounded memoization
// ---------------------------------------------------------------------------

/// In-memory cache with a fixed time-to-live per entry.
///
/// This is a memoization convenience, not a correctness mechanism: an
/// expired or missing entry simply means the caller re-fetches. Nothing
/// survives a process restart.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
}

#[derive(Debug)]
struct Entry<V> {
    inserted: Instant,
    value: V,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Return the cached value if present and not expired.
    /// Expired entries are dropped on access.
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                inserted: Instant::now(),
                value,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_returned() {
        let mut cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(3600));
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn expired_entries_are_dropped_on_access() {
        let mut cache: TtlCache<&str, u32> = TtlCache::new(Duration::ZERO);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_replaces_existing_value() {
        let mut cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(3600));
        cache.insert("a", 1);
        cache.insert("a", 2);
        assert_eq!(cache.get(&"a"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
