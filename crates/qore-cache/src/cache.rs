//! Bounded LRU-with-TTL cache (spec.md §4.4).
//!
//! `get` returns `None` if the entry is expired, deleting it in the same
//! pass. `set` evicts the least-recently-accessed entry if the cache is
//! full. Byte-size accounting is O(1) on every mutation via `lru::LruCache::push`,
//! which hands back whichever entry it displaced (same key or LRU victim) so
//! the running total never needs to re-walk the cache.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;

struct Slot<V> {
    value: V,
    expires_at: DateTime<Utc>,
    size: u64,
}

/// Cumulative hit/miss counters for a named cache, used by the router's
/// periodic metrics emission.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub bytes: i64,
}

/// A size-bounded cache where every entry also carries an absolute expiry.
pub struct TtlLru<K, V> {
    inner: Mutex<LruCache<K, Slot<V>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    bytes: AtomicI64,
}

impl<K, V> TtlLru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).expect("capacity must be nonzero");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            bytes: AtomicI64::new(0),
        }
    }

    /// Look up `key`, promoting it to most-recently-used on a live hit.
    /// A miss never changes any verdict, only its cost.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.get(key) {
            if slot.expires_at > Utc::now() {
                let value = slot.value.clone();
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(value);
            }
            if let Some(slot) = inner.pop(key) {
                self.bytes.fetch_sub(slot.size as i64, Ordering::Relaxed);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace `key`, charging `size` bytes against the running
    /// total and evicting the least-recently-used entry if the cache is full.
    pub fn set_sized(&self, key: K, value: V, size: u64) {
        let mut inner = self.inner.lock();
        let expires_at = Utc::now() + chrono::Duration::from_std(self.ttl).unwrap_or_default();
        if let Some((_, displaced)) = inner.push(key, Slot { value, expires_at, size }) {
            self.bytes.fetch_sub(displaced.size as i64, Ordering::Relaxed);
        }
        self.bytes.fetch_add(size as i64, Ordering::Relaxed);
    }

    pub fn set(&self, key: K, value: V) {
        self.set_sized(key, value, 0);
    }

    /// Snapshot of all currently-live (non-expired) entries.
    pub fn live_entries(&self) -> Vec<(K, V)> {
        let inner = self.inner.lock();
        let now = Utc::now();
        inner
            .iter()
            .filter(|(_, slot)| slot.expires_at > now)
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.inner.lock().len(),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[test]
    fn miss_then_hit() {
        let cache: TtlLru<String, u32> = TtlLru::new(4, StdDuration::from_secs(60));
        assert_eq!(cache.get(&"a".to_string()), None);
        cache.set("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn expired_entry_is_evicted_on_get() {
        let cache: TtlLru<String, u32> = TtlLru::new(4, StdDuration::from_millis(0));
        cache.set("a".to_string(), 1);
        std::thread::sleep(StdDuration::from_millis(5));
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.stats().len, 0);
    }

    #[test]
    fn full_cache_evicts_lru() {
        let cache: TtlLru<i32, i32> = TtlLru::new(2, StdDuration::from_secs(60));
        cache.set(1, 1);
        cache.set(2, 2);
        // Touch 1 so 2 becomes the LRU victim.
        cache.get(&1);
        cache.set(3, 3);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&3), Some(3));
    }

    #[test]
    fn byte_accounting_is_incremental() {
        let cache: TtlLru<i32, i32> = TtlLru::new(2, StdDuration::from_secs(60));
        cache.set_sized(1, 1, 100);
        cache.set_sized(2, 2, 200);
        assert_eq!(cache.stats().bytes, 300);
        // Evicts key 1 (LRU).
        cache.set_sized(3, 3, 50);
        assert_eq!(cache.stats().bytes, 250);
    }
}
