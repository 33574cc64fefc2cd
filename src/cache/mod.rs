//! Generic in-memory cache with TTL and LRU eviction.
//!
//! Expiry is lazy: an expired entry is treated as absent on the next read and
//! removed then, never swept proactively. Entries may carry a per-entry TTL
//! overriding the cache default, which lets one table hold query classes with
//! different staleness policies.

pub mod config;
pub mod coordinator;

pub use config::{CacheConfig, DualCacheConfig};
pub use coordinator::{EntityKind, QueryCache, RequestKey};

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Cache metrics for monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub inserts: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    // LRU order, least recently used at the front.
    order: VecDeque<K>,
    metrics: CacheMetrics,
}

enum Lookup<V> {
    Hit(V),
    Expired,
    Miss,
}

pub struct TtlCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    config: CacheConfig,
    inner: RwLock<Inner<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// Get a value; `None` if missing or expired (expired entries are removed here).
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.write();

        let lookup = match inner.entries.get(key) {
            None => Lookup::Miss,
            Some(entry) if entry.is_expired() => Lookup::Expired,
            Some(entry) => Lookup::Hit(entry.value.clone()),
        };

        match lookup {
            Lookup::Miss => {
                inner.metrics.misses += 1;
                None
            }
            Lookup::Expired => {
                inner.entries.remove(key);
                inner.order.retain(|k| k != key);
                inner.metrics.misses += 1;
                inner.metrics.expirations += 1;
                None
            }
            Lookup::Hit(value) => {
                inner.order.retain(|k| k != key);
                inner.order.push_back(key.clone());
                inner.metrics.hits += 1;
                Some(value)
            }
        }
    }

    /// Insert with the cache-default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.config.ttl);
    }

    /// Insert with an explicit TTL, evicting the LRU entry at capacity.
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut inner = self.inner.write();

        if inner.entries.len() >= self.config.capacity && !inner.entries.contains_key(&key) {
            if let Some(lru) = inner.order.pop_front() {
                inner.entries.remove(&lru);
                inner.metrics.evictions += 1;
            }
        }

        inner.entries.insert(key.clone(), Entry::new(value, ttl));
        inner.order.retain(|k| k != &key);
        inner.order.push_back(key);
        inner.metrics.inserts += 1;
    }

    pub fn remove(&self, key: &K) {
        let mut inner = self.inner.write();
        inner.entries.remove(key);
        inner.order.retain(|k| k != key);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.read().metrics.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
