//! Cache configuration per query class.
//!
//! TTLs follow how fast each class of server data actually moves:
//! - list pages: short TTL, the registry changes daily but users page through
//!   fresh filter combinations constantly
//! - statistics: medium TTL, recomputed server-side on a schedule
//! - company detail: long TTL, registry records change rarely

use std::time::Duration;

use crate::config::CacheSettings;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default time-to-live for cached entries.
    pub ttl: Duration,
    /// Maximum number of entries (LRU eviction when exceeded).
    pub capacity: usize,
}

impl CacheConfig {
    /// List pages (5 minutes).
    pub fn list_pages() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            capacity: 2000,
        }
    }

    /// Registry statistics (15 minutes).
    pub fn statistics() -> Self {
        Self {
            ttl: Duration::from_secs(900),
            capacity: 200,
        }
    }

    /// Single-company detail (60 minutes).
    pub fn company_detail() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            capacity: 5000,
        }
    }

    /// Custom configuration (ttl in seconds).
    pub fn custom(ttl_secs: u64, capacity: usize) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            capacity,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> DualCacheConfig {
        DualCacheConfig {
            list: Self::custom(settings.list_ttl_secs, settings.capacity),
            stats: Self::custom(settings.stats_ttl_secs, settings.capacity),
            detail: Self::custom(settings.detail_ttl_secs, settings.capacity),
        }
    }
}

/// Per-class configs for the two cache layers.
#[derive(Debug, Clone)]
pub struct DualCacheConfig {
    pub list: CacheConfig,
    pub stats: CacheConfig,
    pub detail: CacheConfig,
}

impl Default for DualCacheConfig {
    fn default() -> Self {
        Self {
            list: CacheConfig::list_pages(),
            stats: CacheConfig::statistics(),
            detail: CacheConfig::company_detail(),
        }
    }
}
