//! Dual-layer cache coordinator.
//!
//! Layer A (`entities`) is a normalized cache keyed by entity kind + id and
//! serves detail views. Layer B (`requests`) is a flat request-keyed cache
//! holding opaque response payloads for list pages and statistics. Both mirror
//! the same server truth, so they are only ever invalidated together: any
//! successful write-class operation (profile or plan change; exports do not
//! count) must go through `invalidate_all`. There is deliberately no public
//! way to clear one layer alone.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::logger::{self, LogTag};

use super::config::DualCacheConfig;
use super::TtlCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Company,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Company => "company",
        }
    }
}

/// Layer B key: operation name plus canonically serialized variables.
/// `serde_json` maps keep sorted key order, so equal variable sets always
/// produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub operation: String,
    pub variables: String,
}

impl RequestKey {
    pub fn new(operation: &str, variables: &Value) -> Self {
        Self {
            operation: operation.to_string(),
            variables: variables.to_string(),
        }
    }
}

pub struct QueryCache {
    entities: TtlCache<(EntityKind, String), Value>,
    requests: TtlCache<RequestKey, Value>,
    stats_ttl: Duration,
}

impl QueryCache {
    pub fn new(config: DualCacheConfig) -> Self {
        let stats_ttl = config.stats.ttl;
        Self {
            entities: TtlCache::new(config.detail),
            requests: TtlCache::new(config.list),
            stats_ttl,
        }
    }

    // ---- layer A: normalized entities -------------------------------------

    pub fn get_entity<T: DeserializeOwned>(&self, kind: EntityKind, id: &str) -> Option<T> {
        let value = self.entities.get(&(kind, id.to_string()))?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                // A shape mismatch means the cached copy predates a model
                // change; treat as a miss.
                logger::warning(
                    LogTag::Cache,
                    &format!("dropping undecodable {} entity {}: {}", kind.as_str(), id, err),
                );
                self.entities.remove(&(kind, id.to_string()));
                None
            }
        }
    }

    pub fn put_entity<T: Serialize>(&self, kind: EntityKind, id: &str, entity: &T) {
        if let Ok(value) = serde_json::to_value(entity) {
            self.entities.insert((kind, id.to_string()), value);
        }
    }

    // ---- layer B: request-keyed responses ---------------------------------

    pub fn get_request<T: DeserializeOwned>(&self, key: &RequestKey) -> Option<T> {
        let value = self.requests.get(key)?;
        serde_json::from_value(value).ok()
    }

    /// Cache a list page under the list TTL.
    pub fn put_list_page<T: Serialize>(&self, key: RequestKey, response: &T) {
        if let Ok(value) = serde_json::to_value(response) {
            self.requests.insert(key, value);
        }
    }

    /// Cache a statistics response under the statistics TTL.
    pub fn put_stats<T: Serialize>(&self, key: RequestKey, response: &T) {
        if let Ok(value) = serde_json::to_value(response) {
            self.requests.insert_with_ttl(key, value, self.stats_ttl);
        }
    }

    // ---- invalidation -----------------------------------------------------

    /// Invalidate one entity and every request-keyed response, since any list
    /// page or statistic may embed it. Both layers move together.
    pub fn invalidate_entity(&self, kind: EntityKind, id: &str) {
        self.entities.remove(&(kind, id.to_string()));
        self.requests.clear();
        logger::debug(
            LogTag::Cache,
            &format!("invalidated {} {} and all request entries", kind.as_str(), id),
        );
    }

    /// Joint invalidation after a write-class operation.
    pub fn invalidate_all(&self) {
        self.entities.clear();
        self.requests.clear();
        logger::info(LogTag::Cache, "both cache layers invalidated");
    }

    pub fn log_metrics(&self) {
        let entities = self.entities.metrics();
        let requests = self.requests.metrics();
        logger::debug(
            LogTag::Cache,
            &format!(
                "entity layer hit rate {:.0}%, request layer hit rate {:.0}%",
                entities.hit_rate() * 100.0,
                requests.hit_rate() * 100.0
            ),
        );
    }
}
