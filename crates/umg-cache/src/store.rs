use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::ttl::TtlPolicy;

/// One cached response. Replaced wholesale on every `set`, never patched.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    created_at: Instant,
}

/// Cache statistics for observability and tests.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub default_ttl_ms: u64,
    pub category_ttls: Vec<(String, u64)>,
}

/// In-memory TTL response cache shared by all request handlers.
///
/// Expiry is lazy: `get` evicts an over-age entry as a side effect of the
/// read. `cleanup_expired` exists for explicit hygiene sweeps; nothing runs
/// it on a timer here. Per-key mutations ride on the dashmap shard locks,
/// so concurrent handlers never observe a torn entry. Last writer wins for
/// concurrent `set`s on the same key.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    policy: TtlPolicy,
}

impl ResponseCache {
    pub fn new(policy: TtlPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    /// Get a value if present and within its TTL. Expired entries are
    /// removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        let hit = match self.entries.get(key) {
            Some(entry) => {
                let age = entry.created_at.elapsed();
                if age <= self.policy.ttl_for(key) {
                    debug!(key, age_ms = age.as_millis() as u64, "Cache hit");
                    Some(entry.value.clone())
                } else {
                    None
                }
            }
            None => return None,
        };

        if hit.is_none() {
            // Lazy eviction; re-check age under the shard lock so a
            // concurrent `set` is not thrown away.
            self.entries
                .remove_if(key, |k, entry| entry.created_at.elapsed() > self.policy.ttl_for(k));
            debug!(key, "Cache miss (expired)");
        }
        hit
    }

    /// Insert or overwrite with a fresh timestamp.
    pub fn set(&self, key: String, value: Value) {
        debug!(key = %key, "Cache set");
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Remove one entry if present.
    pub fn invalidate(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            debug!(key, "Cache invalidated");
        }
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(count, "Cache cleared");
    }

    /// Proactively remove every entry whose TTL has elapsed.
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, entry| entry.created_at.elapsed() <= self.policy.ttl_for(key));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Cleaned up expired cache entries");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let total_entries = self.entries.len();
        let valid_entries = self
            .entries
            .iter()
            .filter(|entry| entry.created_at.elapsed() <= self.policy.ttl_for(entry.key()))
            .count();

        CacheStats {
            total_entries,
            valid_entries,
            expired_entries: total_entries - valid_entries,
            default_ttl_ms: self.policy.default_ttl().as_millis() as u64,
            category_ttls: self
                .policy
                .categories()
                .iter()
                .map(|(category, ttl)| (category.clone(), ttl.as_millis() as u64))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(TtlPolicy::default())
    }
}
