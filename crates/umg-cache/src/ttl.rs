use std::time::Duration;

use umg_models::config::CacheConfig;

/// Per-category TTL resolution.
///
/// Cache keys embed the provider tool name (`binance.get_ticker:BTCUSDT`),
/// so a substring table keyed on category names ("ticker", "orderbook", ...)
/// discriminates freshness windows without explicit type tags. The table is
/// ordered; the first matching substring wins.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    default: Duration,
    categories: Vec<(String, Duration)>,
}

impl TtlPolicy {
    pub fn new(default: Duration, categories: Vec<(String, Duration)>) -> Self {
        Self {
            default,
            categories,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            default: Duration::from_millis(config.default_ttl_ms),
            categories: config
                .category_ttls
                .iter()
                .map(|c| (c.category.clone(), Duration::from_millis(c.ttl_ms)))
                .collect(),
        }
    }

    /// Resolve the TTL for a cache key.
    pub fn ttl_for(&self, key: &str) -> Duration {
        self.categories
            .iter()
            .find(|(category, _)| key.contains(category.as_str()))
            .map(|(_, ttl)| *ttl)
            .unwrap_or(self.default)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default
    }

    pub fn categories(&self) -> &[(String, Duration)] {
        &self.categories
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
