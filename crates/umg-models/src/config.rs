use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration for UMG.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct UmgConfig {
    pub providers: Vec<ProviderConfig>,
    pub venues: VenueConfig,
    pub cache: CacheConfig,
    pub gateway: GatewayConfig,
}

impl UmgConfig {
    /// Enabled providers only, in config order.
    pub fn enabled_providers(&self) -> Vec<&ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled).collect()
    }
}

/// Configuration for a single upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Internal provider identifier (also the provider tool-name prefix).
    pub name: String,
    /// Provider base address, e.g. "http://localhost:50051".
    pub address: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider-specific rate limit. Falls back to `GatewayConfig::default_rate_limit`.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

/// Rate limit parameters for a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst_size: 20,
        }
    }
}

/// Public venue names and their backing provider identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VenueConfig {
    /// Venue applied when a tool invocation omits the `venue` argument.
    pub default_venue: String,
    /// Public venue name -> internal provider identifier. Only names listed
    /// here are accepted from clients.
    pub venue_providers: BTreeMap<String, String>,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            default_venue: "binance".to_string(),
            venue_providers: BTreeMap::from([("binance".to_string(), "binance".to_string())]),
        }
    }
}

/// Configuration for the response cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// TTL applied when no category override matches.
    pub default_ttl_ms: u64,
    /// Ordered (key substring, TTL ms) overrides. First match wins, so more
    /// specific substrings belong earlier.
    pub category_ttls: Vec<CategoryTtl>,
}

/// One per-category TTL override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTtl {
    pub category: String,
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_ms: 5_000,
            category_ttls: vec![
                CategoryTtl {
                    category: "exchange_info".to_string(),
                    ttl_ms: 300_000,
                },
                CategoryTtl {
                    category: "orderbook".to_string(),
                    ttl_ms: 500,
                },
                CategoryTtl {
                    category: "ticker".to_string(),
                    ttl_ms: 1_000,
                },
                CategoryTtl {
                    category: "klines".to_string(),
                    ttl_ms: 30_000,
                },
                CategoryTtl {
                    category: "trades".to_string(),
                    ttl_ms: 2_000,
                },
            ],
        }
    }
}

/// Gateway-level behavior: tool exposure, timeouts, health checking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Only expose unified tools (market.*, trade.*) to clients.
    pub expose_unified_only: bool,
    /// Provider tool patterns exposed even when `expose_unified_only` is set.
    /// A trailing `*` matches any suffix, e.g. "binance.get_*".
    pub expose_provider_tools: Vec<String>,
    pub health_check_interval_secs: u64,
    /// Timeout for latency-sensitive market data reads.
    pub default_timeout_ms: u64,
    /// Timeout for heavier analytics operations.
    pub analytics_timeout_ms: u64,
    pub default_rate_limit: RateLimitConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            expose_unified_only: true,
            expose_provider_tools: Vec::new(),
            health_check_interval_secs: 30,
            default_timeout_ms: 5_000,
            analytics_timeout_ms: 15_000,
            default_rate_limit: RateLimitConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
