use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use umg_cache::{CacheStats, ResponseCache, TtlPolicy};
use umg_models::cache_key;
use umg_models::config::UmgConfig;
use umg_models::invocation::ToolDescriptor;

use crate::error::GatewayError;
use crate::normalize::{DataType, SchemaNormalizer};
use crate::provider::{HealthStatus, ProviderClient};
use crate::registry::ProviderRegistry;
use crate::router::{RoutePlan, UnifiedRouter};
use crate::tools::unified_tool_descriptors;
use crate::venue::VenueResolver;

/// Timeout for capability discovery calls.
const CAPABILITIES_TIMEOUT: Duration = Duration::from_millis(2_500);

/// The gateway facade: owns the provider clients, router, normalizer,
/// cache, and registry, and exposes `list_tools`/`invoke` to the
/// transport layer. Everything is constructed here and injected — no
/// global state.
pub struct UnifiedGateway {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
    router: UnifiedRouter,
    normalizer: SchemaNormalizer,
    cache: ResponseCache,
    registry: ProviderRegistry,
    venues: VenueResolver,
    config: UmgConfig,
}

impl UnifiedGateway {
    pub fn new(clients: HashMap<String, Arc<dyn ProviderClient>>, config: UmgConfig) -> Self {
        let venues = VenueResolver::from_config(&config.venues);
        let router = UnifiedRouter::new(clients.clone(), venues.clone(), &config.gateway);
        let cache = ResponseCache::new(TtlPolicy::from_config(&config.cache));
        let registry = ProviderRegistry::from_config(&config);
        info!(
            providers = clients.len(),
            venues = venues.public_venues().len(),
            "UnifiedGateway initialized"
        );
        Self {
            clients,
            router,
            normalizer: SchemaNormalizer::new(),
            cache,
            registry,
            venues,
            config,
        }
    }

    /// Query every provider for its capability descriptors. Per-provider
    /// failures are logged and skipped so one dead provider cannot block
    /// startup.
    pub async fn discover_capabilities(&self) {
        for (provider_id, client) in &self.clients {
            match client.list_capabilities(CAPABILITIES_TIMEOUT).await {
                Ok(capabilities) => self.registry.cache_capabilities(provider_id, capabilities),
                Err(e) => warn!(
                    provider = %provider_id,
                    error = %e,
                    "Failed to discover provider capabilities"
                ),
            }
        }
    }

    /// The client-facing tool list: unified tools always, plus any
    /// provider-native tools the exposure config lets through.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let mut descriptors =
            unified_tool_descriptors(self.venues.public_venues(), self.venues.default_venue());

        for (_, tool) in self.registry.provider_tools() {
            if self.provider_tool_exposed(&tool.name) {
                descriptors.push(ToolDescriptor {
                    name: tool.name,
                    description: tool.description,
                    input_schema: tool.input_schema.unwrap_or_else(|| json!({"type": "object"})),
                });
            }
        }

        descriptors
    }

    /// Invoke a tool: validate and resolve the route, consult the cache,
    /// call the provider, normalize, cache, return.
    pub async fn invoke(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
        correlation_id: Option<String>,
    ) -> Result<Value, GatewayError> {
        let correlation_id =
            correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let is_unified = tool.starts_with("market.") || tool.starts_with("trade.");
        if !is_unified {
            return self
                .invoke_provider_tool(tool, arguments, &correlation_id)
                .await;
        }

        // Validation happens before the cache or any network call.
        let plan = self.router.plan(tool, &arguments)?;

        let cache_key = self.derive_cache_key(&plan, &arguments);
        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get(key) {
                debug!(tool, key = %key, correlation_id = %correlation_id, "Serving cached response");
                return Ok(cached);
            }
        }

        let routed = self.router.execute(&plan, arguments, &correlation_id).await?;

        let envelope = match plan.data_type {
            Some(data_type) => {
                let mut additional = Map::new();
                additional.insert(
                    "latency_ms".to_string(),
                    json!(routed.routing_info.latency_ms),
                );
                let normalized = self.normalizer.normalize(
                    &plan.venue,
                    data_type,
                    &routed.result,
                    Some(additional),
                )?;
                json!({
                    "result": Value::Object(normalized),
                    "routing_info": routed.routing_info,
                })
            }
            None => json!({
                "result": routed.result,
                "routing_info": routed.routing_info,
            }),
        };

        if let Some(key) = cache_key {
            self.cache.set(key, envelope.clone());
        }

        Ok(envelope)
    }

    /// Direct invocation of a provider-native tool, when exposed. No venue
    /// logic and no normalization; the payload passes through untouched.
    async fn invoke_provider_tool(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
        correlation_id: &str,
    ) -> Result<Value, GatewayError> {
        let unsupported = || GatewayError::UnsupportedTool {
            tool: tool.to_string(),
            supported: self
                .router
                .supported_tools()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        if !self.provider_tool_exposed(tool) {
            return Err(unsupported());
        }

        let provider_id = self
            .registry
            .provider_for_tool(tool)
            .ok_or_else(unsupported)?;
        let client = self.router.client(&provider_id).ok_or_else(|| {
            GatewayError::ProviderNotConfigured {
                venue: provider_id.clone(),
                provider_id: provider_id.clone(),
            }
        })?;

        info!(tool, provider = %provider_id, correlation_id, "Invoking provider tool directly");
        let start = Instant::now();
        let result = client
            .invoke(tool, arguments, correlation_id, self.router.market_timeout())
            .await
            .map_err(|source| GatewayError::ProviderInvocationFailed {
                venue: provider_id.clone(),
                provider_tool: tool.to_string(),
                source,
            })?;
        debug!(tool, latency_ms = start.elapsed().as_millis() as u64, "Provider tool complete");

        Ok(json!({ "result": result }))
    }

    /// Cache key for a planned call, when the tool is cacheable at all.
    /// Keys embed the provider tool name so the TTL table's category
    /// substrings resolve naturally.
    fn derive_cache_key(&self, plan: &RoutePlan, arguments: &Map<String, Value>) -> Option<String> {
        if !self.config.cache.enabled || !plan.cacheable {
            return None;
        }
        let instrument = arguments.get("instrument").and_then(Value::as_str)?;

        let key = if plan.data_type == Some(DataType::Klines) {
            match arguments.get("interval").and_then(Value::as_str) {
                Some(interval) => cache_key::klines_key(&plan.provider_tool, instrument, interval),
                None => cache_key::response_key(&plan.provider_tool, instrument),
            }
        } else {
            cache_key::response_key(&plan.provider_tool, instrument)
        };
        Some(key)
    }

    fn provider_tool_exposed(&self, tool: &str) -> bool {
        if !self.config.gateway.expose_unified_only {
            return true;
        }
        self.config
            .gateway
            .expose_provider_tools
            .iter()
            .any(|pattern| pattern_matches(pattern, tool))
    }

    /// Run periodic health checks against every provider until cancelled.
    pub fn spawn_health_loop(self: &Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let gateway = Arc::clone(self);
        let period = Duration::from_secs(gateway.config.gateway.health_check_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Health check loop stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        for client in gateway.clients.values() {
                            client.health_check().await;
                        }
                    }
                }
            }
        })
    }

    pub fn router(&self) -> &UnifiedRouter {
        &self.router
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Health snapshots for every provider client, sorted by provider id.
    pub fn provider_health(&self) -> Vec<HealthStatus> {
        let mut statuses: Vec<HealthStatus> = self
            .clients
            .values()
            .map(|client| client.health_status())
            .collect();
        statuses.sort_by(|a, b| a.provider.cmp(&b.provider));
        statuses
    }
}

/// Exact match, or prefix match when the pattern ends with `*`.
fn pattern_matches(pattern: &str, tool: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => tool.starts_with(prefix),
        None => pattern == tool,
    }
}
