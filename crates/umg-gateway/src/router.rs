use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use umg_models::config::GatewayConfig;
use umg_models::invocation::RoutingInfo;

use crate::error::GatewayError;
use crate::normalize::DataType;
use crate::provider::ProviderClient;
use crate::venue::VenueResolver;

/// Timeout class for a unified tool: latency-sensitive market reads vs
/// heavier analytics aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Market,
    Analytics,
}

/// Static declaration of one unified tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub unified_name: &'static str,
    /// Provider tool template; `{venue}` is replaced by the provider id.
    pub provider_pattern: &'static str,
    /// Data type for normalization; `None` routes the payload through as-is.
    pub data_type: Option<DataType>,
    pub timeout_class: TimeoutClass,
    pub cacheable: bool,
}

/// Every unified tool the gateway routes. Order is the client-facing order.
pub const UNIFIED_TOOLS: &[ToolSpec] = &[
    ToolSpec {
        unified_name: "market.get_ticker",
        provider_pattern: "{venue}.get_ticker",
        data_type: Some(DataType::Ticker),
        timeout_class: TimeoutClass::Market,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.get_orderbook_l1",
        provider_pattern: "{venue}.orderbook_l1",
        data_type: Some(DataType::OrderbookL1),
        timeout_class: TimeoutClass::Market,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.get_orderbook_l2",
        provider_pattern: "{venue}.orderbook_l2",
        data_type: Some(DataType::OrderbookL2),
        timeout_class: TimeoutClass::Market,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.get_klines",
        provider_pattern: "{venue}.get_klines",
        data_type: Some(DataType::Klines),
        timeout_class: TimeoutClass::Market,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.get_trades",
        provider_pattern: "{venue}.get_recent_trades",
        data_type: Some(DataType::RecentTrades),
        timeout_class: TimeoutClass::Market,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.get_exchange_info",
        provider_pattern: "{venue}.get_exchange_info",
        data_type: Some(DataType::ExchangeInfo),
        timeout_class: TimeoutClass::Market,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.get_volume_profile",
        provider_pattern: "{venue}.get_volume_profile",
        data_type: Some(DataType::VolumeProfile),
        timeout_class: TimeoutClass::Analytics,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.get_orderbook_health",
        provider_pattern: "{venue}.orderbook_health",
        data_type: Some(DataType::OrderbookHealth),
        timeout_class: TimeoutClass::Analytics,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.detect_liquidity_vacuums",
        provider_pattern: "{venue}.detect_liquidity_vacuums",
        data_type: None,
        timeout_class: TimeoutClass::Analytics,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.detect_anomalies",
        provider_pattern: "{venue}.detect_market_anomalies",
        data_type: Some(DataType::MarketAnomalies),
        timeout_class: TimeoutClass::Analytics,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "market.get_microstructure_health",
        provider_pattern: "{venue}.get_microstructure_health",
        data_type: Some(DataType::MicrostructureHealth),
        timeout_class: TimeoutClass::Analytics,
        cacheable: true,
    },
    ToolSpec {
        unified_name: "trade.get_order",
        provider_pattern: "{venue}.get_order",
        data_type: Some(DataType::Order),
        timeout_class: TimeoutClass::Market,
        cacheable: false,
    },
    ToolSpec {
        unified_name: "trade.get_account",
        provider_pattern: "{venue}.get_account",
        data_type: Some(DataType::Account),
        timeout_class: TimeoutClass::Market,
        cacheable: false,
    },
    ToolSpec {
        unified_name: "trade.get_my_trades",
        provider_pattern: "{venue}.get_my_trades",
        data_type: Some(DataType::Trade),
        timeout_class: TimeoutClass::Market,
        cacheable: false,
    },
];

/// Fully resolved route for one invocation. Produced by the pure
/// validation phase; nothing here has touched the network yet.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub unified_tool: String,
    pub provider_tool: String,
    /// Public venue name.
    pub venue: String,
    pub provider_id: String,
    pub data_type: Option<DataType>,
    pub cacheable: bool,
    pub timeout: Duration,
}

/// A routed provider response plus its routing metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedResponse {
    pub result: Value,
    pub routing_info: RoutingInfo,
}

/// Static metadata for one unified tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolMetadata {
    pub name: String,
    pub provider_pattern: String,
    pub available_venues: Vec<String>,
}

/// Routes unified tool invocations to the venue's provider client.
///
/// Stateless after construction; shared across handlers without locking.
pub struct UnifiedRouter {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
    venues: VenueResolver,
    market_timeout: Duration,
    analytics_timeout: Duration,
}

impl UnifiedRouter {
    pub fn new(
        clients: HashMap<String, Arc<dyn ProviderClient>>,
        venues: VenueResolver,
        config: &GatewayConfig,
    ) -> Self {
        info!(providers = clients.len(), "UnifiedRouter initialized");
        Self {
            clients,
            venues,
            market_timeout: Duration::from_millis(config.default_timeout_ms),
            analytics_timeout: Duration::from_millis(config.analytics_timeout_ms),
        }
    }

    fn spec(tool: &str) -> Option<&'static ToolSpec> {
        UNIFIED_TOOLS.iter().find(|spec| spec.unified_name == tool)
    }

    /// Validation/resolution phase: venue, tool mapping, live client.
    /// Never touches the network; every failure here is a validation kind.
    pub fn plan(&self, tool: &str, arguments: &Map<String, Value>) -> Result<RoutePlan, GatewayError> {
        let requested_venue = arguments.get("venue").and_then(Value::as_str);
        let resolved = self.venues.resolve(requested_venue)?;

        let spec = Self::spec(tool).ok_or_else(|| GatewayError::UnsupportedTool {
            tool: tool.to_string(),
            supported: self.supported_tools().iter().map(|s| s.to_string()).collect(),
        })?;

        if !self.clients.contains_key(&resolved.provider_id) {
            return Err(GatewayError::ProviderNotConfigured {
                venue: resolved.public_name,
                provider_id: resolved.provider_id,
            });
        }

        let timeout = match spec.timeout_class {
            TimeoutClass::Market => self.market_timeout,
            TimeoutClass::Analytics => self.analytics_timeout,
        };

        Ok(RoutePlan {
            unified_tool: tool.to_string(),
            provider_tool: spec.provider_pattern.replace("{venue}", &resolved.provider_id),
            venue: resolved.public_name,
            provider_id: resolved.provider_id,
            data_type: spec.data_type,
            cacheable: spec.cacheable,
            timeout,
        })
    }

    /// Rewrite client arguments into the provider payload: the `venue` key
    /// is dropped and the generic `instrument` key becomes the
    /// provider-native `symbol`.
    fn rewrite_arguments(arguments: Map<String, Value>) -> Map<String, Value> {
        let mut payload = Map::new();
        for (key, value) in arguments {
            match key.as_str() {
                "venue" => {}
                "instrument" => {
                    payload.insert("symbol".to_string(), value);
                }
                _ => {
                    payload.insert(key, value);
                }
            }
        }
        payload
    }

    /// Invoke the planned provider call and attach routing metadata.
    pub async fn execute(
        &self,
        plan: &RoutePlan,
        arguments: Map<String, Value>,
        correlation_id: &str,
    ) -> Result<RoutedResponse, GatewayError> {
        let client = self.clients.get(&plan.provider_id).ok_or_else(|| {
            GatewayError::ProviderNotConfigured {
                venue: plan.venue.clone(),
                provider_id: plan.provider_id.clone(),
            }
        })?;

        // Health state is informational, never a circuit breaker.
        if !client.is_healthy() {
            warn!(
                venue = %plan.venue,
                "Provider is marked unhealthy, attempting request anyway"
            );
        }

        let payload = Self::rewrite_arguments(arguments);
        info!(
            unified_tool = %plan.unified_tool,
            provider_tool = %plan.provider_tool,
            venue = %plan.venue,
            correlation_id,
            "Routing unified tool call"
        );

        let start = Instant::now();
        let invoked = client
            .invoke(&plan.provider_tool, payload, correlation_id, plan.timeout)
            .await;
        let latency_ms = start.elapsed().as_secs_f64() * 1_000.0;

        let mut result = match invoked {
            Ok(result) => result,
            Err(source) => {
                error!(
                    venue = %plan.venue,
                    provider_tool = %plan.provider_tool,
                    latency_ms,
                    error = %source,
                    "Provider invocation failed"
                );
                return Err(GatewayError::ProviderInvocationFailed {
                    venue: plan.venue.clone(),
                    provider_tool: plan.provider_tool.clone(),
                    source,
                });
            }
        };

        // Structured results get the routing metadata inline as well.
        if let Some(map) = result.as_object_mut() {
            map.insert("latency_ms".to_string(), serde_json::json!(latency_ms));
            map.insert("venue".to_string(), Value::String(plan.venue.clone()));
        }

        info!(
            unified_tool = %plan.unified_tool,
            venue = %plan.venue,
            latency_ms,
            "Routed unified tool call"
        );

        Ok(RoutedResponse {
            result,
            routing_info: RoutingInfo {
                unified_tool: plan.unified_tool.clone(),
                provider_tool: plan.provider_tool.clone(),
                venue: plan.venue.clone(),
                latency_ms,
            },
        })
    }

    /// Plan and execute in one step.
    pub async fn route_tool_call(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
        correlation_id: &str,
    ) -> Result<RoutedResponse, GatewayError> {
        let plan = self.plan(tool, &arguments)?;
        self.execute(&plan, arguments, correlation_id).await
    }

    pub fn supported_tools(&self) -> Vec<&'static str> {
        UNIFIED_TOOLS.iter().map(|spec| spec.unified_name).collect()
    }

    /// Venues with a live, currently-healthy client for a supported tool.
    /// Unknown tools get an empty list rather than an error.
    pub fn available_venues(&self, tool: &str) -> Vec<String> {
        if Self::spec(tool).is_none() {
            return Vec::new();
        }
        self.venues
            .public_venues()
            .iter()
            .filter(|venue| {
                self.venues
                    .resolve(Some(venue))
                    .ok()
                    .and_then(|resolved| self.clients.get(&resolved.provider_id))
                    .is_some_and(|client| client.is_healthy())
            })
            .cloned()
            .collect()
    }

    /// Static metadata for a unified tool; `None` for unknown names.
    pub fn tool_metadata(&self, tool: &str) -> Option<ToolMetadata> {
        Self::spec(tool).map(|spec| ToolMetadata {
            name: spec.unified_name.to_string(),
            provider_pattern: spec.provider_pattern.to_string(),
            available_venues: self.venues.public_venues().to_vec(),
        })
    }

    pub(crate) fn client(&self, provider_id: &str) -> Option<&Arc<dyn ProviderClient>> {
        self.clients.get(provider_id)
    }

    pub(crate) fn market_timeout(&self) -> Duration {
        self.market_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockProvider;
    use serde_json::json;
    use umg_models::config::VenueConfig;

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn router_with(mock: Arc<MockProvider>) -> UnifiedRouter {
        let mut clients: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();
        clients.insert("binance".to_string(), mock);
        UnifiedRouter::new(
            clients,
            VenueResolver::from_config(&VenueConfig::default()),
            &GatewayConfig::default(),
        )
    }

    #[test]
    fn plan_resolves_tool_and_venue() {
        let router = router_with(Arc::new(MockProvider::new("binance")));
        let plan = router
            .plan(
                "market.get_ticker",
                &args(&[("venue", json!("binance")), ("instrument", json!("BTCUSDT"))]),
            )
            .unwrap();
        assert_eq!(plan.provider_tool, "binance.get_ticker");
        assert_eq!(plan.venue, "binance");
        assert_eq!(plan.data_type, Some(DataType::Ticker));
        assert!(plan.cacheable);
        assert_eq!(plan.timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn plan_applies_default_venue() {
        let router = router_with(Arc::new(MockProvider::new("binance")));
        let plan = router
            .plan("market.get_ticker", &args(&[("instrument", json!("BTCUSDT"))]))
            .unwrap();
        assert_eq!(plan.venue, "binance");
    }

    #[test]
    fn plan_rejects_unknown_venue_before_any_call() {
        let mock = Arc::new(MockProvider::new("binance"));
        let router = router_with(mock.clone());
        let err = router
            .plan(
                "market.get_ticker",
                &args(&[("venue", json!("kraken")), ("instrument", json!("BTCUSDT"))]),
            )
            .unwrap_err();
        match err {
            GatewayError::UnknownVenue { available, .. } => {
                assert_eq!(available, vec!["binance".to_string()]);
            }
            other => panic!("expected UnknownVenue, got {other:?}"),
        }
        assert!(mock.recorded_calls().is_empty());
    }

    #[test]
    fn plan_rejects_unsupported_tool() {
        let router = router_with(Arc::new(MockProvider::new("binance")));
        let err = router
            .plan("market.get_funding", &args(&[("instrument", json!("BTCUSDT"))]))
            .unwrap_err();
        match err {
            GatewayError::UnsupportedTool { supported, .. } => {
                assert!(supported.contains(&"market.get_ticker".to_string()));
            }
            other => panic!("expected UnsupportedTool, got {other:?}"),
        }
    }

    #[test]
    fn plan_flags_missing_client_distinctly() {
        let router = UnifiedRouter::new(
            HashMap::new(),
            VenueResolver::from_config(&VenueConfig::default()),
            &GatewayConfig::default(),
        );
        let err = router
            .plan("market.get_ticker", &args(&[("venue", json!("binance"))]))
            .unwrap_err();
        assert_eq!(err.error_code(), "PROVIDER_NOT_CONFIGURED");
    }

    #[test]
    fn analytics_tools_get_the_longer_timeout() {
        let router = router_with(Arc::new(MockProvider::new("binance")));
        let plan = router
            .plan("market.get_volume_profile", &args(&[("instrument", json!("BTCUSDT"))]))
            .unwrap();
        assert_eq!(plan.timeout, Duration::from_millis(15_000));
    }

    #[tokio::test]
    async fn execute_rewrites_arguments() {
        let mock = Arc::new(
            MockProvider::new("binance").with_response("binance.get_ticker", json!({"ok": true})),
        );
        let router = router_with(mock.clone());

        router
            .route_tool_call(
                "market.get_ticker",
                args(&[("venue", json!("binance")), ("instrument", json!("BTCUSDT"))]),
                "corr-1",
            )
            .await
            .unwrap();

        let calls = mock.recorded_calls();
        assert_eq!(calls.len(), 1);
        let (tool, payload) = &calls[0];
        assert_eq!(tool, "binance.get_ticker");
        assert_eq!(payload.get("symbol"), Some(&json!("BTCUSDT")));
        assert!(!payload.contains_key("venue"));
        assert!(!payload.contains_key("instrument"));
    }

    #[tokio::test]
    async fn execute_injects_routing_metadata() {
        let mock = Arc::new(
            MockProvider::new("binance")
                .with_response("binance.get_ticker", json!({"bidPrice": "1.0"})),
        );
        let router = router_with(mock);

        let routed = router
            .route_tool_call(
                "market.get_ticker",
                args(&[("instrument", json!("BTCUSDT"))]),
                "corr-2",
            )
            .await
            .unwrap();

        assert_eq!(routed.result["venue"], json!("binance"));
        assert!(routed.result["latency_ms"].is_number());
        assert_eq!(routed.routing_info.unified_tool, "market.get_ticker");
        assert_eq!(routed.routing_info.provider_tool, "binance.get_ticker");
        assert!(routed.routing_info.latency_ms >= 0.0);
    }

    #[tokio::test]
    async fn execute_leaves_list_results_untouched() {
        let mock = Arc::new(MockProvider::new("binance").with_response(
            "binance.detect_liquidity_vacuums",
            json!([{"price": 1.0}]),
        ));
        let router = router_with(mock);

        let routed = router
            .route_tool_call(
                "market.detect_liquidity_vacuums",
                args(&[("instrument", json!("BTCUSDT"))]),
                "corr-3",
            )
            .await
            .unwrap();

        // Lists cannot carry inline metadata; routing_info still does.
        assert!(routed.result.is_array());
        assert_eq!(routed.routing_info.venue, "binance");
    }

    #[tokio::test]
    async fn unhealthy_provider_is_still_called() {
        let mock = Arc::new(
            MockProvider::new("binance").with_response("binance.get_ticker", json!({"ok": 1})),
        );
        mock.set_healthy(false);
        let router = router_with(mock.clone());

        let routed = router
            .route_tool_call(
                "market.get_ticker",
                args(&[("instrument", json!("BTCUSDT"))]),
                "corr-4",
            )
            .await
            .unwrap();

        assert_eq!(mock.recorded_calls().len(), 1);
        assert_eq!(routed.result["ok"], json!(1));
    }

    #[tokio::test]
    async fn provider_failure_wraps_with_route_context() {
        let mock = Arc::new(MockProvider::failing(
            "binance",
            crate::test_support::FailMode::Remote("boom".to_string()),
        ));
        let router = router_with(mock);

        let err = router
            .route_tool_call(
                "market.get_ticker",
                args(&[("instrument", json!("BTCUSDT"))]),
                "corr-5",
            )
            .await
            .unwrap_err();

        match err {
            GatewayError::ProviderInvocationFailed {
                venue,
                provider_tool,
                source,
            } => {
                assert_eq!(venue, "binance");
                assert_eq!(provider_tool, "binance.get_ticker");
                assert!(source.to_string().contains("boom"));
            }
            other => panic!("expected ProviderInvocationFailed, got {other:?}"),
        }
    }

    #[test]
    fn available_venues_filters_unhealthy() {
        let mock = Arc::new(MockProvider::new("binance"));
        let router = router_with(mock.clone());
        assert_eq!(router.available_venues("market.get_ticker"), vec!["binance"]);

        mock.set_healthy(false);
        assert!(router.available_venues("market.get_ticker").is_empty());
        assert!(router.available_venues("market.get_funding").is_empty());
    }

    #[test]
    fn tool_metadata_for_unknown_is_none() {
        let router = router_with(Arc::new(MockProvider::new("binance")));
        assert!(router.tool_metadata("market.get_funding").is_none());

        let meta = router.tool_metadata("market.get_klines").unwrap();
        assert_eq!(meta.provider_pattern, "{venue}.get_klines");
        assert_eq!(meta.available_venues, vec!["binance"]);
    }
}
