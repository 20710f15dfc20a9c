use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One inbound tool invocation as received from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Unified tool name, e.g. "market.get_ticker".
    pub tool: String,
    /// Argument map. May contain `venue` and `instrument` keys.
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Opaque per-request identifier threaded through for tracing.
    /// Generated by the caller when absent.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// Routing metadata attached to every successfully routed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingInfo {
    pub unified_tool: String,
    pub provider_tool: String,
    pub venue: String,
    pub latency_ms: f64,
}

/// Client-facing declaration of one callable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_from_minimal_json() {
        let inv: ToolInvocation =
            serde_json::from_str(r#"{"tool": "market.get_ticker"}"#).unwrap();
        assert_eq!(inv.tool, "market.get_ticker");
        assert!(inv.arguments.is_empty());
        assert!(inv.correlation_id.is_none());
    }

    #[test]
    fn invocation_with_arguments() {
        let inv: ToolInvocation = serde_json::from_str(
            r#"{"tool": "market.get_ticker", "arguments": {"venue": "binance", "instrument": "BTCUSDT"}}"#,
        )
        .unwrap();
        assert_eq!(inv.arguments["venue"], "binance");
        assert_eq!(inv.arguments["instrument"], "BTCUSDT");
    }

    #[test]
    fn routing_info_serializes_flat() {
        let info = RoutingInfo {
            unified_tool: "market.get_ticker".to_string(),
            provider_tool: "binance.get_ticker".to_string(),
            venue: "binance".to_string(),
            latency_ms: 12.5,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["provider_tool"], "binance.get_ticker");
        assert_eq!(json["latency_ms"], 12.5);
    }
}
