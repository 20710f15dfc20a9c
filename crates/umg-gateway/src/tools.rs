//! Static unified tool declarations.
//!
//! Venue-parameterized JSON schemas for every unified tool: `instrument`
//! is required, `venue` is optional with a configured default, and
//! category-specific extras (interval, limit, window) are declared per
//! tool.

use serde_json::{json, Value};

use umg_models::invocation::ToolDescriptor;

fn venue_property(venues: &[String], default_venue: &str) -> Value {
    json!({
        "type": "string",
        "description": format!(
            "Exchange venue to query (default: {default_venue}). Available: {}",
            venues.join(", ")
        ),
        "enum": venues,
        "default": default_venue,
    })
}

fn instrument_property() -> Value {
    json!({
        "type": "string",
        "description": "Trading pair symbol (e.g., BTCUSDT)",
        "examples": ["BTCUSDT", "ETHUSDT"],
    })
}

fn market_schema(venues: &[String], default_venue: &str, extras: &[(&str, Value)]) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert("venue".to_string(), venue_property(venues, default_venue));
    properties.insert("instrument".to_string(), instrument_property());
    for (name, schema) in extras {
        properties.insert(name.to_string(), schema.clone());
    }
    json!({
        "type": "object",
        "required": ["instrument"],
        "properties": properties,
    })
}

fn limit_property(description: &str, default: u32) -> Value {
    json!({
        "type": "integer",
        "description": description,
        "default": default,
    })
}

/// Build the client-facing unified tool list for the configured venues.
pub fn unified_tool_descriptors(venues: &[String], default_venue: &str) -> Vec<ToolDescriptor> {
    let venues_list = venues.join(", ");
    vec![
        ToolDescriptor {
            name: "market.get_ticker".to_string(),
            description: format!(
                "Get normalized ticker data (bid, ask, mid, spread_bps) for any venue. Available venues: {venues_list}"
            ),
            input_schema: market_schema(venues, default_venue, &[]),
        },
        ToolDescriptor {
            name: "market.get_orderbook_l1".to_string(),
            description: format!(
                "Get normalized top-of-book orderbook (L1) for any venue. Available venues: {venues_list}"
            ),
            input_schema: market_schema(venues, default_venue, &[]),
        },
        ToolDescriptor {
            name: "market.get_orderbook_l2".to_string(),
            description: format!(
                "Get normalized full depth orderbook (L2) for any venue. Available venues: {venues_list}"
            ),
            input_schema: market_schema(
                venues,
                default_venue,
                &[(
                    "limit",
                    limit_property("Number of price levels to return (default: 100)", 100),
                )],
            ),
        },
        ToolDescriptor {
            name: "market.get_klines".to_string(),
            description: format!(
                "Get normalized historical klines/candlesticks for any venue. Available venues: {venues_list}"
            ),
            input_schema: {
                let mut schema = market_schema(
                    venues,
                    default_venue,
                    &[
                        (
                            "interval",
                            json!({
                                "type": "string",
                                "description": "Kline interval (e.g., 1m, 5m, 1h, 1d)",
                                "examples": ["1m", "5m", "15m", "1h", "4h", "1d"],
                            }),
                        ),
                        (
                            "limit",
                            limit_property("Number of klines to return (default: 500)", 500),
                        ),
                    ],
                );
                schema["required"] = json!(["instrument", "interval"]);
                schema
            },
        },
        ToolDescriptor {
            name: "market.get_trades".to_string(),
            description: format!(
                "Get normalized recent public trades for any venue. Available venues: {venues_list}"
            ),
            input_schema: market_schema(
                venues,
                default_venue,
                &[(
                    "limit",
                    limit_property("Number of trades to return (default: 100)", 100),
                )],
            ),
        },
        ToolDescriptor {
            name: "market.get_exchange_info".to_string(),
            description: format!(
                "Get normalized instrument metadata (price/lot-size limits) for any venue. Available venues: {venues_list}"
            ),
            input_schema: market_schema(venues, default_venue, &[]),
        },
        ToolDescriptor {
            name: "market.get_volume_profile".to_string(),
            description: format!(
                "Get the traded volume profile for an instrument. Available venues: {venues_list}"
            ),
            input_schema: market_schema(
                venues,
                default_venue,
                &[(
                    "duration_minutes",
                    limit_property("Lookback window in minutes (default: 60)", 60),
                )],
            ),
        },
        ToolDescriptor {
            name: "market.get_orderbook_health".to_string(),
            description: format!(
                "Get orderbook health metrics for an instrument. Available venues: {venues_list}"
            ),
            input_schema: market_schema(venues, default_venue, &[]),
        },
        ToolDescriptor {
            name: "market.detect_liquidity_vacuums".to_string(),
            description: format!(
                "Detect liquidity vacuums in the current orderbook. Available venues: {venues_list}"
            ),
            input_schema: market_schema(venues, default_venue, &[]),
        },
        ToolDescriptor {
            name: "market.detect_anomalies".to_string(),
            description: format!(
                "Detect market anomalies for an instrument. Available venues: {venues_list}"
            ),
            input_schema: market_schema(
                venues,
                default_venue,
                &[(
                    "window_minutes",
                    limit_property("Detection window in minutes (default: 15)", 15),
                )],
            ),
        },
        ToolDescriptor {
            name: "market.get_microstructure_health".to_string(),
            description: format!(
                "Get market microstructure health for an instrument. Available venues: {venues_list}"
            ),
            input_schema: market_schema(venues, default_venue, &[]),
        },
        ToolDescriptor {
            name: "trade.get_order".to_string(),
            description: format!(
                "Get normalized order status (with remaining quantity) for any venue. Available venues: {venues_list}"
            ),
            input_schema: {
                let mut schema = market_schema(
                    venues,
                    default_venue,
                    &[(
                        "order_id",
                        json!({
                            "type": "integer",
                            "description": "Venue-native order identifier",
                        }),
                    )],
                );
                schema["required"] = json!(["instrument", "order_id"]);
                schema
            },
        },
        ToolDescriptor {
            name: "trade.get_account".to_string(),
            description: format!(
                "Get normalized account balances (non-zero only) for any venue. Available venues: {venues_list}"
            ),
            input_schema: json!({
                "type": "object",
                "required": [],
                "properties": {
                    "venue": venue_property(venues, default_venue),
                },
            }),
        },
        ToolDescriptor {
            name: "trade.get_my_trades".to_string(),
            description: format!(
                "Get normalized own-trade history for any venue. Available venues: {venues_list}"
            ),
            input_schema: market_schema(
                venues,
                default_venue,
                &[(
                    "limit",
                    limit_property("Number of trades to return (default: 50)", 50),
                )],
            ),
        },
    ]
}
