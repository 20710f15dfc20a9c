//! Schema normalization: provider-native response shapes -> unified schema.
//!
//! One pure transform per (venue, data type), registered in a dispatch
//! table at construction. Each venue owns its full transform set; adding a
//! venue never touches another venue's transforms.

mod binance;

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::error::GatewayError;

/// Data-type tag selecting a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Ticker,
    OrderbookL1,
    OrderbookL2,
    Klines,
    Order,
    Account,
    Trade,
    RecentTrades,
    ExchangeInfo,
    OrderbookHealth,
    VolumeProfile,
    MarketAnomalies,
    MicrostructureHealth,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::OrderbookL1 => "orderbook_l1",
            Self::OrderbookL2 => "orderbook_l2",
            Self::Klines => "klines",
            Self::Order => "order",
            Self::Account => "account",
            Self::Trade => "trade",
            Self::RecentTrades => "recent_trades",
            Self::ExchangeInfo => "exchange_info",
            Self::OrderbookHealth => "orderbook_health",
            Self::VolumeProfile => "volume_profile",
            Self::MarketAnomalies => "market_anomalies",
            Self::MicrostructureHealth => "microstructure_health",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure inside a per-type transform.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("{0}")]
    Malformed(String),
}

/// A pure transform from a raw provider payload to the unified field set.
pub type NormalizeFn = fn(&Value) -> Result<Map<String, Value>, NormalizeError>;

/// Dispatch table of per-venue, per-data-type transforms.
pub struct SchemaNormalizer {
    normalizers: HashMap<(String, DataType), NormalizeFn>,
}

impl SchemaNormalizer {
    /// Build the normalizer with every built-in venue registered.
    pub fn new() -> Self {
        let mut normalizer = Self {
            normalizers: HashMap::new(),
        };
        binance::register(&mut normalizer);
        normalizer
    }

    /// Register one transform. Replaces any existing entry for the pair.
    pub fn register(&mut self, venue: &str, data_type: DataType, transform: NormalizeFn) {
        self.normalizers
            .insert((venue.to_string(), data_type), transform);
    }

    /// Normalize a raw provider response.
    ///
    /// After the transform runs, `additional_fields` are merged in
    /// (overwriting on collision), and `venue` is backfilled when the
    /// transform did not set it.
    pub fn normalize(
        &self,
        venue: &str,
        data_type: DataType,
        raw: &Value,
        additional_fields: Option<Map<String, Value>>,
    ) -> Result<Map<String, Value>, GatewayError> {
        let transform = self
            .normalizers
            .get(&(venue.to_string(), data_type))
            .ok_or_else(|| GatewayError::NormalizerNotFound {
                venue: venue.to_string(),
                data_type: data_type.as_str().to_string(),
            })?;

        let mut normalized =
            transform(raw).map_err(|source| GatewayError::NormalizationFailed {
                venue: venue.to_string(),
                data_type: data_type.as_str().to_string(),
                source,
            })?;

        if let Some(fields) = additional_fields {
            for (key, value) in fields {
                normalized.insert(key, value);
            }
        }

        if !normalized.contains_key("venue") {
            normalized.insert("venue".to_string(), Value::String(venue.to_string()));
        }

        debug!(venue, data_type = %data_type, "Normalized provider response");
        Ok(normalized)
    }

    pub fn is_supported(&self, venue: &str, data_type: DataType) -> bool {
        self.normalizers
            .contains_key(&(venue.to_string(), data_type))
    }

    pub fn supported_venues(&self) -> Vec<String> {
        let mut venues: Vec<String> = self
            .normalizers
            .keys()
            .map(|(venue, _)| venue.clone())
            .collect();
        venues.sort();
        venues.dedup();
        venues
    }

    pub fn supported_data_types(&self, venue: &str) -> Vec<DataType> {
        self.normalizers
            .keys()
            .filter(|(v, _)| v == venue)
            .map(|(_, data_type)| *data_type)
            .collect()
    }
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

// ---- shared value-coercion helpers ----

/// Coerce a JSON value to f64. Providers report most numerics as strings.
pub(crate) fn value_to_f64(value: &Value, field: &'static str) -> Result<f64, NormalizeError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| NormalizeError::NotNumeric {
            field,
            value: n.to_string(),
        }),
        Value::String(s) => s.parse::<f64>().map_err(|_| NormalizeError::NotNumeric {
            field,
            value: s.clone(),
        }),
        other => Err(NormalizeError::NotNumeric {
            field,
            value: other.to_string(),
        }),
    }
}

/// Required numeric field on an object payload.
pub(crate) fn num_field(raw: &Value, field: &'static str) -> Result<f64, NormalizeError> {
    let value = raw
        .get(field)
        .ok_or(NormalizeError::MissingField(field))?;
    value_to_f64(value, field)
}

/// Optional numeric field: absent is fine, present-but-garbage is not.
pub(crate) fn opt_num_field(
    raw: &Value,
    field: &'static str,
) -> Result<Option<f64>, NormalizeError> {
    match raw.get(field) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => value_to_f64(value, field).map(Some),
    }
}

/// Required string field on an object payload.
pub(crate) fn str_field(raw: &Value, field: &'static str) -> Result<String, NormalizeError> {
    raw.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(NormalizeError::MissingField(field))
}

/// Coerce a JSON value to an integer timestamp, tolerating float/string forms.
pub(crate) fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }
}

/// Current wall-clock millis; the documented fallback for payloads that
/// carry no timestamp of their own.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_pair_is_normalizer_not_found() {
        let normalizer = SchemaNormalizer::new();
        let err = normalizer
            .normalize("kraken", DataType::Ticker, &json!({}), None)
            .unwrap_err();
        assert_eq!(err.error_code(), "NORMALIZER_NOT_FOUND");
    }

    #[test]
    fn transform_failure_is_wrapped() {
        let normalizer = SchemaNormalizer::new();
        let err = normalizer
            .normalize("binance", DataType::Ticker, &json!({}), None)
            .unwrap_err();
        assert_eq!(err.error_code(), "NORMALIZATION_FAILED");
        // The cause survives in the source chain.
        assert!(err.to_string().contains("bidPrice"));
    }

    #[test]
    fn additional_fields_overwrite_and_venue_backfills() {
        let normalizer = SchemaNormalizer::new();
        let raw = json!({
            "symbol": "BTCUSDT",
            "bidPrice": "100.0",
            "askPrice": "101.0",
            "volume": "5.0",
            "closeTime": 1697048400000i64,
        });
        let mut extra = Map::new();
        extra.insert("latency_ms".to_string(), json!(12.5));
        extra.insert("volume".to_string(), json!(999.0));

        let normalized = normalizer
            .normalize("binance", DataType::Ticker, &raw, Some(extra))
            .unwrap();
        assert_eq!(normalized["latency_ms"], json!(12.5));
        assert_eq!(normalized["volume"], json!(999.0)); // overwritten
        assert_eq!(normalized["venue"], json!("binance"));
    }

    #[test]
    fn registration_is_per_venue() {
        fn fake(_raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
            Ok(Map::new())
        }

        let mut normalizer = SchemaNormalizer::new();
        assert!(!normalizer.is_supported("okx", DataType::Ticker));
        normalizer.register("okx", DataType::Ticker, fake);
        assert!(normalizer.is_supported("okx", DataType::Ticker));
        // Existing venue untouched
        assert!(normalizer.is_supported("binance", DataType::Ticker));
        assert_eq!(normalizer.supported_venues(), vec!["binance", "okx"]);
    }

    #[test]
    fn value_coercions() {
        assert_eq!(value_to_f64(&json!("43250.50"), "x").unwrap(), 43250.50);
        assert_eq!(value_to_f64(&json!(42), "x").unwrap(), 42.0);
        assert!(value_to_f64(&json!("abc"), "x").is_err());
        assert!(value_to_f64(&json!(null), "x").is_err());

        assert_eq!(value_to_i64(&json!(1697048400000i64)), Some(1697048400000));
        assert_eq!(value_to_i64(&json!("170")), Some(170));
        assert_eq!(value_to_i64(&json!(1.5)), Some(1));
    }
}
