use serde_json::{json, Value};
use thiserror::Error;

use crate::normalize::NormalizeError;
use crate::provider::ProviderError;

/// All failure kinds produced by the routing/normalization pipeline.
///
/// The first three are validation failures detected before any network
/// call. `ProviderInvocationFailed` is the only kind that reaches a
/// provider; the normalization kinds mean the provider succeeded but the
/// response shape was unexpected.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("unknown venue '{venue}'; available venues: {available:?}")]
    UnknownVenue {
        venue: String,
        available: Vec<String>,
    },

    #[error("venue '{venue}' resolves to provider '{provider_id}' which has no configured client")]
    ProviderNotConfigured {
        venue: String,
        provider_id: String,
    },

    #[error("unsupported tool '{tool}'; supported tools: {supported:?}")]
    UnsupportedTool {
        tool: String,
        supported: Vec<String>,
    },

    #[error("provider '{venue}' failed to execute {provider_tool}: {source}")]
    ProviderInvocationFailed {
        venue: String,
        provider_tool: String,
        #[source]
        source: ProviderError,
    },

    #[error("no normalizer registered for {venue}.{data_type}")]
    NormalizerNotFound { venue: String, data_type: String },

    #[error("normalization failed for {venue}.{data_type}: {source}")]
    NormalizationFailed {
        venue: String,
        data_type: String,
        #[source]
        source: NormalizeError,
    },
}

impl GatewayError {
    /// Stable machine-readable code for transport layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownVenue { .. } => "UNKNOWN_VENUE",
            Self::ProviderNotConfigured { .. } => "PROVIDER_NOT_CONFIGURED",
            Self::UnsupportedTool { .. } => "UNSUPPORTED_TOOL",
            Self::ProviderInvocationFailed { .. } => "PROVIDER_INVOCATION_FAILED",
            Self::NormalizerNotFound { .. } => "NORMALIZER_NOT_FOUND",
            Self::NormalizationFailed { .. } => "NORMALIZATION_FAILED",
        }
    }

    /// True for failures raised before any provider call is attempted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownVenue { .. }
                | Self::ProviderNotConfigured { .. }
                | Self::UnsupportedTool { .. }
        )
    }

    /// Structured error payload for clients: message, code, and whatever
    /// context helps the caller correct the request.
    pub fn to_client_json(&self) -> Value {
        let mut payload = json!({
            "error": self.to_string(),
            "error_code": self.error_code(),
        });
        match self {
            Self::UnknownVenue { available, .. } => {
                payload["available_venues"] = json!(available);
            }
            Self::UnsupportedTool { supported, .. } => {
                payload["supported_tools"] = json!(supported);
            }
            Self::ProviderInvocationFailed {
                venue,
                provider_tool,
                ..
            } => {
                payload["venue"] = json!(venue);
                payload["provider_tool"] = json!(provider_tool);
            }
            _ => {}
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_kinds_are_flagged() {
        let err = GatewayError::UnknownVenue {
            venue: "kraken".to_string(),
            available: vec!["binance".to_string()],
        };
        assert!(err.is_validation());
        assert_eq!(err.error_code(), "UNKNOWN_VENUE");

        let err = GatewayError::ProviderInvocationFailed {
            venue: "binance".to_string(),
            provider_tool: "binance.get_ticker".to_string(),
            source: ProviderError::Timeout(5000),
        };
        assert!(!err.is_validation());
    }

    #[test]
    fn client_json_carries_context() {
        let err = GatewayError::UnknownVenue {
            venue: "kraken".to_string(),
            available: vec!["binance".to_string()],
        };
        let payload = err.to_client_json();
        assert_eq!(payload["error_code"], "UNKNOWN_VENUE");
        assert_eq!(payload["available_venues"][0], "binance");

        let err = GatewayError::UnsupportedTool {
            tool: "market.bogus".to_string(),
            supported: vec!["market.get_ticker".to_string()],
        };
        let payload = err.to_client_json();
        assert_eq!(payload["supported_tools"][0], "market.get_ticker");
    }
}
