use std::collections::HashMap;
use std::sync::RwLock;

use tracing::info;

use umg_models::config::{ProviderConfig, UmgConfig};

use crate::provider::{Capabilities, ProviderToolDef};

/// Provider discovery bookkeeping: which providers are configured, and
/// which tools each one reported during capability discovery.
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
    capabilities: RwLock<HashMap<String, Capabilities>>,
}

impl ProviderRegistry {
    /// Build the registry from configuration. Disabled providers are
    /// dropped here and never get a client.
    pub fn from_config(config: &UmgConfig) -> Self {
        let providers: Vec<ProviderConfig> = config
            .enabled_providers()
            .into_iter()
            .cloned()
            .collect();
        info!(providers = providers.len(), "Loaded provider configurations");
        Self {
            providers,
            capabilities: RwLock::new(HashMap::new()),
        }
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Store the capability set discovered for one provider.
    pub fn cache_capabilities(&self, provider: &str, capabilities: Capabilities) {
        info!(
            provider,
            tools = capabilities.tools.len(),
            version = %capabilities.provider_version,
            "Cached provider capabilities"
        );
        if let Ok(mut cache) = self.capabilities.write() {
            cache.insert(provider.to_string(), capabilities);
        }
    }

    pub fn capabilities(&self, provider: &str) -> Option<Capabilities> {
        self.capabilities
            .read()
            .ok()
            .and_then(|cache| cache.get(provider).cloned())
    }

    /// The provider that reported a given provider-native tool name.
    pub fn provider_for_tool(&self, tool: &str) -> Option<String> {
        let cache = self.capabilities.read().ok()?;
        cache
            .iter()
            .find(|(_, capabilities)| capabilities.tools.iter().any(|t| t.name == tool))
            .map(|(provider, _)| provider.clone())
    }

    /// Every discovered provider tool, with its owning provider.
    pub fn provider_tools(&self) -> Vec<(String, ProviderToolDef)> {
        match self.capabilities.read() {
            Ok(cache) => cache
                .iter()
                .flat_map(|(provider, capabilities)| {
                    capabilities
                        .tools
                        .iter()
                        .map(|tool| (provider.clone(), tool.clone()))
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umg_models::config::ProviderConfig;

    fn registry() -> ProviderRegistry {
        let config = UmgConfig {
            providers: vec![
                ProviderConfig {
                    name: "binance".to_string(),
                    address: "http://localhost:50051".to_string(),
                    enabled: true,
                    rate_limit: None,
                },
                ProviderConfig {
                    name: "okx".to_string(),
                    address: "http://localhost:50052".to_string(),
                    enabled: false,
                    rate_limit: None,
                },
            ],
            ..Default::default()
        };
        ProviderRegistry::from_config(&config)
    }

    #[test]
    fn disabled_providers_are_dropped() {
        let registry = registry();
        assert_eq!(registry.providers().len(), 1);
        assert_eq!(registry.providers()[0].name, "binance");
    }

    #[test]
    fn capabilities_roundtrip_and_tool_lookup() {
        let registry = registry();
        assert!(registry.capabilities("binance").is_none());

        registry.cache_capabilities(
            "binance",
            Capabilities {
                tools: vec![ProviderToolDef {
                    name: "binance.get_ticker".to_string(),
                    description: String::new(),
                    input_schema: None,
                }],
                provider_version: "1.0.0".to_string(),
            },
        );

        let caps = registry.capabilities("binance").unwrap();
        assert_eq!(caps.tools.len(), 1);
        assert_eq!(
            registry.provider_for_tool("binance.get_ticker"),
            Some("binance".to_string())
        );
        assert!(registry.provider_for_tool("binance.unknown").is_none());
        assert_eq!(registry.provider_tools().len(), 1);
    }
}
