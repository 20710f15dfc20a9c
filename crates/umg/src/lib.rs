//! UMG - Unified Market Gateway
//!
//! A protocol gateway between AI-agent clients and per-venue market-data
//! providers. Unified tool invocations are validated, routed to the right
//! provider, normalized into one schema, and cached with per-category
//! freshness windows.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use umg::models::config::UmgConfig;
//! use umg::models::invocation::ToolInvocation;
//! use umg::gateway::{UnifiedGateway, ProviderClient};
//! ```

pub use umg_cache as cache;
pub use umg_gateway as gateway;
pub use umg_models as models;

use std::collections::HashMap;
use std::sync::Arc;

use umg_gateway::{HttpProviderClient, ProviderClient, UnifiedGateway};
use umg_models::config::UmgConfig;

/// Build a UnifiedGateway from configuration, wiring an HTTP client for
/// every enabled provider.
pub fn build_gateway(config: &UmgConfig) -> Result<UnifiedGateway, anyhow::Error> {
    let mut clients: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();
    for provider in config.enabled_providers() {
        clients.insert(
            provider.name.clone(),
            Arc::new(HttpProviderClient::new(&provider.name, &provider.address)),
        );
    }

    if clients.is_empty() {
        anyhow::bail!("no enabled providers in configuration");
    }

    Ok(UnifiedGateway::new(clients, config.clone()))
}
