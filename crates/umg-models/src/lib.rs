pub mod cache_key;
pub mod config;
pub mod invocation;

pub use config::{CacheConfig, GatewayConfig, ProviderConfig, UmgConfig, VenueConfig};
pub use invocation::{RoutingInfo, ToolDescriptor, ToolInvocation};
