pub mod error;
pub mod gateway;
pub mod normalize;
pub mod provider;
pub mod registry;
pub mod router;
pub mod tools;
pub mod venue;

pub mod test_support;

pub use error::GatewayError;
pub use gateway::UnifiedGateway;
pub use normalize::{DataType, NormalizeError, SchemaNormalizer};
pub use provider::{
    Capabilities, HealthStatus, HttpProviderClient, ProviderClient, ProviderError,
};
pub use registry::ProviderRegistry;
pub use router::{RoutePlan, RoutedResponse, UnifiedRouter, UNIFIED_TOOLS};
pub use venue::{ResolvedVenue, VenueResolver};
