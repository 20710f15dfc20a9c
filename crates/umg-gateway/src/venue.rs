use std::collections::BTreeMap;

use umg_models::config::VenueConfig;

use crate::error::GatewayError;

/// Result of resolving a public venue name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVenue {
    /// Public-facing name (lowercased).
    pub public_name: String,
    /// Internal provider identifier backing this venue.
    pub provider_id: String,
}

/// Maps public venue names to internal provider identifiers.
///
/// Resolution fails closed: names outside the allow-list are rejected
/// before any provider lookup happens. A missing `venue` argument falls
/// back to the configured default venue.
#[derive(Debug, Clone)]
pub struct VenueResolver {
    default_venue: String,
    venue_providers: BTreeMap<String, String>,
    public_venues: Vec<String>,
}

impl VenueResolver {
    pub fn from_config(config: &VenueConfig) -> Self {
        let venue_providers: BTreeMap<String, String> = config
            .venue_providers
            .iter()
            .map(|(venue, provider)| (venue.to_lowercase(), provider.clone()))
            .collect();
        let public_venues = venue_providers.keys().cloned().collect();
        Self {
            default_venue: config.default_venue.to_lowercase(),
            venue_providers,
            public_venues,
        }
    }

    /// Resolve an optional requested venue name, applying the default when
    /// absent. Venue names are case-insensitive.
    pub fn resolve(&self, requested: Option<&str>) -> Result<ResolvedVenue, GatewayError> {
        let name = requested
            .map(str::to_lowercase)
            .unwrap_or_else(|| self.default_venue.clone());

        match self.venue_providers.get(&name) {
            Some(provider_id) => Ok(ResolvedVenue {
                public_name: name,
                provider_id: provider_id.clone(),
            }),
            None => Err(GatewayError::UnknownVenue {
                venue: name,
                available: self.public_venues.clone(),
            }),
        }
    }

    pub fn public_venues(&self) -> &[String] {
        &self.public_venues
    }

    pub fn default_venue(&self) -> &str {
        &self.default_venue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> VenueResolver {
        let mut config = VenueConfig::default();
        config
            .venue_providers
            .insert("okx".to_string(), "okx-gateway".to_string());
        VenueResolver::from_config(&config)
    }

    #[test]
    fn resolves_known_venue() {
        let resolved = resolver().resolve(Some("binance")).unwrap();
        assert_eq!(resolved.public_name, "binance");
        assert_eq!(resolved.provider_id, "binance");
    }

    #[test]
    fn venue_names_fold_case() {
        let resolved = resolver().resolve(Some("Binance")).unwrap();
        assert_eq!(resolved.public_name, "binance");
    }

    #[test]
    fn missing_venue_uses_default() {
        let resolved = resolver().resolve(None).unwrap();
        assert_eq!(resolved.public_name, "binance");
    }

    #[test]
    fn public_name_may_differ_from_provider_id() {
        let resolved = resolver().resolve(Some("okx")).unwrap();
        assert_eq!(resolved.provider_id, "okx-gateway");
    }

    #[test]
    fn unknown_venue_lists_available() {
        let err = resolver().resolve(Some("kraken")).unwrap_err();
        match err {
            GatewayError::UnknownVenue { venue, available } => {
                assert_eq!(venue, "kraken");
                assert!(available.contains(&"binance".to_string()));
                assert!(available.contains(&"okx".to_string()));
            }
            other => panic!("expected UnknownVenue, got {other:?}"),
        }
    }
}
