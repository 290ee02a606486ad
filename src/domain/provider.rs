//! Provider model
//!
//! A provider is a tenant whose transit data moves through the pipeline.
//! Providers are immutable during a pipeline run and looked up by id before
//! each stage.

use crate::domain::errors::ConductorError;
use crate::domain::ids::{ProviderId, Referential};
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Raw data format a provider delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Gtfs,
    Netex,
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataFormat::Gtfs => "gtfs",
            DataFormat::Netex => "netex",
        };
        write!(f, "{name}")
    }
}

/// Transform-service settings for a provider
///
/// These mirror the provider's registration in the transform service:
/// which data-space it writes to, who the submissions run as, and which
/// pipeline behaviors are enabled for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSettings {
    /// Isolated data-space identifier within the transform service
    pub referential: Referential,

    /// Organisation name passed in job parameter documents
    pub organisation: String,

    /// User name passed in job parameter documents
    pub user: String,

    /// Prefix for object ids created during import
    pub object_id_prefix: String,

    /// Format of the provider's raw deliveries
    pub data_format: DataFormat,

    /// Run a validation stage automatically after import
    pub enable_auto_validation: bool,

    /// Import deliveries automatically when they arrive
    pub enable_auto_import: bool,

    /// Wipe the referential before importing
    pub enable_clean_import: bool,

    /// Include block data in exports
    pub enable_blocks_export: bool,

    /// Allow the import to create stop places missing from the registry
    pub allow_create_missing_stop_place: bool,

    /// Data-space to transfer data to once this provider's space is valid.
    /// Providers with a migration target validate at level 1, the rest at
    /// level 2.
    pub migrate_data_to_provider: Option<ProviderId>,
}

/// A data provider (tenant)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub transform: TransformSettings,
}

/// In-memory provider registry
///
/// Providers are loaded once from configuration and read-only afterwards.
#[derive(Debug, Default)]
pub struct ProviderRepository {
    providers: HashMap<ProviderId, Provider>,
}

impl ProviderRepository {
    /// Builds a repository from a list of providers
    ///
    /// # Errors
    ///
    /// Returns an error if two providers share an id.
    pub fn new(providers: Vec<Provider>) -> Result<Self> {
        let mut map = HashMap::with_capacity(providers.len());
        for provider in providers {
            if let Some(previous) = map.insert(provider.id, provider) {
                return Err(ConductorError::Provider(format!(
                    "Duplicate provider id: {}",
                    previous.id
                )));
            }
        }
        Ok(Self { providers: map })
    }

    /// Looks up a provider by id
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unknown.
    pub fn provider(&self, id: ProviderId) -> Result<&Provider> {
        self.providers
            .get(&id)
            .ok_or_else(|| ConductorError::Provider(format!("Unknown provider: {id}")))
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when no providers are registered
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider(id: i64) -> Provider {
        Provider {
            id: ProviderId::new(id),
            name: format!("provider-{id}"),
            transform: TransformSettings {
                referential: Referential::new("tst").unwrap(),
                organisation: "TestOrg".to_string(),
                user: "test-user".to_string(),
                object_id_prefix: "tst".to_string(),
                data_format: DataFormat::Gtfs,
                enable_auto_validation: true,
                enable_auto_import: true,
                enable_clean_import: false,
                enable_blocks_export: false,
                allow_create_missing_stop_place: false,
                migrate_data_to_provider: None,
            },
        }
    }

    #[test]
    fn test_repository_lookup() {
        let repository = ProviderRepository::new(vec![test_provider(1), test_provider(2)]).unwrap();
        assert_eq!(repository.len(), 2);
        assert_eq!(
            repository.provider(ProviderId::new(1)).unwrap().name,
            "provider-1"
        );
    }

    #[test]
    fn test_repository_unknown_provider() {
        let repository = ProviderRepository::new(vec![test_provider(1)]).unwrap();
        let err = repository.provider(ProviderId::new(99)).unwrap_err();
        assert!(matches!(err, ConductorError::Provider(_)));
    }

    #[test]
    fn test_repository_rejects_duplicate_ids() {
        let result = ProviderRepository::new(vec![test_provider(1), test_provider(1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_data_format_deserializes_lowercase() {
        let format: DataFormat = serde_json::from_str("\"netex\"").unwrap();
        assert_eq!(format, DataFormat::Netex);
    }
}
