//! Configuration schema types
//!
//! This module defines the configuration structure for Conductor.

use crate::core::merge::GtfsExportVariant;
use crate::domain::ids::{ProviderId, Referential};
use crate::domain::provider::{DataFormat, Provider, TransformSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main Conductor configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConductorConfig {
    /// Application-level settings
    pub application: ApplicationConfig,

    /// Transform service connection and polling settings
    pub transform: TransformServiceConfig,

    /// Pipeline/merge settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Feed storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Registered providers
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConductorConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.transform.validate()?;
        self.pipeline.validate()?;

        let mut seen_ids = std::collections::HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !seen_ids.insert(provider.id) {
                return Err(format!("Duplicate provider id: {}", provider.id));
            }
        }
        Ok(())
    }

    /// Builds domain providers from the configured provider entries
    ///
    /// # Errors
    ///
    /// Returns an error if a provider entry is invalid.
    pub fn build_providers(&self) -> Result<Vec<Provider>, String> {
        self.providers.iter().map(|p| p.to_provider()).collect()
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (resolve the pipeline plan but submit nothing)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Transform service configuration
///
/// `max_retries` and `retry_delay_seconds` bound the poller: worst-case
/// wall-clock cost for one job is `max_retries * retry_delay_seconds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformServiceConfig {
    /// Base URL of the transform service
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Maximum number of status polls before a job is timed out
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between status polls, in seconds
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
}

impl TransformServiceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("transform.base_url cannot be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("transform.base_url must start with http:// or https://".to_string());
        }
        if self.max_retries == 0 {
            return Err("transform.max_retries must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Delay between status polls as a [`Duration`]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }
}

/// Pipeline and merge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory used for merge working directories
    #[serde(default = "default_working_directory")]
    pub working_directory: String,

    /// Name of the published merged feed
    #[serde(default = "default_merged_feed_name")]
    pub merged_feed_name: String,

    /// GTFS export variant used by the merge engine
    #[serde(default)]
    pub gtfs_export: GtfsExportVariant,

    /// Drop shape data from the merged feed
    #[serde(default)]
    pub remove_shapes: bool,
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        if self.working_directory.is_empty() {
            return Err("pipeline.working_directory cannot be empty".to_string());
        }
        if self.merged_feed_name.is_empty() {
            return Err("pipeline.merged_feed_name cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            working_directory: default_working_directory(),
            merged_feed_name: default_merged_feed_name(),
            gtfs_export: GtfsExportVariant::default(),
            remove_shapes: false,
        }
    }
}

/// Feed storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local feed store
    #[serde(default = "default_storage_root")]
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// One provider entry in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: i64,
    pub name: String,
    pub referential: String,
    pub organisation: String,
    pub user: String,
    #[serde(default)]
    pub object_id_prefix: String,
    pub data_format: DataFormat,
    #[serde(default)]
    pub enable_auto_validation: bool,
    #[serde(default)]
    pub enable_auto_import: bool,
    #[serde(default)]
    pub enable_clean_import: bool,
    #[serde(default)]
    pub enable_blocks_export: bool,
    #[serde(default)]
    pub allow_create_missing_stop_place: bool,
    #[serde(default)]
    pub migrate_data_to_provider: Option<i64>,
}

impl ProviderConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err(format!("Provider {} has an empty name", self.id));
        }
        Referential::new(&self.referential)
            .map_err(|e| format!("Provider {}: {e}", self.id))?;
        Ok(())
    }

    /// Converts this entry to a domain [`Provider`]
    pub fn to_provider(&self) -> Result<Provider, String> {
        Ok(Provider {
            id: ProviderId::new(self.id),
            name: self.name.clone(),
            transform: TransformSettings {
                referential: Referential::new(&self.referential)?,
                organisation: self.organisation.clone(),
                user: self.user.clone(),
                object_id_prefix: self.object_id_prefix.clone(),
                data_format: self.data_format,
                enable_auto_validation: self.enable_auto_validation,
                enable_auto_import: self.enable_auto_import,
                enable_clean_import: self.enable_clean_import,
                enable_blocks_export: self.enable_blocks_export,
                allow_create_missing_stop_place: self.allow_create_missing_stop_place,
                migrate_data_to_provider: self.migrate_data_to_provider.map(ProviderId::new),
            },
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to rotating local files
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for local log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation policy: "daily" or "hourly"
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    500
}

fn default_retry_delay_seconds() -> u64 {
    30
}

fn default_working_directory() -> String {
    "work".to_string()
}

fn default_merged_feed_name() -> String {
    "aggregated-gtfs.zip".to_string()
}

fn default_storage_root() -> String {
    "data".to_string()
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> ConductorConfig {
        ConductorConfig {
            application: ApplicationConfig::default(),
            transform: TransformServiceConfig {
                base_url: "http://transform.local".to_string(),
                timeout_seconds: default_timeout_seconds(),
                max_retries: default_max_retries(),
                retry_delay_seconds: default_retry_delay_seconds(),
            },
            pipeline: PipelineConfig::default(),
            storage: StorageConfig::default(),
            providers: vec![],
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_minimal_config_is_valid() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = minimal_config();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_scheme_required() {
        let mut config = minimal_config();
        config.transform.base_url = "transform.local".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_retries_rejected() {
        let mut config = minimal_config();
        config.transform.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_delay_conversion() {
        let config = minimal_config();
        assert_eq!(config.transform.retry_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_duplicate_provider_ids_rejected() {
        let mut config = minimal_config();
        let provider = ProviderConfig {
            id: 1,
            name: "p".to_string(),
            referential: "tst".to_string(),
            organisation: "org".to_string(),
            user: "user".to_string(),
            object_id_prefix: "tst".to_string(),
            data_format: DataFormat::Gtfs,
            enable_auto_validation: false,
            enable_auto_import: false,
            enable_clean_import: false,
            enable_blocks_export: false,
            allow_create_missing_stop_place: false,
            migrate_data_to_provider: None,
        };
        config.providers = vec![provider.clone(), provider];
        assert!(config.validate().is_err());
    }
}
