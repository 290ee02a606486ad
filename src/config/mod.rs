//! Configuration management
//!
//! TOML configuration with `${VAR}` substitution and `CONDUCTOR_*`
//! environment variable overrides.

pub mod loader;
pub mod schema;

// Re-export commonly used items
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, ConductorConfig, LoggingConfig, PipelineConfig, ProviderConfig,
    StorageConfig, TransformServiceConfig,
};
