//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Conductor configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(config) => {
                println!("✅ Configuration file loaded successfully");
                config
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Transform Service: {}", config.transform.base_url);
        println!("  Max Retries: {}", config.transform.max_retries);
        println!("  Retry Delay: {}s", config.transform.retry_delay_seconds);
        println!("  GTFS Export: {:?}", config.pipeline.gtfs_export);
        println!("  Merged Feed: {}", config.pipeline.merged_feed_name);
        println!("  Storage Root: {}", config.storage.root);
        println!("  Providers: {}", config.providers.len());
        for provider in &config.providers {
            println!(
                "    - {} (id {}, referential {}, {})",
                provider.name, provider.id, provider.referential, provider.data_format
            );
        }
        println!();
        Ok(0)
    }
}
