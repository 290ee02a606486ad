//! Init command implementation
//!
//! Writes a starter configuration file.

use clap::Args;
use std::path::Path;

const SAMPLE_CONFIG: &str = r#"# Conductor configuration

[application]
log_level = "info"
dry_run = false

[transform]
base_url = "http://transform.local"
timeout_seconds = 30
# Worst-case wait per job = max_retries * retry_delay_seconds
max_retries = 500
retry_delay_seconds = 30

[pipeline]
working_directory = "work"
merged_feed_name = "aggregated-gtfs.zip"
# extended, basic or google
gtfs_export = "extended"
remove_shapes = false

[storage]
root = "data"

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"

[[providers]]
id = 2
name = "example"
referential = "example"
organisation = "Example Transit"
user = "pipeline"
object_id_prefix = "exa"
data_format = "gtfs"
enable_auto_validation = true
enable_auto_import = true
enable_clean_import = false
enable_blocks_export = false
allow_create_missing_stop_place = false
# migrate_data_to_provider = 12
"#;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let path = Path::new(config_path);

        if path.exists() && !self.force {
            println!("❌ {config_path} already exists. Use --force to overwrite.");
            return Ok(1);
        }

        std::fs::write(path, SAMPLE_CONFIG)?;
        println!("✅ Wrote starter configuration to {config_path}");
        println!("   Edit the transform service URL and provider entries before running.");
        Ok(0)
    }
}
