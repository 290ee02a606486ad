//! Merge command implementation
//!
//! Merges GTFS archives into a single deduplicated archive without going
//! through the transform service.

use crate::core::merge::{zip_directory, GtfsExportVariant, GtfsMerger};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the merge command
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// GTFS archives to merge, in order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Path of the merged archive to write
    #[arg(short, long, default_value = "merged-gtfs.zip")]
    pub output: PathBuf,

    /// Export variant: extended, basic or google
    #[arg(long, default_value = "extended")]
    pub export: String,

    /// Drop shape data from the merged output
    #[arg(long)]
    pub remove_shapes: bool,
}

impl MergeArgs {
    /// Execute the merge command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let variant = match self.export.as_str() {
            "extended" => GtfsExportVariant::Extended,
            "basic" => GtfsExportVariant::Basic,
            "google" => GtfsExportVariant::Google,
            other => {
                println!("❌ Unknown export variant '{other}'. Use extended, basic or google.");
                return Ok(2);
            }
        };

        let work_dir =
            std::env::temp_dir().join(format!("conductor-merge-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&work_dir)?;

        let mut merger = GtfsMerger::new(&work_dir, variant, self.remove_shapes);

        for input in &self.inputs {
            println!("📦 Merging {}", input.display());
            if let Err(e) = merger.append_feed(input) {
                println!("❌ Failed to merge {}: {e}", input.display());
                let _ = std::fs::remove_dir_all(&work_dir);
                return Ok(1);
            }
        }

        if let Err(e) = zip_directory(&work_dir, &self.output) {
            println!("❌ Failed to write {}: {e}", self.output.display());
            let _ = std::fs::remove_dir_all(&work_dir);
            return Ok(1);
        }
        let _ = std::fs::remove_dir_all(&work_dir);

        println!(
            "✅ Merged {} archives into {} ({} stops, {} transfer rows)",
            self.inputs.len(),
            self.output.display(),
            merger.unique_stop_count(),
            merger.unique_transfer_count()
        );
        Ok(0)
    }
}
