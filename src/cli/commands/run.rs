//! Run command implementation
//!
//! Drives one provider delivery through the full pipeline.

use crate::adapters::graph::LogGraphBuilder;
use crate::adapters::storage::LocalFeedStore;
use crate::adapters::transform::TransformClient;
use crate::config::load_config;
use crate::core::events::TracingEventSink;
use crate::core::pipeline::{planned_stages, PipelineOutcome, PipelineSequencer, PollerConfig};
use crate::domain::{ProviderId, ProviderRepository};
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Id of the provider whose delivery is processed
    #[arg(short, long)]
    pub provider: i64,

    /// Name of the inbound file to process
    #[arg(short, long)]
    pub file: String,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;

        let providers = ProviderRepository::new(
            config
                .build_providers()
                .map_err(|e| anyhow::anyhow!("Invalid provider configuration: {e}"))?,
        )?;

        let provider_id = ProviderId::new(self.provider);
        let provider = providers.provider(provider_id)?.clone();

        if config.application.dry_run {
            println!("🔍 Dry run - planned stages for provider {}:", provider.name);
            for stage in planned_stages(&provider) {
                println!("  - {stage}");
            }
            return Ok(0);
        }

        let sequencer = PipelineSequencer::new(
            Arc::new(TransformClient::new(&config.transform)?),
            Arc::new(providers),
            Arc::new(LocalFeedStore::new(&config.storage.root)),
            Arc::new(LogGraphBuilder),
            Arc::new(TracingEventSink),
            PollerConfig::from_config(&config.transform),
            config.pipeline.clone(),
        );

        // A shutdown abandons the in-memory poll loop; recovery is an
        // idempotent resubmission by the operator.
        tokio::select! {
            outcome = sequencer.run(provider_id, &self.file) => {
                match outcome? {
                    PipelineOutcome::Completed => {
                        println!("✅ Pipeline completed for provider {}", provider.name);
                        Ok(0)
                    }
                    PipelineOutcome::Halted(stage) => {
                        println!("❌ Pipeline halted at stage {stage} for provider {}", provider.name);
                        Ok(1)
                    }
                }
            }
            _ = shutdown_signal.changed() => {
                tracing::warn!("Shutdown requested, abandoning in-flight pipeline run");
                println!("⚠️  Shutdown requested, abandoning pipeline run");
                Ok(130)
            }
        }
    }
}
