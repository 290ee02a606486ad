//! Pipeline sequencer
//!
//! Chains the stages of a provider's pipeline: Import → Validate → Export →
//! Transfer → Merge → GraphBuild. Stages within one provider run strictly
//! sequentially; at most one job per (provider, stage) may be active at a
//! time, enforced by the active-stage registry. A stage that fails or times
//! out halts the provider's run; retry, if any, is an operator-triggered
//! resubmission.

use crate::adapters::graph::GraphBuilder;
use crate::adapters::storage::FeedStore;
use crate::adapters::transform::parameters::{
    self, GtfsExportParameters, GtfsImportParameters, NetexImportParameters,
    TransferExportParameters, ValidationParameters,
};
use crate::adapters::transform::{ExportFormat, JobStatusResponse, SubmitTarget, TransformClient};
use crate::config::PipelineConfig;
use crate::core::events::EventSink;
use crate::core::merge::{is_zip_file, zip_directory, GtfsMerger};
use crate::core::pipeline::classifier::{Classification, ResultClassifier};
use crate::core::pipeline::poller::{JobPoller, PollOutcome, PollerConfig};
use crate::domain::event::{EventAction, EventDomain, EventState, JobEvent};
use crate::domain::job::{Job, JobKind};
use crate::domain::provider::{DataFormat, Provider, ProviderRepository};
use crate::domain::{ConductorError, CorrelationId, MergeError, ProviderId, Result};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One phase of a provider's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Import,
    Validate,
    Export,
    Transfer,
    Merge,
    GraphBuild,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Import => "IMPORT",
            Stage::Validate => "VALIDATE",
            Stage::Export => "EXPORT",
            Stage::Transfer => "TRANSFER",
            Stage::Merge => "MERGE",
            Stage::GraphBuild => "GRAPH_BUILD",
        };
        write!(f, "{name}")
    }
}

/// Computes the stage order for a provider
///
/// Validation runs only when auto-validation is enabled; the transfer stage
/// runs only for providers with a migration target.
pub fn planned_stages(provider: &Provider) -> Vec<Stage> {
    let mut stages = vec![Stage::Import];
    if provider.transform.enable_auto_validation {
        stages.push(Stage::Validate);
    }
    stages.push(Stage::Export);
    if provider.transform.migrate_data_to_provider.is_some() {
        stages.push(Stage::Transfer);
    }
    stages.push(Stage::Merge);
    stages.push(Stage::GraphBuild);
    stages
}

/// How a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// All stages completed
    Completed,
    /// The run halted at the given stage
    Halted(Stage),
}

/// Drives a provider's feed through the pipeline stages
pub struct PipelineSequencer {
    client: Arc<TransformClient>,
    providers: Arc<ProviderRepository>,
    store: Arc<dyn FeedStore>,
    graph_builder: Arc<dyn GraphBuilder>,
    sink: Arc<dyn EventSink>,
    poller_config: PollerConfig,
    pipeline_config: PipelineConfig,
    active: Mutex<HashSet<(ProviderId, Stage)>>,
}

impl PipelineSequencer {
    /// Creates a sequencer
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<TransformClient>,
        providers: Arc<ProviderRepository>,
        store: Arc<dyn FeedStore>,
        graph_builder: Arc<dyn GraphBuilder>,
        sink: Arc<dyn EventSink>,
        poller_config: PollerConfig,
        pipeline_config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            providers,
            store,
            graph_builder,
            sink,
            poller_config,
            pipeline_config,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Runs the full pipeline for one provider delivery
    ///
    /// # Errors
    ///
    /// Returns an error for configuration-level problems: an unknown
    /// provider, a stage already active for this provider, or a sibling-job
    /// check that never settles. Job failures and timeouts are not errors;
    /// they end the run with [`PipelineOutcome::Halted`] after the job's
    /// terminal event has been emitted.
    pub async fn run(&self, provider_id: ProviderId, file_name: &str) -> Result<PipelineOutcome> {
        let provider = self.providers.provider(provider_id)?.clone();
        let correlation_id = CorrelationId::new();

        tracing::info!(
            provider = %provider.name,
            file_name,
            correlation_id = %correlation_id,
            "Starting pipeline run"
        );

        let mut merged_feed: Option<PathBuf> = None;

        for stage in planned_stages(&provider) {
            let _guard = self.claim(provider_id, stage)?;

            let advanced = match stage {
                Stage::Import | Stage::Validate | Stage::Export | Stage::Transfer => {
                    self.run_transform_stage(&provider, stage, file_name, &correlation_id)
                        .await?
                }
                Stage::Merge => {
                    match self.run_merge_stage(&provider, &correlation_id).await? {
                        Some(published) => {
                            merged_feed = Some(published);
                            true
                        }
                        None => false,
                    }
                }
                Stage::GraphBuild => {
                    let feed = merged_feed.as_deref().ok_or_else(|| {
                        ConductorError::Pipeline(
                            "Graph build reached without a merged feed".to_string(),
                        )
                    })?;
                    self.run_graph_stage(&provider, feed, &correlation_id).await
                }
            };

            if !advanced {
                tracing::warn!(
                    provider = %provider.name,
                    stage = %stage,
                    "Pipeline run halted"
                );
                return Ok(PipelineOutcome::Halted(stage));
            }
        }

        tracing::info!(provider = %provider.name, "Pipeline run completed");
        Ok(PipelineOutcome::Completed)
    }

    /// Runs the pipeline for several provider deliveries concurrently
    ///
    /// Provider pipelines are independent of each other; stages are
    /// sequential only within one provider. Results are returned in input
    /// order.
    pub async fn run_all(
        &self,
        deliveries: &[(ProviderId, String)],
    ) -> Vec<(ProviderId, Result<PipelineOutcome>)> {
        let runs = deliveries.iter().map(|(provider_id, file_name)| async move {
            (*provider_id, self.run(*provider_id, file_name).await)
        });
        futures::future::join_all(runs).await
    }

    /// Runs one external transform-service stage
    ///
    /// Returns `true` when the pipeline may advance to the next stage.
    async fn run_transform_stage(
        &self,
        provider: &Provider,
        stage: Stage,
        file_name: &str,
        correlation_id: &CorrelationId,
    ) -> Result<bool> {
        let (kind, action) = self.transform_descriptor(provider, stage);
        let domain = EventDomain::Timetable;

        tracing::info!(
            provider = %provider.name,
            stage = %stage,
            "Starting transform stage"
        );
        self.emit(provider, domain, action, EventState::Pending, correlation_id);

        let submission = match self.build_submission(provider, stage, file_name).await {
            Ok(submission) => submission,
            Err(e) => {
                tracing::error!(stage = %stage, error = %e, "Failed to prepare submission");
                self.emit(provider, domain, action, EventState::Failed, correlation_id);
                return Ok(false);
            }
        };

        let status_url = match self
            .client
            .submit_job(
                &provider.transform.referential,
                submission.target,
                &submission.parameters_json,
                submission.feed,
            )
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(stage = %stage, error = %e, "Job submission failed");
                self.emit(provider, domain, action, EventState::Failed, correlation_id);
                return Ok(false);
            }
        };

        let mut job = Job::new(kind, provider.id, correlation_id.clone(), status_url);

        let poller = JobPoller::new(&self.client, self.poller_config.clone(), self.sink.as_ref());
        let outcome = match poller.poll(&mut job, domain, action).await {
            Ok(outcome) => outcome,
            // Terminal FAILED event already emitted by the poller
            Err(e) => {
                tracing::error!(stage = %stage, error = %e, "Polling failed");
                return Ok(false);
            }
        };

        let status = match outcome {
            PollOutcome::Completed(status) => status,
            PollOutcome::Failed(_) | PollOutcome::TimedOut => return Ok(false),
        };

        let classifier = ResultClassifier::new(&self.client, self.sink.as_ref());
        let classification = match classifier.classify(&job, &status, domain, action).await {
            Ok(classification) => classification,
            // Terminal FAILED event already emitted by the classifier
            Err(e) => {
                tracing::error!(stage = %stage, error = %e, "Classification failed");
                return Ok(false);
            }
        };

        if classification == Classification::Halt {
            return Ok(false);
        }

        if stage == Stage::Export {
            self.store_export(provider, &status).await?;
        }

        // The external service may batch several files into sibling jobs;
        // advancing past import or validation while those are in flight
        // would race the merge against them.
        if matches!(stage, Stage::Import | Stage::Validate) {
            self.await_referential_idle(provider).await?;
        }

        Ok(true)
    }

    /// Maps a transform stage to its job kind and event action
    fn transform_descriptor(&self, provider: &Provider, stage: Stage) -> (JobKind, EventAction) {
        match stage {
            Stage::Import => (JobKind::Import, EventAction::Import),
            Stage::Validate => {
                let action = if provider.transform.migrate_data_to_provider.is_some() {
                    EventAction::ValidationLevel1
                } else {
                    EventAction::ValidationLevel2
                };
                (JobKind::Validate, action)
            }
            Stage::Export => (JobKind::Export, EventAction::Export),
            Stage::Transfer => (JobKind::Transfer, EventAction::DataspaceTransfer),
            Stage::Merge | Stage::GraphBuild => {
                unreachable!("{stage} is not a transform-service stage")
            }
        }
    }

    /// Builds the endpoint, parameter document and feed part for a stage
    async fn build_submission(
        &self,
        provider: &Provider,
        stage: Stage,
        file_name: &str,
    ) -> Result<Submission> {
        match stage {
            Stage::Import => {
                let bytes = self.store.fetch(file_name).await?;
                let parameters_json = match provider.transform.data_format {
                    DataFormat::Gtfs => {
                        parameters::to_json(&GtfsImportParameters::new(file_name, provider))?
                    }
                    DataFormat::Netex => {
                        parameters::to_json(&NetexImportParameters::new(file_name, provider))?
                    }
                };
                Ok(Submission {
                    target: SubmitTarget::Importer(provider.transform.data_format),
                    parameters_json,
                    feed: Some((file_name.to_string(), bytes)),
                })
            }
            Stage::Validate => Ok(Submission {
                target: SubmitTarget::Validator,
                parameters_json: parameters::to_json(&ValidationParameters::new(
                    "validation",
                    provider,
                ))?,
                feed: None,
            }),
            Stage::Export => Ok(Submission {
                target: SubmitTarget::Exporter(ExportFormat::Gtfs),
                parameters_json: parameters::to_json(&GtfsExportParameters::new(
                    "export", provider,
                ))?,
                feed: None,
            }),
            Stage::Transfer => {
                let target_id = provider.transform.migrate_data_to_provider.ok_or_else(|| {
                    ConductorError::Pipeline(format!(
                        "Transfer stage for provider {} without a migration target",
                        provider.id
                    ))
                })?;
                let destination = self.providers.provider(target_id)?;
                Ok(Submission {
                    target: SubmitTarget::Exporter(ExportFormat::Transfer),
                    parameters_json: parameters::to_json(&TransferExportParameters::new(
                        "transfer",
                        provider,
                        destination.transform.referential.as_str(),
                    ))?,
                    feed: None,
                })
            }
            Stage::Merge | Stage::GraphBuild => {
                unreachable!("{stage} is not a transform-service stage")
            }
        }
    }

    /// Downloads a finished export and stages it for merging
    async fn store_export(&self, provider: &Provider, status: &JobStatusResponse) -> Result<()> {
        let href = status.link("data").ok_or_else(|| {
            ConductorError::Pipeline(format!(
                "Export job for {} returned no data link",
                provider.transform.referential
            ))
        })?;
        let bytes = self.client.download(href).await?;
        let name = format!("{}-gtfs.zip", provider.transform.referential);
        self.store.store_export(&name, bytes).await
    }

    /// Waits until no sibling jobs remain in flight in the referential
    ///
    /// Re-lists with the poller's delay and budget, so this wait is bounded
    /// the same way the poll loop is.
    async fn await_referential_idle(&self, provider: &Provider) -> Result<()> {
        let referential = &provider.transform.referential;
        let mut attempts: u32 = 0;

        loop {
            let jobs = self.client.jobs(referential, None).await?;
            let in_flight = jobs.iter().filter(|job| job.status.is_in_flight()).count();
            if in_flight == 0 {
                tracing::debug!(referential = %referential, "No sibling jobs in flight");
                return Ok(());
            }

            attempts += 1;
            if attempts >= self.poller_config.max_retries {
                return Err(ConductorError::Pipeline(format!(
                    "{in_flight} sibling jobs still in flight in referential {referential} after {attempts} checks"
                )));
            }

            tracing::info!(
                referential = %referential,
                in_flight,
                "Waiting for sibling jobs before advancing"
            );
            tokio::time::sleep(self.poller_config.retry_delay).await;
        }
    }

    /// Runs the merge stage, returning the published feed on success
    async fn run_merge_stage(
        &self,
        provider: &Provider,
        correlation_id: &CorrelationId,
    ) -> Result<Option<PathBuf>> {
        let domain = EventDomain::Timetable;
        let action = EventAction::ExportGtfsMerged;

        tracing::info!(provider = %provider.name, "Starting merge stage");
        self.emit(provider, domain, action, EventState::Pending, correlation_id);

        let archives = match self.store.exports().await {
            Ok(archives) => archives,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list export archives");
                self.emit(provider, domain, action, EventState::Failed, correlation_id);
                return Ok(None);
            }
        };

        if archives.is_empty() {
            tracing::warn!("No export archives available to merge");
            self.emit(provider, domain, action, EventState::Failed, correlation_id);
            return Ok(None);
        }

        let work_dir = PathBuf::from(&self.pipeline_config.working_directory)
            .join(format!("merge-{correlation_id}"));

        let merged = match self.merge_archives(&archives, &work_dir) {
            Ok(merged) => merged,
            Err(e) => {
                tracing::error!(error = %e, "Merge failed");
                let _ = std::fs::remove_dir_all(&work_dir);
                self.emit(provider, domain, action, EventState::Failed, correlation_id);
                return Ok(None);
            }
        };

        let published = match self
            .store
            .publish(&merged, &self.pipeline_config.merged_feed_name)
            .await
        {
            Ok(published) => published,
            Err(e) => {
                tracing::error!(error = %e, "Failed to publish merged feed");
                let _ = std::fs::remove_dir_all(&work_dir);
                let _ = std::fs::remove_file(&merged);
                self.emit(provider, domain, action, EventState::Failed, correlation_id);
                return Ok(None);
            }
        };

        let _ = std::fs::remove_dir_all(&work_dir);
        let _ = std::fs::remove_file(&merged);

        self.emit(provider, domain, action, EventState::Ok, correlation_id);
        Ok(Some(published))
    }

    /// Merges the archives into a fresh working directory and zips the
    /// result next to it
    fn merge_archives(
        &self,
        archives: &[PathBuf],
        work_dir: &Path,
    ) -> std::result::Result<PathBuf, MergeError> {
        std::fs::create_dir_all(work_dir)?;

        let mut merger = GtfsMerger::new(
            work_dir,
            self.pipeline_config.gtfs_export,
            self.pipeline_config.remove_shapes,
        );

        for archive in archives {
            let mut head = [0u8; 4];
            let read = std::fs::File::open(archive)?.read(&mut head)?;
            if !is_zip_file(&head[..read]) {
                return Err(MergeError::Archive(format!(
                    "{} is not a zip archive",
                    archive.display()
                )));
            }
            merger.append_feed(archive)?;
        }

        tracing::info!(
            archives = archives.len(),
            stops = merger.unique_stop_count(),
            transfers = merger.unique_transfer_count(),
            "Merged export archives"
        );

        let target = work_dir.with_extension("zip");
        zip_directory(work_dir, &target)?;
        Ok(target)
    }

    /// Runs the graph-build stage
    async fn run_graph_stage(
        &self,
        provider: &Provider,
        merged_feed: &Path,
        correlation_id: &CorrelationId,
    ) -> bool {
        let domain = EventDomain::Graph;
        let action = EventAction::BuildGraph;

        tracing::info!(merged_feed = %merged_feed.display(), "Starting graph build");
        self.emit(provider, domain, action, EventState::Pending, correlation_id);

        match self.graph_builder.build_graph(merged_feed, correlation_id).await {
            Ok(()) => {
                self.emit(provider, domain, action, EventState::Ok, correlation_id);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Graph build failed");
                self.emit(provider, domain, action, EventState::Failed, correlation_id);
                false
            }
        }
    }

    /// Claims a (provider, stage) slot, refusing if one is already active
    fn claim(&self, provider_id: ProviderId, stage: Stage) -> Result<StageGuard<'_>> {
        let mut active = self.active.lock().expect("active stage registry poisoned");
        if !active.insert((provider_id, stage)) {
            return Err(ConductorError::Pipeline(format!(
                "A {stage} job is already active for provider {provider_id}"
            )));
        }
        Ok(StageGuard {
            active: &self.active,
            key: (provider_id, stage),
        })
    }

    fn emit(
        &self,
        provider: &Provider,
        domain: EventDomain,
        action: EventAction,
        state: EventState,
        correlation_id: &CorrelationId,
    ) {
        self.sink.emit(JobEvent::new(
            domain,
            action,
            state,
            correlation_id.clone(),
            provider.id,
        ));
    }
}

/// Endpoint, parameters and optional feed part of one submission
struct Submission {
    target: SubmitTarget,
    parameters_json: String,
    feed: Option<(String, Vec<u8>)>,
}

/// Releases the (provider, stage) slot when the stage ends
#[derive(Debug)]
struct StageGuard<'a> {
    active: &'a Mutex<HashSet<(ProviderId, Stage)>>,
    key: (ProviderId, Stage),
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.active
            .lock()
            .expect("active stage registry poisoned")
            .remove(&self.key);
    }
}
