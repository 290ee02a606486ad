//! Job poller / retry loop
//!
//! The transform service has no push notification: the only way to learn a
//! job's fate is to poll its status URL. The poller does so with a fixed
//! delay and a hard retry ceiling, which bounds the worst-case wall-clock
//! cost of a job at `max_retries * retry_delay` and guarantees the loop
//! always terminates.

use crate::adapters::transform::{JobStatusResponse, TransformClient};
use crate::config::TransformServiceConfig;
use crate::core::events::EventSink;
use crate::domain::event::{EventAction, EventDomain, EventState, JobEvent};
use crate::domain::job::{Job, JobStatus};
use crate::domain::Result;
use chrono::Utc;
use std::time::Duration;

/// Poller tuning
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Maximum number of status polls before the job is timed out
    pub max_retries: u32,

    /// Fixed delay between polls
    pub retry_delay: Duration,
}

impl PollerConfig {
    /// Extracts the poller settings from the transform service config
    pub fn from_config(config: &TransformServiceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }
}

/// How a poll loop ended
#[derive(Debug)]
pub enum PollOutcome {
    /// The job reached TERMINATED; the classifier decides what it means
    Completed(JobStatusResponse),

    /// The job was canceled or aborted by the service
    Failed(JobStatus),

    /// The retry budget ran out while the job was still in flight
    TimedOut,
}

/// Polls one job until a terminal state or retry exhaustion
pub struct JobPoller<'a> {
    client: &'a TransformClient,
    config: PollerConfig,
    sink: &'a dyn EventSink,
}

impl<'a> JobPoller<'a> {
    /// Creates a poller
    pub fn new(client: &'a TransformClient, config: PollerConfig, sink: &'a dyn EventSink) -> Self {
        Self {
            client,
            config,
            sink,
        }
    }

    /// Runs the poll loop for a job
    ///
    /// Emits one `STARTED` event on the first transition into STARTED
    /// (repeated STARTED polls do not re-emit), and exactly one terminal
    /// event on the `Failed`/`TimedOut` paths. The `Completed` path emits
    /// nothing; the classifier owns that job's terminal event.
    ///
    /// # Errors
    ///
    /// A transport error while polling emits a `FAILED` event and surfaces
    /// the underlying error; polling retries are about waiting for
    /// completion, not about recovering from transport failures.
    pub async fn poll(
        &self,
        job: &mut Job,
        domain: EventDomain,
        action: EventAction,
    ) -> Result<PollOutcome> {
        let mut started_emitted = false;

        loop {
            let response = match self.client.job_status(&job.status_url).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        status_url = %job.status_url,
                        error = %e,
                        "Failed to poll job status"
                    );
                    self.emit(job, domain, action, EventState::Failed);
                    return Err(e);
                }
            };

            job.retries += 1;
            job.status = response.status;

            tracing::debug!(
                status = %response.status,
                retries = job.retries,
                "Polled job status"
            );

            match response.status {
                JobStatus::Terminated => {
                    return Ok(PollOutcome::Completed(response));
                }
                JobStatus::Canceled | JobStatus::Aborted => {
                    tracing::warn!(
                        status = %response.status,
                        "Job ended in state {}. Stopping.",
                        response.status
                    );
                    self.emit(job, domain, action, EventState::Failed);
                    return Ok(PollOutcome::Failed(response.status));
                }
                JobStatus::Scheduled | JobStatus::Started => {
                    if response.status == JobStatus::Started && !started_emitted {
                        started_emitted = true;
                        job.started_at.get_or_insert_with(Utc::now);
                        self.emit(job, domain, action, EventState::Started);
                    }

                    if job.retries >= self.config.max_retries {
                        tracing::warn!(
                            status = %response.status,
                            retries = job.retries,
                            "Timed out with state {}. Config should probably be tweaked. Stopping.",
                            response.status
                        );
                        self.emit(job, domain, action, EventState::Timeout);
                        return Ok(PollOutcome::TimedOut);
                    }

                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    fn emit(&self, job: &Job, domain: EventDomain, action: EventAction, state: EventState) {
        self.sink.emit(JobEvent::new(
            domain,
            action,
            state,
            job.correlation_id.clone(),
            job.provider_id,
        ));
    }
}
