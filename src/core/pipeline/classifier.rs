//! Result classifier
//!
//! Once a job reaches TERMINATED the poller hands off here. The classifier
//! follows the job's `action_report` link, reads the result code and
//! decides whether the pipeline advances. Anything other than exactly
//! `"OK"` is a failure: the default is fail-closed, never fail-open.

use crate::adapters::transform::{JobStatusResponse, TransformClient};
use crate::core::events::EventSink;
use crate::domain::event::{EventAction, EventDomain, EventState, JobEvent};
use crate::domain::job::Job;
use crate::domain::{Result, TransformError};

/// Decision taken after reading the action report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The job succeeded; the sequencer may trigger the next stage
    Advance,

    /// The job failed; the provider's pipeline run halts here
    Halt,
}

/// Classifies terminated jobs by their action report
pub struct ResultClassifier<'a> {
    client: &'a TransformClient,
    sink: &'a dyn EventSink,
}

impl<'a> ResultClassifier<'a> {
    /// Creates a classifier
    pub fn new(client: &'a TransformClient, sink: &'a dyn EventSink) -> Self {
        Self { client, sink }
    }

    /// Fetches and interprets the action report of a terminated job
    ///
    /// Emits the job's terminal event: `OK` on result `"OK"`, `FAILED` on
    /// `"NOK"`, on unrecognized/absent results, and on a missing report
    /// link.
    ///
    /// # Errors
    ///
    /// A missing report link or a transport error while fetching the
    /// report emits `FAILED` and surfaces the underlying error.
    pub async fn classify(
        &self,
        job: &Job,
        status: &JobStatusResponse,
        domain: EventDomain,
        action: EventAction,
    ) -> Result<Classification> {
        let report_url = match status.link("action_report") {
            Some(url) => url,
            None => {
                tracing::error!(
                    status_url = %job.status_url,
                    "No URL found for action report"
                );
                self.emit(job, domain, action, EventState::Failed);
                return Err(TransformError::MissingActionReport(format!(
                    "job status at {} carries no action_report link",
                    job.status_url
                ))
                .into());
            }
        };

        tracing::debug!(report_url = %report_url, "Fetching action report");

        let report = match self.client.action_report(report_url).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(
                    report_url = %report_url,
                    error = %e,
                    "Failed to fetch action report"
                );
                self.emit(job, domain, action, EventState::Failed);
                return Err(e);
            }
        };

        match report.result() {
            Some("OK") => {
                tracing::info!(action = %action, "Job ok, triggering next stage");
                self.emit(job, domain, action, EventState::Ok);
                Ok(Classification::Advance)
            }
            Some("NOK") => {
                tracing::warn!(action = %action, "Job not ok");
                self.emit(job, domain, action, EventState::Failed);
                Ok(Classification::Halt)
            }
            other => {
                tracing::warn!(
                    action = %action,
                    result = ?other,
                    "Unrecognized action report result"
                );
                self.emit(job, domain, action, EventState::Failed);
                Ok(Classification::Halt)
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
