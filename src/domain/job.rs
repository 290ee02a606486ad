//! Job model
//!
//! A [`Job`] represents one invocation of the external transform service.
//! It is created when a submission succeeds, mutated only by the poller
//! (retry counter, externally-reported status), and discarded once a
//! terminal event has been emitted — the engine keeps no job history.

use crate::domain::ids::{CorrelationId, ProviderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work the transform service is asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Import,
    Validate,
    Export,
    Transfer,
    GraphBuild,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::Import => "IMPORT",
            JobKind::Validate => "VALIDATE",
            JobKind::Export => "EXPORT",
            JobKind::Transfer => "TRANSFER",
            JobKind::GraphBuild => "GRAPH_BUILD",
        };
        write!(f, "{name}")
    }
}

/// Externally-reported status of a transform-service job
///
/// `Scheduled` and `Started` are in-flight; the rest are terminal on the
/// service side. The poller additionally synthesizes a TIMEOUT outcome when
/// its retry budget runs out while the job is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Scheduled,
    Started,
    Terminated,
    Canceled,
    Aborted,
}

impl JobStatus {
    /// True while the external service is still working on the job
    pub fn is_in_flight(&self) -> bool {
        matches!(self, JobStatus::Scheduled | JobStatus::Started)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Scheduled => "SCHEDULED",
            JobStatus::Started => "STARTED",
            JobStatus::Terminated => "TERMINATED",
            JobStatus::Canceled => "CANCELED",
            JobStatus::Aborted => "ABORTED",
        };
        write!(f, "{name}")
    }
}

/// One external transform-service invocation
#[derive(Debug, Clone)]
pub struct Job {
    /// Kind of work submitted
    pub kind: JobKind,

    /// Provider the job belongs to
    pub provider_id: ProviderId,

    /// Correlation id propagated end-to-end for tracing
    pub correlation_id: CorrelationId,

    /// URL to poll for the job's status
    pub status_url: String,

    /// Last externally-reported status
    pub status: JobStatus,

    /// Number of status polls performed so far
    pub retries: u32,

    /// When the submission succeeded
    pub created_at: DateTime<Utc>,

    /// When the first STARTED status was observed
    pub started_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a job from a successful submission
    pub fn new(
        kind: JobKind,
        provider_id: ProviderId,
        correlation_id: CorrelationId,
        status_url: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            provider_id,
            correlation_id,
            status_url: status_url.into(),
            status: JobStatus::Scheduled,
            retries: 0,
            created_at: Utc::now(),
            started_at: None,
        }
    }
}
