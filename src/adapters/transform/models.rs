//! Wire types for the transform service's job API

use crate::domain::job::JobStatus;
use serde::Deserialize;

/// Job status document returned by the transform service
///
/// Only the fields the orchestration engine acts on are modeled; the
/// service sends more, which serde ignores.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub referential: Option<String>,

    #[serde(default)]
    pub action: Option<String>,

    #[serde(rename = "type", default)]
    pub job_type: Option<String>,

    #[serde(default)]
    pub created: Option<i64>,

    #[serde(default)]
    pub started: Option<i64>,

    #[serde(default)]
    pub updated: Option<i64>,

    pub status: JobStatus,

    #[serde(default)]
    pub links: Vec<LinkInfo>,
}

impl JobStatusResponse {
    /// Returns the href of the first link with the given rel, if any
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == rel)
            .map(|link| link.href.as_str())
    }
}

/// A hypermedia link in a job status document
#[derive(Debug, Clone, Deserialize)]
pub struct LinkInfo {
    pub rel: String,
    pub href: String,

    #[serde(rename = "type", default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub method: Option<String>,
}

/// Envelope of the job's terminal result document
#[derive(Debug, Clone, Deserialize)]
pub struct ActionReportWrapper {
    #[serde(rename = "action_report", default)]
    pub action_report: Option<ActionReport>,
}

impl ActionReportWrapper {
    /// Returns the report's result code, if any
    pub fn result(&self) -> Option<&str> {
        self.action_report
            .as_ref()
            .and_then(|report| report.result.as_deref())
    }
}

/// The terminal result of a job
///
/// The service reports much more (progression, per-file statuses, stats);
/// the classifier only ever reads `result`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionReport {
    #[serde(default)]
    pub result: Option<String>,
}
