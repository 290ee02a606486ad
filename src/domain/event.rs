//! Status events
//!
//! A [`JobEvent`] is the sole channel through which other systems observe
//! pipeline progress. Events are immutable once emitted and append-only;
//! the transport that carries them to observers is a collaborator concern
//! (see [`crate::core::events`]).

use crate::domain::ids::{CorrelationId, ProviderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventDomain {
    /// Timetable data processing (import, validation, export, merge)
    Timetable,
    /// Journey-planner graph building
    Graph,
}

impl fmt::Display for EventDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventDomain::Timetable => "TIMETABLE",
            EventDomain::Graph => "GRAPH",
        };
        write!(f, "{name}")
    }
}

/// Pipeline action an event reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventAction {
    Import,
    #[serde(rename = "VALIDATION_LEVEL_1")]
    ValidationLevel1,
    #[serde(rename = "VALIDATION_LEVEL_2")]
    ValidationLevel2,
    Export,
    DataspaceTransfer,
    ExportGtfsMerged,
    BuildGraph,
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventAction::Import => "IMPORT",
            EventAction::ValidationLevel1 => "VALIDATION_LEVEL_1",
            EventAction::ValidationLevel2 => "VALIDATION_LEVEL_2",
            EventAction::Export => "EXPORT",
            EventAction::DataspaceTransfer => "DATASPACE_TRANSFER",
            EventAction::ExportGtfsMerged => "EXPORT_GTFS_MERGED",
            EventAction::BuildGraph => "BUILD_GRAPH",
        };
        write!(f, "{name}")
    }
}

/// Progress state carried by an event
///
/// `Ok`, `Failed` and `Timeout` are terminal: the engine emits exactly one
/// terminal event per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventState {
    Pending,
    Started,
    Ok,
    Failed,
    Timeout,
}

impl EventState {
    /// True for states that end a job's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventState::Ok | EventState::Failed | EventState::Timeout)
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventState::Pending => "PENDING",
            EventState::Started => "STARTED",
            EventState::Ok => "OK",
            EventState::Failed => "FAILED",
            EventState::Timeout => "TIMEOUT",
        };
        write!(f, "{name}")
    }
}

/// An immutable status event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub domain: EventDomain,
    pub action: EventAction,
    pub state: EventState,
    pub correlation_id: CorrelationId,
    pub provider_id: ProviderId,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    /// Creates an event stamped with the current time
    pub fn new(
        domain: EventDomain,
        action: EventAction,
        state: EventState,
        correlation_id: CorrelationId,
        provider_id: ProviderId,
    ) -> Self {
        Self {
            domain,
            action,
            state,
            correlation_id,
            provider_id,
            timestamp: Utc::now(),
        }
    }
}
