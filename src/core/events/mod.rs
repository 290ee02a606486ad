//! Status event emission
//!
//! Every state transition in the pipeline is converted into an immutable
//! [`JobEvent`] and handed to an [`EventSink`]. The transport that carries
//! events to external observers is a collaborator concern; the engine only
//! guarantees that events are emitted append-only and that each job gets
//! exactly one terminal event.

use crate::domain::event::JobEvent;
use std::sync::Mutex;

/// Receives status events as they are emitted
///
/// Implementations must not fail: event delivery problems are the
/// transport's concern, never the pipeline's.
pub trait EventSink: Send + Sync {
    /// Accepts one event
    fn emit(&self, event: JobEvent);
}

/// Sink that writes events to the tracing log
///
/// The default sink in the CLI: observers tail the structured log stream.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: JobEvent) {
        tracing::info!(
            domain = %event.domain,
            action = %event.action,
            state = %event.state,
            correlation_id = %event.correlation_id,
            provider_id = %event.provider_id,
            timestamp = %event.timestamp.to_rfc3339(),
            "Job event"
        );
    }
}

/// Sink that records events in memory
///
/// Used in tests to assert on emitted event sequences.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingEventSink {
    /// Creates an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all events emitted so far
    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().expect("event sink lock poisoned").clone()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: JobEvent) {
        self.events.lock().expect("event sink lock poisoned").push(event);
    }
}
