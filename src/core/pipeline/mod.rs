//! Job orchestration engine
//!
//! The poller, classifier and sequencer that drive a provider's feed
//! through the external transform service.

pub mod classifier;
pub mod poller;
pub mod sequencer;

// Re-export commonly used items
pub use classifier::{Classification, ResultClassifier};
pub use poller::{JobPoller, PollOutcome, PollerConfig};
pub use sequencer::{planned_stages, PipelineOutcome, PipelineSequencer, Stage};
