//! Transform service adapter
//!
//! Everything needed to talk to the external transform service: the HTTP
//! client, the wire types of its job API, and the job-kind-specific
//! parameter documents.

pub mod client;
pub mod models;
pub mod parameters;

// Re-export commonly used items
pub use client::{ExportFormat, SubmitTarget, TransformClient};
pub use models::{ActionReport, ActionReportWrapper, JobStatusResponse, LinkInfo};
