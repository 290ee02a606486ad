//! Graph builder boundary
//!
//! Launching the actual graph builder (a Kubernetes job in production) is a
//! collaborator concern. [`GraphBuilder`] specifies the boundary;
//! [`LogGraphBuilder`] is a no-op implementation that only records the
//! request, used by the CLI and in tests.

use crate::domain::ids::CorrelationId;
use crate::domain::Result;
use async_trait::async_trait;
use std::path::Path;

/// Launches a journey-planner graph build from a merged feed
#[async_trait]
pub trait GraphBuilder: Send + Sync {
    /// Builds a graph from the published merged feed
    ///
    /// Returns once the build has completed or failed; the implementation
    /// owns any waiting/polling of the underlying build system.
    async fn build_graph(&self, merged_feed: &Path, correlation_id: &CorrelationId) -> Result<()>;
}

/// Graph builder that only logs the request
pub struct LogGraphBuilder;

#[async_trait]
impl GraphBuilder for LogGraphBuilder {
    async fn build_graph(&self, merged_feed: &Path, correlation_id: &CorrelationId) -> Result<()> {
        tracing::info!(
            merged_feed = %merged_feed.display(),
            correlation_id = %correlation_id,
            "Graph build requested"
        );
        Ok(())
    }
}
