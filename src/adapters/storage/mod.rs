//! Feed storage
//!
//! Blob storage is an external collaborator; [`FeedStore`] specifies the
//! slice of it the pipeline needs. [`LocalFeedStore`] is a directory-backed
//! implementation used by the CLI and in tests.
//!
//! Layout of the local store:
//! - `inbound/received/` - raw provider deliveries
//! - `outbound/gtfs/`    - per-provider export archives staged for merging
//! - `outbound/`         - published artifacts (the merged feed)

use crate::domain::{ConductorError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Storage boundary used by the pipeline
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Fetches a raw inbound delivery by name
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;

    /// Stores a per-provider export archive under the given name
    async fn store_export(&self, name: &str, bytes: Vec<u8>) -> Result<()>;

    /// Lists the per-provider export archives available for merging
    async fn exports(&self) -> Result<Vec<PathBuf>>;

    /// Publishes a finished artifact under the given name, returning its
    /// final location
    async fn publish(&self, source: &Path, name: &str) -> Result<PathBuf>;
}

/// Directory-backed feed store
pub struct LocalFeedStore {
    root: PathBuf,
}

impl LocalFeedStore {
    /// Creates a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn inbound_dir(&self) -> PathBuf {
        self.root.join("inbound").join("received")
    }

    fn outbound_dir(&self) -> PathBuf {
        self.root.join("outbound").join("gtfs")
    }
}

#[async_trait]
impl FeedStore for LocalFeedStore {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.inbound_dir().join(name);
        tokio::fs::read(&path).await.map_err(|e| {
            ConductorError::Storage(format!("Failed to read inbound file {}: {e}", path.display()))
        })
    }

    async fn store_export(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let dir = self.outbound_dir();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            ConductorError::Storage(format!("Failed to create {}: {e}", dir.display()))
        })?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            ConductorError::Storage(format!("Failed to write export {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "Stored export archive");
        Ok(())
    }

    async fn exports(&self) -> Result<Vec<PathBuf>> {
        let dir = self.outbound_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            ConductorError::Storage(format!("Failed to list {}: {e}", dir.display()))
        })?;

        let mut archives = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            ConductorError::Storage(format!("Failed to list {}: {e}", dir.display()))
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "zip") {
                archives.push(path);
            }
        }
        archives.sort();
        Ok(archives)
    }

    async fn publish(&self, source: &Path, name: &str) -> Result<PathBuf> {
        let dir = self.root.join("outbound");
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            ConductorError::Storage(format!("Failed to create {}: {e}", dir.display()))
        })?;
        let target = dir.join(name);
        tokio::fs::copy(source, &target).await.map_err(|e| {
            ConductorError::Storage(format!(
                "Failed to publish {} to {}: {e}",
                source.display(),
                target.display()
            ))
        })?;
        tracing::info!(target = %target.display(), "Published artifact");
        Ok(target)
    }
}
