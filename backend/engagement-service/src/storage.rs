//! Object-storage collaborator seam
//!
//! Media bytes live in an external object store addressed by URL. This
//! service only ever asks the store to drop media when a video is deleted;
//! upload mechanics live in the upload pipeline upstream.

use async_trait::async_trait;
use tracing::debug;

/// External media store the video service calls when deleting a video.
/// Deletion is best-effort and happens outside the cascade transaction.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn delete(&self, url: &str) -> anyhow::Result<()>;
}

/// No-op store for deployments where media cleanup runs out-of-band
#[derive(Debug, Default, Clone)]
pub struct NoopStorage;

#[async_trait]
impl MediaStorage for NoopStorage {
    async fn delete(&self, url: &str) -> anyhow::Result<()> {
        debug!(url = %url, "NoopStorage: skipping media deletion");
        Ok(())
    }
}
