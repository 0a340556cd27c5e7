//! Trait definitions for the placer module.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::error::PlacerError;

/// Durable object storage for finished artifacts.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns the name of this store for logging.
    fn name(&self) -> &str;

    /// Uploads a local file under `key` and returns its locator.
    async fn put_file(&self, local_path: &Path, key: &str) -> Result<String, PlacerError>;

    /// Generates a time-limited GET URL for a stored object.
    async fn presign(&self, locator: &str, ttl: Duration) -> Result<String, PlacerError>;
}
