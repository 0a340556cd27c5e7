//! Mock blob store for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::placer::{BlobStore, PlacerError};

/// Mock implementation of the BlobStore trait.
///
/// Keeps uploaded bytes in memory and hands out fake presigned URLs of the
/// form `https://mock.blob/{locator}?ttl={secs}&n={count}`.
#[derive(Debug, Default)]
pub struct MockBlobStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// If set, the next upload fails with this reason.
    next_put_error: Arc<RwLock<Option<String>>>,
    /// If set, the next presign fails with this reason.
    next_presign_error: Arc<RwLock<Option<String>>>,
    presign_count: Arc<RwLock<u64>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the next upload to fail.
    pub async fn fail_next_put(&self, reason: impl Into<String>) {
        *self.next_put_error.write().await = Some(reason.into());
    }

    /// Configure the next presign to fail.
    pub async fn fail_next_presign(&self, reason: impl Into<String>) {
        *self.next_presign_error.write().await = Some(reason.into());
    }

    /// Keys of all stored objects, sorted.
    pub async fn stored_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Bytes of a stored object.
    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    /// Number of URLs generated so far.
    pub async fn presign_count(&self) -> u64 {
        *self.presign_count.read().await
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn put_file(&self, local_path: &Path, key: &str) -> Result<String, PlacerError> {
        if let Some(reason) = self.next_put_error.write().await.take() {
            return Err(PlacerError::upload_failed(key, reason));
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| PlacerError::Io {
                path: local_path.to_path_buf(),
                source: e,
            })?;
        self.objects.write().await.insert(key.to_string(), data);
        Ok(key.to_string())
    }

    async fn presign(&self, locator: &str, ttl: Duration) -> Result<String, PlacerError> {
        if let Some(reason) = self.next_presign_error.write().await.take() {
            return Err(PlacerError::presign_failed(locator, reason));
        }

        let mut count = self.presign_count.write().await;
        *count += 1;
        Ok(format!(
            "https://mock.blob/{}?ttl={}&n={}",
            locator,
            ttl.as_secs(),
            *count
        ))
    }
}
