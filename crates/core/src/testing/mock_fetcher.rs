//! Mock remote fetcher for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::ingest::{IngestError, RemoteFetcher};

/// Mock implementation of the RemoteFetcher trait.
///
/// Writes a fixed body to the destination, or fails with a configured
/// error. A configured delay longer than the fetch timeout produces
/// `FetchTimeout`, as a real fetcher would.
#[derive(Debug)]
pub struct MockFetcher {
    body: Arc<RwLock<Vec<u8>>>,
    next_error: Arc<RwLock<Option<IngestError>>>,
    delay: Arc<RwLock<Duration>>,
    urls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            body: Arc::new(RwLock::new(b"mock-remote-video".to_vec())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            urls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Builder: serve this body.
    pub fn with_body(self, body: Vec<u8>) -> Self {
        Self {
            body: Arc::new(RwLock::new(body)),
            ..self
        }
    }

    /// Builder: take this long per fetch.
    pub fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Arc::new(RwLock::new(delay)),
            ..self
        }
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: IngestError) {
        *self.next_error.write().await = Some(error);
    }

    /// URLs requested so far.
    pub async fn requested_urls(&self) -> Vec<String> {
        self.urls.read().await.clone()
    }
}

#[async_trait]
impl RemoteFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
        max_bytes: Option<u64>,
    ) -> Result<u64, IngestError> {
        self.urls.write().await.push(url.to_string());

        let delay = *self.delay.read().await;
        if delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(IngestError::FetchTimeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let body = self.body.read().await.clone();
        if let Some(limit) = max_bytes {
            if body.len() as u64 > limit {
                return Err(IngestError::TooLarge {
                    url: url.to_string(),
                    limit,
                });
            }
        }

        tokio::fs::write(dest, &body)
            .await
            .map_err(|e| IngestError::io(dest, e))?;
        Ok(body.len() as u64)
    }
}
