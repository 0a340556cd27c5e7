//! Artifact placer: decides where a finished output lives.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::config::PlacementConfig;
use super::error::PlacerError;
use super::traits::BlobStore;
use super::types::PlacementOutcome;
use crate::metrics;
use crate::retention::{RetentionManager, RetentionTrigger};

/// Places finished outputs, remotely when a blob store is configured.
///
/// Each call to [`place`](Self::place) makes exactly one upload attempt.
pub struct ArtifactPlacer {
    blob_store: Option<Arc<dyn BlobStore>>,
    retention: RetentionManager,
    config: PlacementConfig,
}

impl ArtifactPlacer {
    pub fn new(
        blob_store: Option<Arc<dyn BlobStore>>,
        retention: RetentionManager,
        config: PlacementConfig,
    ) -> Self {
        Self {
            blob_store,
            retention,
            config,
        }
    }

    /// A placer that always keeps outputs on local disk.
    pub fn local_only(retention: RetentionManager) -> Self {
        Self::new(None, retention, PlacementConfig::default())
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.blob_store.is_some()
    }

    /// Object key for a job's output: `{prefix}{job_id}/{file_name}`.
    pub fn object_key(&self, job_id: &str, local_output: &Path) -> String {
        let file_name = local_output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| job_id.to_string());
        format!("{}{}/{}", self.config.key_prefix, job_id, file_name)
    }

    /// Places one output.
    ///
    /// On remote success the local file is handed to the retention manager.
    /// On any remote failure the local file is left untouched.
    pub async fn place(&self, local_output: &Path, job_id: &str) -> PlacementOutcome {
        let outcome = match &self.blob_store {
            None => PlacementOutcome::Local {
                path: local_output.to_path_buf(),
            },
            Some(store) => self.place_remote(store.as_ref(), local_output, job_id).await,
        };

        metrics::PLACEMENTS_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();
        outcome
    }

    async fn place_remote(
        &self,
        store: &dyn BlobStore,
        local_output: &Path,
        job_id: &str,
    ) -> PlacementOutcome {
        let key = self.object_key(job_id, local_output);

        let locator = match store.put_file(local_output, &key).await {
            Ok(locator) => locator,
            Err(e) => {
                warn!(job_id = %job_id, store = store.name(), error = %e, "Remote placement failed, keeping local artifact");
                return PlacementOutcome::RemoteFailed {
                    path: local_output.to_path_buf(),
                    reason: e.to_string(),
                };
            }
        };

        let (presigned_url, expires_at) = match self.presign(store, &locator).await {
            Ok(signed) => signed,
            Err(e) => {
                // The uploaded object stays in the bucket; only the local copy is served.
                warn!(job_id = %job_id, locator = %locator, error = %e, "Presigning failed, keeping local artifact");
                return PlacementOutcome::RemoteFailed {
                    path: local_output.to_path_buf(),
                    reason: e.to_string(),
                };
            }
        };

        self.retention
            .schedule_delete(local_output, RetentionTrigger::RemotePlaced)
            .await;

        info!(job_id = %job_id, locator = %locator, expires_at = %expires_at, "Artifact placed remotely");
        PlacementOutcome::Remote {
            locator,
            presigned_url,
            expires_at,
        }
    }

    async fn presign(
        &self,
        store: &dyn BlobStore,
        locator: &str,
    ) -> Result<(String, DateTime<Utc>), PlacerError> {
        let issued_at = Utc::now();
        let url = store.presign(locator, self.config.ttl()).await?;
        let expires_at =
            issued_at + chrono::Duration::seconds(self.config.presigned_url_ttl_secs as i64);
        Ok((url, expires_at))
    }

    /// Generates a fresh retrieval URL for an already placed artifact.
    pub async fn refresh_url(
        &self,
        locator: &str,
    ) -> Result<(String, DateTime<Utc>), PlacerError> {
        let store = self
            .blob_store
            .as_ref()
            .ok_or(PlacerError::RemoteDisabled)?;
        self.presign(store.as_ref(), locator).await
    }
}
