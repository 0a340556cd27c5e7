//! Types for the job orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ingest::IngestError;
use crate::job::{JobError, JobState};
use crate::placer::PlacerError;
use crate::retention::{RetentionManager, RetentionTrigger};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// The job has not completed (or failed).
    #[error("job {job_id} is not ready: {state}")]
    NotReady { job_id: String, state: JobState },

    /// The job completed, but its output can no longer be retrieved.
    #[error("artifact for job {job_id} is no longer available")]
    ArtifactUnavailable { job_id: String },

    /// The input could not be brought to local disk. The job is `Failed`.
    #[error("ingest failed for job {job_id}: {source}")]
    Ingest {
        job_id: String,
        #[source]
        source: IngestError,
    },

    /// Job registry error.
    #[error("job registry error: {0}")]
    Registry(JobError),

    /// Remote store error while refreshing a retrieval URL.
    #[error("placer error: {0}")]
    Placer(#[from] PlacerError),
}

impl From<JobError> for OrchestratorError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => Self::JobNotFound(id),
            other => Self::Registry(other),
        }
    }
}

/// Returned by a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub job_id: String,
    pub state: JobState,
    pub message: String,
}

/// How to hand a finished artifact to the client.
#[derive(Debug)]
pub enum ArtifactRetrieval {
    /// Stream the local file. It is deleted when the guard drops.
    Local(LocalArtifact),
    /// Redirect the client to the remote store.
    Remote {
        url: String,
        expires_at: DateTime<Utc>,
    },
}

/// A local artifact claimed for one delivery.
#[derive(Debug)]
pub struct LocalArtifact {
    pub path: PathBuf,
    /// Name offered to the client, `edited_{output file name}`.
    pub file_name: String,
    pub size_bytes: u64,
    /// Keep alive for as long as the file is being read.
    pub guard: DeliveryGuard,
}

/// Deletes a delivered artifact when dropped.
///
/// Whether the response body finished or the client went away, the file
/// is removed once whoever streams it lets go of the guard.
#[derive(Debug)]
pub struct DeliveryGuard {
    job_id: String,
    path: PathBuf,
    retention: RetentionManager,
}

impl DeliveryGuard {
    pub(crate) fn new(job_id: &str, path: PathBuf, retention: RetentionManager) -> Self {
        Self {
            job_id: job_id.to_string(),
            path,
            retention,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        tracing::debug!(job_id = %self.job_id, path = %self.path.display(), "Delivery finished");
        self.retention
            .spawn_delete(self.path.clone(), RetentionTrigger::Delivered);
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Jobs currently in the registry.
    pub total_jobs: usize,
    pub downloading_count: usize,
    pub processing_count: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    /// Edit tool processes running right now.
    pub active_executions: usize,
    pub max_concurrent_executions: usize,
    /// Whether outputs are placed in a remote store.
    pub remote_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_conversion() {
        let err: OrchestratorError = JobError::NotFound("abc".to_string()).into();
        assert!(matches!(err, OrchestratorError::JobNotFound(id) if id == "abc"));

        let err: OrchestratorError = JobError::DuplicateId("abc".to_string()).into();
        assert!(matches!(err, OrchestratorError::Registry(_)));
    }

    #[test]
    fn test_receipt_serialization() {
        let receipt = SubmitReceipt {
            job_id: "job-1".to_string(),
            state: JobState::Processing,
            message: "Video is being processed".to_string(),
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["state"], "processing");
        assert_eq!(json["job_id"], "job-1");
    }

    #[test]
    fn test_delivery_guard_deletes_on_drop() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out.mp4");
        std::fs::write(&path, b"x").unwrap();

        let guard = DeliveryGuard::new("job-1", path.clone(), RetentionManager::new());
        assert_eq!(guard.path(), path.as_path());
        drop(guard);

        assert!(!path.exists());
    }
}
