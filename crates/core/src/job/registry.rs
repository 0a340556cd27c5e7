//! Job registry trait and the in-memory implementation.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::debug;

use super::types::{JobArtifact, JobRecord, JobSource, JobState};

/// Errors returned by the job registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    /// No record with this id.
    #[error("job not found: {0}")]
    NotFound(String),

    /// A record with this id already exists.
    #[error("duplicate job id: {0}")]
    DuplicateId(String),

    /// The requested transition would move the job backwards or out of a terminal state.
    #[error("invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: JobState,
        to: JobState,
    },
}

/// Keyed store of job records.
///
/// Implementations own all record mutation; callers only ever receive
/// snapshots.
pub trait JobRegistry: Send + Sync {
    /// Inserts a new record in `Downloading` state.
    fn create(&self, id: &str, source: JobSource) -> Result<JobRecord, JobError>;

    /// Atomically updates state, message, and optionally the artifact location.
    fn transition(
        &self,
        id: &str,
        state: JobState,
        message: &str,
        artifact: Option<JobArtifact>,
    ) -> Result<JobRecord, JobError>;

    /// Returns a snapshot of a record.
    fn get(&self, id: &str) -> Result<JobRecord, JobError>;

    /// Lists snapshots of every record, oldest first.
    fn list(&self) -> Vec<JobRecord>;

    /// Removes a record. Discarding an absent id is not an error.
    fn discard(&self, id: &str) -> Option<JobRecord>;

    /// Takes the local artifact path of a completed job for delivery.
    ///
    /// At most one caller ever receives `Some(path)` for a given job; the
    /// record keeps `Completed` state with `delivered_at` set and `message`
    /// replaced.
    fn claim_local_artifact(&self, id: &str, message: &str)
        -> Result<Option<PathBuf>, JobError>;

    /// Replaces the presigned URL of a remotely placed job.
    fn refresh_presigned_url(
        &self,
        id: &str,
        url: String,
        expires_at: DateTime<Utc>,
    ) -> Result<JobRecord, JobError>;
}

/// Registry backed by a single lock-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl InMemoryJobRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means a panic happened mid-read elsewhere; every
    // write below replaces whole fields, so the map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobRecord>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobRecord>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl JobRegistry for InMemoryJobRegistry {
    fn create(&self, id: &str, source: JobSource) -> Result<JobRecord, JobError> {
        let mut jobs = self.write();
        if jobs.contains_key(id) {
            return Err(JobError::DuplicateId(id.to_string()));
        }
        let record = JobRecord::new(id, source);
        jobs.insert(id.to_string(), record.clone());
        Ok(record)
    }

    fn transition(
        &self,
        id: &str,
        state: JobState,
        message: &str,
        artifact: Option<JobArtifact>,
    ) -> Result<JobRecord, JobError> {
        let mut jobs = self.write();
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if !record.state.can_transition_to(state) {
            return Err(JobError::InvalidTransition {
                id: id.to_string(),
                from: record.state,
                to: state,
            });
        }

        debug!(job_id = %id, from = %record.state, to = %state, "Job transition");

        record.state = state;
        record.message = message.to_string();
        if let Some(artifact) = artifact {
            record.apply_artifact(artifact);
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn get(&self, id: &str) -> Result<JobRecord, JobError> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.read().values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    fn discard(&self, id: &str) -> Option<JobRecord> {
        self.write().remove(id)
    }

    fn claim_local_artifact(
        &self,
        id: &str,
        message: &str,
    ) -> Result<Option<PathBuf>, JobError> {
        let mut jobs = self.write();
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if record.state != JobState::Completed {
            return Ok(None);
        }

        let path = record.local_artifact_path.take();
        if path.is_some() {
            let now = Utc::now();
            record.delivered_at = Some(now);
            record.message = message.to_string();
            record.updated_at = now;
        }
        Ok(path)
    }

    fn refresh_presigned_url(
        &self,
        id: &str,
        url: String,
        expires_at: DateTime<Utc>,
    ) -> Result<JobRecord, JobError> {
        let mut jobs = self.write();
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        record.presigned_url = Some(url);
        record.presigned_url_expires_at = Some(expires_at);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn upload() -> JobSource {
        JobSource::Upload {
            file_name: Some("clip.mp4".to_string()),
        }
    }

    #[test]
    fn test_create_and_get() {
        let registry = InMemoryJobRegistry::new();
        let record = registry.create("job-1", upload()).unwrap();
        assert_eq!(record.state, JobState::Downloading);
        assert!(record.message.is_empty());

        let fetched = registry.get("job-1").unwrap();
        assert_eq!(fetched.id, "job-1");
    }

    #[test]
    fn test_create_duplicate_fails() {
        let registry = InMemoryJobRegistry::new();
        registry.create("job-1", upload()).unwrap();
        let err = registry.create("job-1", upload()).unwrap_err();
        assert_eq!(err, JobError::DuplicateId("job-1".to_string()));
    }

    #[test]
    fn test_get_missing() {
        let registry = InMemoryJobRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(JobError::NotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_transition_updates_fields() {
        let registry = InMemoryJobRegistry::new();
        registry.create("job-1", upload()).unwrap();
        registry
            .transition("job-1", JobState::Processing, "Video is being processed", None)
            .unwrap();
        let record = registry
            .transition(
                "job-1",
                JobState::Completed,
                "done",
                Some(JobArtifact::Local {
                    path: PathBuf::from("/tmp/out.mp4"),
                }),
            )
            .unwrap();

        assert_eq!(record.state, JobState::Completed);
        assert_eq!(record.message, "done");
        assert_eq!(record.local_artifact_path, Some(PathBuf::from("/tmp/out.mp4")));
    }

    #[test]
    fn test_transition_out_of_terminal_rejected() {
        let registry = InMemoryJobRegistry::new();
        registry.create("job-1", upload()).unwrap();
        registry
            .transition("job-1", JobState::Failed, "boom", None)
            .unwrap();

        let err = registry
            .transition("job-1", JobState::Processing, "again", None)
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
        assert_eq!(registry.get("job-1").unwrap().message, "boom");
    }

    #[test]
    fn test_transition_after_discard_is_not_found() {
        let registry = InMemoryJobRegistry::new();
        registry.create("job-1", upload()).unwrap();
        registry.discard("job-1");

        let err = registry
            .transition("job-1", JobState::Processing, "x", None)
            .unwrap_err();
        assert_eq!(err, JobError::NotFound("job-1".to_string()));
    }

    #[test]
    fn test_discard_is_idempotent() {
        let registry = InMemoryJobRegistry::new();
        registry.create("job-1", upload()).unwrap();
        assert!(registry.discard("job-1").is_some());
        assert!(registry.discard("job-1").is_none());
        assert!(registry.discard("never-existed").is_none());
    }

    #[test]
    fn test_claim_local_artifact_only_once() {
        let registry = InMemoryJobRegistry::new();
        registry.create("job-1", upload()).unwrap();
        registry
            .transition(
                "job-1",
                JobState::Completed,
                "ok",
                Some(JobArtifact::Local {
                    path: PathBuf::from("/tmp/out.mp4"),
                }),
            )
            .unwrap();

        let first = registry.claim_local_artifact("job-1", "delivered").unwrap();
        let second = registry.claim_local_artifact("job-1", "delivered").unwrap();

        assert_eq!(first, Some(PathBuf::from("/tmp/out.mp4")));
        assert_eq!(second, None);

        let record = registry.get("job-1").unwrap();
        assert_eq!(record.state, JobState::Completed);
        assert!(record.delivered_at.is_some());
        assert_eq!(record.message, "delivered");
    }

    #[test]
    fn test_claim_before_completion_returns_none() {
        let registry = InMemoryJobRegistry::new();
        registry.create("job-1", upload()).unwrap();
        assert_eq!(registry.claim_local_artifact("job-1", "x").unwrap(), None);
    }

    #[test]
    fn test_concurrent_claims_have_single_winner() {
        let registry = Arc::new(InMemoryJobRegistry::new());
        registry.create("job-1", upload()).unwrap();
        registry
            .transition(
                "job-1",
                JobState::Completed,
                "ok",
                Some(JobArtifact::Local {
                    path: PathBuf::from("/tmp/out.mp4"),
                }),
            )
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.claim_local_artifact("job-1", "d").unwrap())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Option::is_some)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_list_is_ordered_by_creation() {
        let registry = InMemoryJobRegistry::new();
        registry.create("a", upload()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        registry.create("b", upload()).unwrap();

        let ids: Vec<String> = registry.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
