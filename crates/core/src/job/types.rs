//! Job record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a job.
///
/// States only move forward: `Downloading -> Processing -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// The input asset is being received or fetched.
    Downloading,
    /// The editing tool is running (or queued to run) on the input.
    Processing,
    /// The output is ready for retrieval.
    Completed,
    /// The job stopped with a diagnostic message.
    Failed,
}

impl JobState {
    /// All states, in lifecycle order.
    pub const ALL: [JobState; 4] = [
        JobState::Downloading,
        JobState::Processing,
        JobState::Completed,
        JobState::Failed,
    ];

    /// Returns the state name as used in API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Downloading => "downloading",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobState::Downloading => 0,
            JobState::Processing => 1,
            JobState::Completed | JobState::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle ordering.
    ///
    /// Re-entering the same non-terminal state is allowed (message refresh).
    /// A terminal state only accepts itself, so artifact bookkeeping can be
    /// updated on a completed job without leaving `Completed`.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the input of a job came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobSource {
    /// Uploaded directly by the client.
    Upload {
        #[serde(skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
    /// Fetched from a remote URL.
    Url { url: String },
}

/// Artifact location recorded on a transition.
///
/// Setting one variant clears the fields of the other, so a record never
/// points at both a local file and a remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobArtifact {
    /// Output lives on local disk.
    Local { path: PathBuf },
    /// Output lives in the remote object store.
    Remote {
        locator: String,
        presigned_url: String,
        expires_at: DateTime<Utc>,
    },
}

/// One submitted job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier.
    pub id: String,
    /// Current lifecycle state.
    pub state: JobState,
    /// Human-readable status or diagnostic text.
    pub message: String,
    /// Origin of the input asset.
    pub source: JobSource,
    /// Local output path while the file still exists locally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_artifact_path: Option<PathBuf>,
    /// Durable reference to the output in the remote store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_locator: Option<String>,
    /// Short-lived retrieval URL for the remote output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presigned_url: Option<String>,
    /// Expiry of `presigned_url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presigned_url_expires_at: Option<DateTime<Utc>>,
    /// When the local artifact was handed to a download.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates a fresh record in `Downloading` state.
    pub fn new(id: impl Into<String>, source: JobSource) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            state: JobState::Downloading,
            message: String::new(),
            source,
            local_artifact_path: None,
            remote_locator: None,
            presigned_url: None,
            presigned_url_expires_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies an artifact location, clearing the other tier's fields.
    pub(crate) fn apply_artifact(&mut self, artifact: JobArtifact) {
        match artifact {
            JobArtifact::Local { path } => {
                self.local_artifact_path = Some(path);
                self.remote_locator = None;
                self.presigned_url = None;
                self.presigned_url_expires_at = None;
            }
            JobArtifact::Remote {
                locator,
                presigned_url,
                expires_at,
            } => {
                self.local_artifact_path = None;
                self.remote_locator = Some(locator);
                self.presigned_url = Some(presigned_url);
                self.presigned_url_expires_at = Some(expires_at);
            }
        }
    }

    /// How the output of this job can be retrieved right now.
    pub fn retrievability(&self) -> Retrievability {
        if self.state != JobState::Completed {
            return Retrievability::NotReady(self.state);
        }
        if let Some(path) = &self.local_artifact_path {
            return Retrievability::Local(path.clone());
        }
        if let Some(locator) = &self.remote_locator {
            return Retrievability::Remote(locator.clone());
        }
        Retrievability::Unavailable
    }
}

/// Retrievability of a job's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrievability {
    /// Job has not completed yet (or failed).
    NotReady(JobState),
    /// Output is on local disk.
    Local(PathBuf),
    /// Output is in the remote store.
    Remote(String),
    /// Completed, but the local copy is gone and nothing was placed remotely.
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ordering() {
        assert!(JobState::Downloading.can_transition_to(JobState::Processing));
        assert!(JobState::Downloading.can_transition_to(JobState::Failed));
        assert!(JobState::Processing.can_transition_to(JobState::Completed));
        assert!(JobState::Processing.can_transition_to(JobState::Processing));
        assert!(!JobState::Processing.can_transition_to(JobState::Downloading));
        assert!(!JobState::Completed.can_transition_to(JobState::Failed));
        assert!(!JobState::Failed.can_transition_to(JobState::Processing));
        assert!(JobState::Completed.can_transition_to(JobState::Completed));
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&JobState::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let parsed: JobState = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, JobState::Failed);
    }

    #[test]
    fn test_apply_remote_clears_local() {
        let mut record = JobRecord::new("job-1", JobSource::Upload { file_name: None });
        record.apply_artifact(JobArtifact::Local {
            path: PathBuf::from("/tmp/out.mp4"),
        });
        record.apply_artifact(JobArtifact::Remote {
            locator: "outputs/job-1.mp4".to_string(),
            presigned_url: "https://example.com/x".to_string(),
            expires_at: Utc::now(),
        });

        assert!(record.local_artifact_path.is_none());
        assert_eq!(record.remote_locator.as_deref(), Some("outputs/job-1.mp4"));
    }

    #[test]
    fn test_retrievability() {
        let mut record = JobRecord::new("job-2", JobSource::Url {
            url: "https://example.com/a.mp4".to_string(),
        });
        assert_eq!(
            record.retrievability(),
            Retrievability::NotReady(JobState::Downloading)
        );

        record.state = JobState::Completed;
        assert_eq!(record.retrievability(), Retrievability::Unavailable);

        record.local_artifact_path = Some(PathBuf::from("/tmp/out.mp4"));
        assert_eq!(
            record.retrievability(),
            Retrievability::Local(PathBuf::from("/tmp/out.mp4"))
        );
    }

    #[test]
    fn test_record_serialization_skips_empty_fields() {
        let record = JobRecord::new("job-3", JobSource::Upload {
            file_name: Some("clip.mp4".to_string()),
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"], "downloading");
        assert_eq!(json["source"]["type"], "upload");
        assert!(json.get("presigned_url").is_none());
    }
}
