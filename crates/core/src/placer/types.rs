//! Types for the placer module.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Where an artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// No remote store configured; the local file is the artifact.
    Local { path: PathBuf },
    /// Uploaded and presigned; the local copy has been deleted.
    Remote {
        locator: String,
        presigned_url: String,
        expires_at: DateTime<Utc>,
    },
    /// Remote placement was attempted and failed; the local file is kept.
    RemoteFailed { path: PathBuf, reason: String },
}

impl PlacementOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PlacementOutcome::Local { .. } => "local",
            PlacementOutcome::Remote { .. } => "remote",
            PlacementOutcome::RemoteFailed { .. } => "remote_failed",
        }
    }
}
