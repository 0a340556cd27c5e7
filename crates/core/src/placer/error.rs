//! Error types for the placer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while placing an artifact in the remote store.
///
/// None of these fail a job; the placer turns them into a degraded
/// local-only outcome.
#[derive(Debug, Error)]
pub enum PlacerError {
    /// Reading the local artifact failed.
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote store rejected or failed the upload.
    #[error("Upload of {key} failed: {reason}")]
    UploadFailed { key: String, reason: String },

    /// A retrieval URL could not be generated.
    #[error("Failed to presign {locator}: {reason}")]
    PresignFailed { locator: String, reason: String },

    /// The remote store could not be configured.
    #[error("Remote store configuration error: {reason}")]
    Config { reason: String },

    /// No remote store is configured.
    #[error("No remote store configured")]
    RemoteDisabled,
}

impl PlacerError {
    pub fn upload_failed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UploadFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn presign_failed(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PresignFailed {
            locator: locator.into(),
            reason: reason.into(),
        }
    }
}
