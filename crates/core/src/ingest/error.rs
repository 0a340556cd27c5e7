//! Error types for the ingest module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while bringing an input asset to local disk.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Writing the local copy failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload stream broke before it was fully read.
    #[error("Upload stream failed: {reason}")]
    Stream { reason: String },

    /// The remote source answered with an error or the transfer broke.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The remote fetch did not finish in time.
    #[error("Fetching {url} timed out after {timeout_secs} seconds")]
    FetchTimeout { url: String, timeout_secs: u64 },

    /// The URL cannot be fetched at all.
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The remote asset exceeds the configured limit.
    #[error("Remote asset {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure was caused by the remote side rather than local disk.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::FetchTimeout { .. } | Self::TooLarge { .. }
        )
    }
}
