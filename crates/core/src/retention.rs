//! Retention manager: the single place scratch files get deleted.
//!
//! Deletion is idempotent. A missing file is reported as
//! [`DeleteOutcome::AlreadyAbsent`], never as an error, so triggers may
//! overlap freely (a discard racing a finished download, for instance).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::metrics;

/// Result of a deletion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The file existed and was removed.
    Deleted,
    /// Nothing was at the path.
    AlreadyAbsent,
}

/// Why a file is being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionTrigger {
    /// Ingestion broke off; the partial input is discarded.
    IngestFailed,
    /// The edit tool finished with the input.
    InputConsumed,
    /// The edit tool failed or timed out; partial output is discarded.
    ToolFailed,
    /// The output was uploaded to the remote store.
    RemotePlaced,
    /// The local output was streamed to a client.
    Delivered,
    /// The job was discarded by a client.
    Discarded,
    /// The file belongs to no live job.
    Orphaned,
}

impl RetentionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionTrigger::IngestFailed => "ingest_failed",
            RetentionTrigger::InputConsumed => "input_consumed",
            RetentionTrigger::ToolFailed => "tool_failed",
            RetentionTrigger::RemotePlaced => "remote_placed",
            RetentionTrigger::Delivered => "delivered",
            RetentionTrigger::Discarded => "discarded",
            RetentionTrigger::Orphaned => "orphaned",
        }
    }
}

impl fmt::Display for RetentionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deletes scratch files on behalf of the rest of the service.
#[derive(Debug, Clone, Default)]
pub struct RetentionManager;

impl RetentionManager {
    pub fn new() -> Self {
        Self
    }

    /// Removes a file, reporting whether it was there.
    pub async fn remove(&self, path: &Path) -> io::Result<DeleteOutcome> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => Err(e),
        }
    }

    /// Deletes a file and absorbs any error into the log.
    ///
    /// Scheduling the same path twice is a no-op the second time. Returns
    /// `None` when the deletion failed.
    pub async fn schedule_delete(
        &self,
        path: &Path,
        trigger: RetentionTrigger,
    ) -> Option<DeleteOutcome> {
        let result = self.remove(path).await;
        record(path, trigger, result)
    }

    /// Deletes a file without awaiting, for use from `Drop` implementations.
    ///
    /// Runs on the current tokio runtime when there is one, and falls back
    /// to a blocking removal otherwise.
    pub fn spawn_delete(&self, path: PathBuf, trigger: RetentionTrigger) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let manager = self.clone();
                handle.spawn(async move {
                    manager.schedule_delete(&path, trigger).await;
                });
            }
            Err(_) => {
                let result = match std::fs::remove_file(&path) {
                    Ok(()) => Ok(DeleteOutcome::Deleted),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        Ok(DeleteOutcome::AlreadyAbsent)
                    }
                    Err(e) => Err(e),
                };
                record(&path, trigger, result);
            }
        }
    }

    /// Removes every regular file directly inside `dir`.
    ///
    /// Used at startup, when no job from a previous run can still own a file.
    /// Returns the number of files removed.
    pub async fn purge_dir(&self, dir: &Path) -> io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if self.schedule_delete(&entry.path(), RetentionTrigger::Orphaned).await
                == Some(DeleteOutcome::Deleted)
            {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(dir = %dir.display(), removed, "Purged orphaned scratch files");
        }
        Ok(removed)
    }
}

fn record(
    path: &Path,
    trigger: RetentionTrigger,
    result: io::Result<DeleteOutcome>,
) -> Option<DeleteOutcome> {
    match result {
        Ok(DeleteOutcome::Deleted) => {
            debug!(path = %path.display(), trigger = %trigger, "Deleted scratch file");
            metrics::FILES_DELETED
                .with_label_values(&[trigger.as_str(), "deleted"])
                .inc();
            Some(DeleteOutcome::Deleted)
        }
        Ok(DeleteOutcome::AlreadyAbsent) => {
            metrics::FILES_DELETED
                .with_label_values(&[trigger.as_str(), "absent"])
                .inc();
            Some(DeleteOutcome::AlreadyAbsent)
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                trigger = %trigger,
                error = %e,
                "Failed to delete scratch file"
            );
            metrics::FILES_DELETED
                .with_label_values(&[trigger.as_str(), "error"])
                .inc();
            None
        }
    }
}
