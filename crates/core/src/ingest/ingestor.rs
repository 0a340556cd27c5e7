//! Asset ingestor: brings a job's input onto local disk.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use super::config::IngestConfig;
use super::error::IngestError;
use super::fetcher::RemoteFetcher;
use crate::retention::{RetentionManager, RetentionTrigger};

/// A job input now present in the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedAsset {
    pub path: PathBuf,
    /// Extension without the leading dot.
    pub extension: String,
    pub size_bytes: u64,
}

/// Writes uploads and remote fetches to `{upload_dir}/{job_id}_input.{ext}`.
pub struct AssetIngestor {
    upload_dir: PathBuf,
    config: IngestConfig,
    fetcher: Arc<dyn RemoteFetcher>,
    retention: RetentionManager,
}

impl AssetIngestor {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        config: IngestConfig,
        fetcher: Arc<dyn RemoteFetcher>,
        retention: RetentionManager,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            config,
            fetcher,
            retention,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Local path for a job's input with the given extension.
    pub fn input_path(&self, job_id: &str, extension: &str) -> PathBuf {
        self.upload_dir
            .join(format!("{}_input.{}", job_id, extension))
    }

    /// Extension an upload named `file_name` is stored with.
    pub fn upload_extension(&self, file_name: Option<&str>) -> String {
        file_name
            .and_then(extension_from_name)
            .unwrap_or_else(|| self.config.default_extension.clone())
    }

    /// Extension a fetch of `url` is stored with.
    pub fn url_extension(&self, url: &str) -> String {
        extension_from_url(url).unwrap_or_else(|| self.config.default_extension.clone())
    }

    /// Persists an uploaded byte stream.
    ///
    /// The extension comes from `file_name` when it has one. On any failure
    /// the partial file is removed before the error is returned.
    pub async fn ingest_upload<S, E>(
        &self,
        job_id: &str,
        file_name: Option<&str>,
        stream: S,
    ) -> Result<IngestedAsset, IngestError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display + Send,
    {
        let extension = self.upload_extension(file_name);
        let path = self.input_path(job_id, &extension);
        self.ensure_upload_dir().await?;

        match write_stream(&path, stream).await {
            Ok(size_bytes) => {
                info!(job_id = %job_id, path = %path.display(), size_bytes, "Upload stored");
                Ok(IngestedAsset {
                    path,
                    extension,
                    size_bytes,
                })
            }
            Err(e) => {
                self.retention
                    .schedule_delete(&path, RetentionTrigger::IngestFailed)
                    .await;
                Err(e)
            }
        }
    }

    /// Fetches a remote asset, bounded by the configured fetch timeout.
    pub async fn ingest_from_url(
        &self,
        job_id: &str,
        url: &str,
    ) -> Result<IngestedAsset, IngestError> {
        let extension = self.url_extension(url);
        let path = self.input_path(job_id, &extension);
        self.ensure_upload_dir().await?;

        debug!(
            job_id = %job_id,
            url = %url,
            fetcher = self.fetcher.name(),
            "Fetching remote asset"
        );

        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);
        match self
            .fetcher
            .fetch(url, &path, timeout, self.config.max_fetch_bytes)
            .await
        {
            Ok(size_bytes) => {
                info!(job_id = %job_id, path = %path.display(), size_bytes, "Remote asset stored");
                Ok(IngestedAsset {
                    path,
                    extension,
                    size_bytes,
                })
            }
            Err(e) => {
                self.retention
                    .schedule_delete(&path, RetentionTrigger::IngestFailed)
                    .await;
                Err(e)
            }
        }
    }

    async fn ensure_upload_dir(&self) -> Result<(), IngestError> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| IngestError::io(&self.upload_dir, e))
    }
}

async fn write_stream<S, E>(path: &Path, stream: S) -> Result<u64, IngestError>
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Display + Send,
{
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| IngestError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = std::pin::pin!(stream);
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| IngestError::Stream {
            reason: e.to_string(),
        })?;
        written += chunk.len() as u64;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| IngestError::io(path, e))?;
    }

    writer.flush().await.map_err(|e| IngestError::io(path, e))?;
    Ok(written)
}

/// Extracts a lowercase extension from a file name.
///
/// Extensions that are not short and alphanumeric are ignored so nothing
/// unexpected ends up in a scratch path.
pub fn extension_from_name(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Extracts an extension from the last path segment of a URL.
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    extension_from_name(segment)
}
