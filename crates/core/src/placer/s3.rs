//! S3-compatible blob store backed by `object_store`.

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{ObjectStoreExt, PutPayload};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info};

use super::config::RemoteStoreConfig;
use super::error::PlacerError;
use super::traits::BlobStore;

/// Blob store for AWS S3 and S3-compatible providers.
#[derive(Clone)]
pub struct S3BlobStore {
    store: AmazonS3,
    bucket: String,
}

impl S3BlobStore {
    /// Builds a store from config, filling unset credentials from the environment.
    pub fn new(config: &RemoteStoreConfig) -> Result<Self, PlacerError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(config.region.clone())
            .with_bucket_name(config.bucket.clone());

        if let Some(ref endpoint) = config.endpoint {
            let allow_http = config.allow_http || endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key_id.clone())
                .with_secret_access_key(secret.clone());
        }

        let store = builder.build().map_err(|e| PlacerError::Config {
            reason: e.to_string(),
        })?;

        Ok(Self {
            store,
            bucket: config.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn name(&self) -> &str {
        "s3"
    }

    async fn put_file(&self, local_path: &Path, key: &str) -> Result<String, PlacerError> {
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| PlacerError::Io {
                path: local_path.to_path_buf(),
                source: e,
            })?;
        let size = data.len() as u64;
        let location = ObjectPath::from(key);
        let start = Instant::now();

        self.store
            .put(&location, PutPayload::from(Bytes::from(data)))
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                PlacerError::upload_failed(key, e.to_string())
            })?;

        info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(key.to_string())
    }

    async fn presign(&self, locator: &str, ttl: Duration) -> Result<String, PlacerError> {
        let location = ObjectPath::from(locator);
        let url = self
            .store
            .signed_url(Method::GET, &location, ttl)
            .await
            .map_err(|e| PlacerError::presign_failed(locator, e.to_string()))?;
        Ok(url.to_string())
    }
}
