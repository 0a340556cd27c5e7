//! Configuration for the placer module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Policy for remote placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Validity window of generated retrieval URLs in seconds.
    #[serde(default = "default_ttl")]
    pub presigned_url_ttl_secs: u64,

    /// Prefix prepended to every object key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_ttl() -> u64 {
    12 * 60 * 60 // 12 hours
}

fn default_key_prefix() -> String {
    "outputs/".to_string()
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            presigned_url_ttl_secs: default_ttl(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl PlacementConfig {
    pub fn with_ttl(mut self, secs: u64) -> Self {
        self.presigned_url_ttl_secs = secs;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.presigned_url_ttl_secs)
    }
}

/// Connection settings for an S3-compatible bucket.
///
/// Credentials left unset are taken from the standard `AWS_*` environment
/// variables.
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteStoreConfig {
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible providers (MinIO, R2, Spaces).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    /// Allow plain HTTP endpoints.
    #[serde(default)]
    pub allow_http: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl RemoteStoreConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Whether this section describes a usable bucket.
    pub fn is_enabled(&self) -> bool {
        !self.bucket.trim().is_empty()
    }
}

impl fmt::Debug for RemoteStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStoreConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "***"))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "***"),
            )
            .field("allow_http", &self.allow_http)
            .finish()
    }
}
