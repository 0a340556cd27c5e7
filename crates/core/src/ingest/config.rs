//! Configuration for the asset ingestor.

use serde::{Deserialize, Serialize};

/// Configuration for receiving uploads and fetching remote assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Timeout for a whole remote fetch in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Maximum bytes accepted from a remote fetch. Unlimited when unset.
    #[serde(default)]
    pub max_fetch_bytes: Option<u64>,

    /// Extension used when neither the file name nor the URL carries one.
    #[serde(default = "default_extension")]
    pub default_extension: String,

    /// User-Agent header sent on remote fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_fetch_timeout() -> u64 {
    300
}

fn default_extension() -> String {
    "mp4".to_string()
}

fn default_user_agent() -> String {
    format!("autotrim/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            max_fetch_bytes: None,
            default_extension: default_extension(),
            user_agent: default_user_agent(),
        }
    }
}

impl IngestConfig {
    pub fn with_fetch_timeout(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    pub fn with_max_fetch_bytes(mut self, limit: u64) -> Self {
        self.max_fetch_bytes = Some(limit);
        self
    }

    pub fn with_default_extension(mut self, ext: impl Into<String>) -> Self {
        self.default_extension = ext.into();
        self
    }
}
