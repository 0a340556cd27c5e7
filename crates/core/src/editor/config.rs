//! Configuration for the editor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the auto-editor executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Path to the auto-editor binary.
    #[serde(default = "default_binary_path")]
    pub binary_path: PathBuf,

    /// Arguments inserted before the input path on every invocation.
    #[serde(default)]
    pub global_args: Vec<String>,

    /// Wall-clock deadline for a single execution in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_binary_path() -> PathBuf {
    PathBuf::from("auto-editor")
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            global_args: Vec::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl EditorConfig {
    pub fn with_binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = path.into();
        self
    }

    pub fn with_global_args(mut self, args: Vec<String>) -> Self {
        self.global_args = args;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
