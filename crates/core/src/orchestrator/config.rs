//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the job orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum edit tool processes running at once.
    /// Jobs beyond this wait in `Processing` until a slot frees up.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_executions: usize,

    /// Presigned URLs expiring within this many seconds are regenerated
    /// on retrieval.
    #[serde(default = "default_refresh_margin")]
    pub url_refresh_margin_secs: u64,
}

fn default_max_concurrent() -> usize {
    2
}

fn default_refresh_margin() -> u64 {
    60
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: default_max_concurrent(),
            url_refresh_margin_secs: default_refresh_margin(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_concurrent_executions(mut self, max: usize) -> Self {
        self.max_concurrent_executions = max;
        self
    }
}
