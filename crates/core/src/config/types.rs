use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::editor::EditorConfig;
use crate::ingest::IngestConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::placer::{PlacementConfig, RemoteStoreConfig};

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    /// Remote bucket; outputs stay local when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteStoreConfig>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Whether finished outputs are placed in a remote bucket.
    pub fn remote_enabled(&self) -> bool {
        self.remote.as_ref().is_some_and(|r| r.is_enabled())
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted upload body in bytes.
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload() -> u64 {
    2 * 1024 * 1024 * 1024 // 2 GiB
}

/// Scratch directories for inbound and outbound files
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Empty both directories at startup. Nothing survives a restart, so
    /// leftover files are always orphans.
    #[serde(default = "default_true")]
    pub purge_on_startup: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            purge_on_startup: true,
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("/tmp/uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/tmp/outputs")
}

fn default_true() -> bool {
    true
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub editor: EditorConfig,
    pub placement: PlacementConfig,
    pub remote_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<SanitizedRemoteConfig>,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized remote store config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRemoteConfig {
    pub bucket: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub allow_http: bool,
    pub access_key_id_configured: bool,
    pub secret_access_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            ingest: config.ingest.clone(),
            editor: config.editor.clone(),
            placement: config.placement.clone(),
            remote_enabled: config.remote_enabled(),
            remote: config.remote.as_ref().map(|r| SanitizedRemoteConfig {
                bucket: r.bucket.clone(),
                region: r.region.clone(),
                endpoint: r.endpoint.clone(),
                allow_http: r.allow_http,
                access_key_id_configured: r.access_key_id.as_deref().is_some_and(|k| !k.is_empty()),
                secret_access_key_configured: r
                    .secret_access_key
                    .as_deref()
                    .is_some_and(|k| !k.is_empty()),
            }),
            orchestrator: config.orchestrator.clone(),
        }
    }
}
