pub mod config;
pub mod editor;
pub mod ingest;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod placer;
pub mod retention;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig, StorageConfig,
};
pub use editor::{
    AutoEditorExecutor, EditExecutor, EditJob, EditOptions, EditOutcome, EditorConfig,
    EditorError,
};
pub use ingest::{AssetIngestor, HttpFetcher, IngestConfig, IngestError, RemoteFetcher};
pub use job::{
    InMemoryJobRegistry, JobArtifact, JobError, JobRecord, JobRegistry, JobSource, JobState,
    Retrievability,
};
pub use orchestrator::{
    ArtifactRetrieval, DeliveryGuard, JobOrchestrator, LocalArtifact, OrchestratorConfig,
    OrchestratorError, OrchestratorStatus, SubmitReceipt,
};
pub use placer::{
    ArtifactPlacer, BlobStore, PlacementConfig, PlacementOutcome, PlacerError, RemoteStoreConfig,
    S3BlobStore,
};
pub use retention::{DeleteOutcome, RetentionManager, RetentionTrigger};
