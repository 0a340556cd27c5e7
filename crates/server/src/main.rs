use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autotrim_core::{
    load_config, validate_config, ArtifactPlacer, AssetIngestor, AutoEditorExecutor, BlobStore,
    EditExecutor, HttpFetcher, InMemoryJobRegistry, JobOrchestrator, RetentionManager,
    S3BlobStore,
};
use autotrim_server::api::create_router;
use autotrim_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("autotrim {}", VERSION);

    // Determine config path
    let config_path = std::env::var("AUTOTRIM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Upload dir: {:?}", config.storage.upload_dir);
    info!("Output dir: {:?}", config.storage.output_dir);

    // Prepare scratch directories. No job survives a restart, so anything
    // left from a previous run is an orphan.
    let retention = RetentionManager::new();
    for dir in [&config.storage.upload_dir, &config.storage.output_dir] {
        if config.storage.purge_on_startup {
            match retention.purge_dir(dir).await {
                Ok(0) => {}
                Ok(removed) => info!(dir = %dir.display(), removed, "Removed orphaned files"),
                Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to purge directory"),
            }
        }
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }

    // Ingestion
    let fetcher = Arc::new(
        HttpFetcher::new(&config.ingest.user_agent).context("Failed to create HTTP client")?,
    );
    let ingestor = Arc::new(AssetIngestor::new(
        config.storage.upload_dir.clone(),
        config.ingest.clone(),
        fetcher,
        retention.clone(),
    ));

    // Edit executor
    let executor = Arc::new(AutoEditorExecutor::new(config.editor.clone()));
    match executor.validate().await {
        Ok(()) => info!("Using edit tool at {:?}", config.editor.binary_path),
        Err(e) => warn!("Edit tool is not usable yet, jobs will fail: {}", e),
    }

    // Placement
    let blob_store: Option<Arc<dyn BlobStore>> = match &config.remote {
        Some(remote) if remote.is_enabled() => {
            info!(
                "Remote placement enabled (bucket: {}, region: {})",
                remote.bucket, remote.region
            );
            let store: Arc<dyn BlobStore> =
                Arc::new(S3BlobStore::new(remote).context("Failed to create remote store")?);
            Some(store)
        }
        _ => {
            info!("Remote placement disabled, outputs are served from local disk");
            None
        }
    };
    let placer = Arc::new(ArtifactPlacer::new(
        blob_store,
        retention,
        config.placement.clone(),
    ));

    // Orchestrator
    let orchestrator = JobOrchestrator::new(
        config.orchestrator.clone(),
        Arc::new(InMemoryJobRegistry::new()),
        ingestor,
        executor,
        placer,
    )
    .with_output_dir(config.storage.output_dir.clone())
    .with_execution_deadline(config.editor.deadline());
    info!(
        "Job orchestrator ready (max concurrent executions: {})",
        config.orchestrator.max_concurrent_executions
    );

    // Create app state
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, orchestrator));

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
