//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock dependencies injected, so the whole job lifecycle can be
//! exercised without auto-editor, S3, or network access.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use autotrim_core::{
    testing::{MockBlobStore, MockExecutor, MockFetcher},
    ArtifactPlacer, AssetIngestor, BlobStore, Config, IngestConfig, InMemoryJobRegistry,
    JobOrchestrator, OrchestratorConfig, PlacementConfig, RemoteStoreConfig, RetentionManager,
};
use autotrim_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use autotrim_core::testing::fixtures;

const BOUNDARY: &str = "autotrim-test-boundary";

/// Test fixture for API testing with mock dependencies.
///
/// Provides an in-process router with fully controllable mocks for:
/// - The edit tool (MockExecutor)
/// - Remote URL fetches (MockFetcher)
/// - The remote store (MockBlobStore)
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub orchestrator: JobOrchestrator,
    pub executor: Arc<MockExecutor>,
    pub fetcher: Arc<MockFetcher>,
    pub blob_store: Arc<MockBlobStore>,
    /// Temporary directory holding the scratch directories
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Bytes,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Place outputs in the mock remote store
    pub remote: bool,
    /// Simulated edit tool run time
    pub execution_delay: Option<Duration>,
}

impl TestConfig {
    /// Create config with remote placement enabled.
    pub fn with_remote() -> Self {
        Self {
            remote: true,
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with local-only placement.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let executor = Arc::new(
            MockExecutor::new()
                .with_delay(test_config.execution_delay.unwrap_or(Duration::from_millis(10))),
        );
        let fetcher = Arc::new(MockFetcher::new().with_body(fixtures::clip_bytes(4)));
        let blob_store = Arc::new(MockBlobStore::new());

        let mut config = Config::default();
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        config.storage.upload_dir = temp_dir.path().join("uploads");
        config.storage.output_dir = temp_dir.path().join("outputs");
        if test_config.remote {
            config.remote = Some(RemoteStoreConfig::new("test-bucket"));
        }

        let retention = RetentionManager::new();
        let ingestor = AssetIngestor::new(
            config.storage.upload_dir.clone(),
            IngestConfig::default(),
            Arc::clone(&fetcher) as Arc<dyn autotrim_core::RemoteFetcher>,
            retention.clone(),
        );
        let store = test_config
            .remote
            .then(|| Arc::clone(&blob_store) as Arc<dyn BlobStore>);
        let placer = ArtifactPlacer::new(store, retention, PlacementConfig::default());

        let orchestrator = JobOrchestrator::new(
            OrchestratorConfig::default(),
            Arc::new(InMemoryJobRegistry::new()),
            Arc::new(ingestor),
            Arc::clone(&executor) as Arc<dyn autotrim_core::EditExecutor>,
            Arc::new(placer),
        )
        .with_output_dir(config.storage.output_dir.clone())
        .with_execution_deadline(Duration::from_secs(5));

        let state = Arc::new(AppState::new(config, orchestrator.clone()));
        let router = create_router(state);

        Self {
            router,
            orchestrator,
            executor,
            fetcher,
            blob_store,
            temp_dir,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.temp_dir.path().join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("outputs")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(path).body(Body::empty()).unwrap())
            .await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("DELETE").uri(path).body(Body::empty()).unwrap())
            .await
    }

    /// Upload a file as multipart field `field_name`.
    pub async fn upload(
        &self,
        path: &str,
        field_name: &str,
        file_name: &str,
        data: &[u8],
    ) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field_name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: video/mp4\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Upload a clip and return the new job id.
    pub async fn submit_clip(&self, seconds: u32) -> String {
        let response = self
            .upload("/api/v1/jobs", "file", "clip.mp4", &fixtures::clip_bytes(seconds))
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED, "{:?}", response.body);
        response.body["job_id"]
            .as_str()
            .expect("receipt has job_id")
            .to_string()
    }

    /// Poll a job until it reaches a terminal state.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Value {
        for _ in 0..500 {
            let response = self.get(&format!("/api/v1/jobs/{}", job_id)).await;
            let state = response.body["state"].as_str().unwrap_or_default();
            if state == "completed" || state == "failed" {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let raw = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&raw).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            raw,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
