//! API tests with mocked edit tool, fetcher and remote store.
//!
//! These tests run the full router in-process.

mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use serde_json::json;

use autotrim_core::testing::MockBehavior;
use autotrim_core::IngestError;
use common::{fixtures, TestConfig, TestFixture};

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["service"], "autotrim");
    assert!(response.body["endpoints"].as_array().unwrap().len() > 5);
}

#[tokio::test]
async fn test_config_endpoint_is_sanitized() {
    let fixture = TestFixture::with_config(TestConfig::with_remote()).await;
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["remote_enabled"], true);
    assert_eq!(response.body["remote"]["bucket"], "test-bucket");
    assert_eq!(response.body["remote"]["secret_access_key_configured"], false);
    assert!(response.body["remote"].get("secret_access_key").is_none());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let response = fixture.get("/metrics").await;
    assert_eq!(response.status, StatusCode::OK);
    let text = String::from_utf8_lossy(&response.raw);
    assert!(text.contains("autotrim_http_requests_total"));
    assert!(text.contains("autotrim_jobs_by_state"));
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_upload_returns_accepted_receipt() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .upload(
            "/api/v1/jobs?edit_mode=audio&threshold=0.04",
            "file",
            "talk.mp4",
            &fixtures::clip_bytes(10),
        )
        .await;

    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["state"], "processing");
    assert_eq!(response.body["message"], "Video is being processed");

    let job_id = response.body["job_id"].as_str().unwrap();
    fixture.wait_for_terminal(job_id).await;

    let jobs = fixture.executor.recorded_jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].options.edit_mode.as_deref(), Some("audio"));
    assert_eq!(jobs[0].options.threshold, Some(0.04));
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .upload("/api/v1/jobs", "attachment", "clip.mp4", b"data")
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "No file provided");
}

#[tokio::test]
async fn test_submit_url() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/v1/jobs/url",
            json!({ "url": "https://cdn.example.com/clip.mov", "margin": "0.2sec" }),
        )
        .await;

    assert_status!(response, StatusCode::ACCEPTED);
    let job_id = response.body["job_id"].as_str().unwrap();
    let job = fixture.wait_for_terminal(job_id).await;
    assert_eq!(job["state"], "completed");
    assert_eq!(job["source"]["type"], "url");
    assert_eq!(
        fixture.fetcher.requested_urls().await,
        vec!["https://cdn.example.com/clip.mov".to_string()]
    );
}

#[tokio::test]
async fn test_submit_invalid_url() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/jobs/url", json!({ "url": "ftp://example.com/clip.mp4" }))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(fixture.fetcher.requested_urls().await.is_empty());
}

#[tokio::test]
async fn test_submit_url_fetch_failure() {
    let fixture = TestFixture::new().await;
    fixture
        .fetcher
        .set_next_error(IngestError::fetch("https://cdn.example.com/x.mp4", "HTTP 404"))
        .await;

    let response = fixture
        .post("/api/v1/jobs/url", json!({ "url": "https://cdn.example.com/x.mp4" }))
        .await;

    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["state"], "failed");

    let job_id = response.body["job_id"].as_str().unwrap();
    let job = fixture.get(&format!("/api/v1/jobs/{}", job_id)).await;
    assert_eq!(job.body["state"], "failed");
    assert!(job.body["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to download video"));
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test]
async fn test_get_unknown_job() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/jobs/does-not-exist").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_jobs() {
    let fixture = TestFixture::new().await;
    let first = fixture.submit_clip(1).await;
    let second = fixture.submit_clip(1).await;

    let response = fixture.get("/api/v1/jobs").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 2);
    let ids: Vec<&str> = response.body["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
}

#[tokio::test]
async fn test_status_endpoint_counts_jobs() {
    let fixture = TestFixture::new().await;
    let job_id = fixture.submit_clip(1).await;
    fixture.wait_for_terminal(&job_id).await;

    let response = fixture.get("/api/v1/status").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total_jobs"], 1);
    assert_eq!(response.body["completed_count"], 1);
    assert_eq!(response.body["remote_enabled"], false);
}

// =============================================================================
// Download
// =============================================================================

#[tokio::test]
async fn test_download_before_completion_is_conflict() {
    let fixture = TestFixture::with_config(TestConfig {
        execution_delay: Some(Duration::from_millis(500)),
        ..Default::default()
    })
    .await;
    let job_id = fixture.submit_clip(1).await;

    let response = fixture
        .get(&format!("/api/v1/jobs/{}/download", job_id))
        .await;

    assert_status!(response, StatusCode::CONFLICT);
    assert_eq!(response.body["state"], "processing");
}

#[tokio::test]
async fn test_download_streams_once_then_deletes() {
    let fixture = TestFixture::new().await;
    let job_id = fixture.submit_clip(10).await;
    let job = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(job["state"], "completed");
    assert_eq!(job["local_artifact_available"], true);

    let response = fixture
        .get(&format!("/api/v1/jobs/{}/download", job_id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.raw.as_ref(), fixtures::clip_bytes(10).as_slice());
    let disposition = response.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap();
    assert!(disposition.contains(&format!("edited_{}_output.mp4", job_id)));

    let output = fixture.output_dir().join(format!("{}_output.mp4", job_id));
    for _ in 0..200 {
        if !output.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!output.exists(), "delivered output must be deleted");

    let second = fixture
        .get(&format!("/api/v1/jobs/{}/download", job_id))
        .await;
    assert_status!(second, StatusCode::NOT_FOUND);

    let job = fixture.get(&format!("/api/v1/jobs/{}", job_id)).await;
    assert_eq!(job.body["state"], "completed");
    assert_eq!(job.body["local_artifact_available"], false);
    assert!(job.body["delivered_at"].is_string());
}

#[tokio::test]
async fn test_download_remote_redirects() {
    let fixture = TestFixture::with_config(TestConfig::with_remote()).await;
    let job_id = fixture.submit_clip(2).await;
    let job = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(job["state"], "completed");
    assert_eq!(job["local_artifact_available"], false);
    let presigned = job["presigned_url"].as_str().unwrap().to_string();

    let response = fixture
        .get(&format!("/api/v1/jobs/{}/download", job_id))
        .await;

    assert_status!(response, StatusCode::SEE_OTHER);
    assert_eq!(response.headers[header::LOCATION].to_str().unwrap(), presigned);
    assert_eq!(response.body["url"], presigned);
}

#[tokio::test]
async fn test_download_failed_job() {
    let fixture = TestFixture::new().await;
    fixture
        .executor
        .set_behavior(MockBehavior::Fail {
            exit_code: 1,
            stderr: "no audio stream".to_string(),
        })
        .await;

    let job_id = fixture.submit_clip(1).await;
    let job = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(job["state"], "failed");
    assert_eq!(job["message"], "Auto-editor error: no audio stream");

    let response = fixture
        .get(&format!("/api/v1/jobs/{}/download", job_id))
        .await;
    assert_status!(response, StatusCode::CONFLICT);
    assert_eq!(response.body["state"], "failed");
}

// =============================================================================
// Discard
// =============================================================================

#[tokio::test]
async fn test_discard_job() {
    let fixture = TestFixture::new().await;
    let job_id = fixture.submit_clip(1).await;
    fixture.wait_for_terminal(&job_id).await;

    let response = fixture.delete(&format!("/api/v1/jobs/{}", job_id)).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["discarded"], true);

    let response = fixture.get(&format!("/api/v1/jobs/{}", job_id)).await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.delete(&format!("/api/v1/jobs/{}", job_id)).await;
    assert_status!(response, StatusCode::NOT_FOUND);
}
