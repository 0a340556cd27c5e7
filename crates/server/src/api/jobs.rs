//! Job API handlers.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use autotrim_core::{
    ingest::parse_fetch_url, ArtifactRetrieval, DeliveryGuard, EditOptions, IngestError,
    JobRecord, JobSource, JobState, OrchestratorError, SubmitReceipt,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Edit options accepted as query parameters on uploads.
#[derive(Debug, Default, Deserialize)]
pub struct EditParams {
    pub margin: Option<String>,
    #[serde(alias = "editMode")]
    pub edit_mode: Option<String>,
    pub threshold: Option<f64>,
}

impl From<EditParams> for EditOptions {
    fn from(params: EditParams) -> Self {
        EditOptions {
            margin: params.margin,
            edit_mode: params.edit_mode,
            threshold: params.threshold,
        }
    }
}

/// Request body for submitting a remote URL
#[derive(Debug, Deserialize)]
pub struct SubmitUrlBody {
    pub url: String,
    pub margin: Option<String>,
    #[serde(alias = "editMode")]
    pub edit_mode: Option<String>,
    pub threshold: Option<f64>,
}

/// Response for job queries
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub state: JobState,
    pub message: String,
    pub source: JobSource,
    /// A local copy is waiting for its single download.
    pub local_artifact_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presigned_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presigned_url_expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<JobRecord> for JobResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id,
            state: record.state,
            message: record.message,
            source: record.source,
            local_artifact_available: record.local_artifact_path.is_some(),
            presigned_url: record.presigned_url,
            presigned_url_expires_at: record.presigned_url_expires_at.map(|t| t.to_rfc3339()),
            delivered_at: record.delivered_at.map(|t| t.to_rfc3339()),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub total: usize,
}

/// Response for remote retrievals
#[derive(Debug, Serialize)]
pub struct RemoteArtifactResponse {
    pub url: String,
    pub expires_at: String,
}

/// Response for a discarded job
#[derive(Debug, Serialize)]
pub struct DiscardResponse {
    pub job_id: String,
    pub discarded: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,
}

/// An error mapped to an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: JobErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: JobErrorResponse {
                error: error.into(),
                job_id: None,
                state: None,
            },
        }
    }

    fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.body.job_id = Some(job_id.into());
        self
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        let message = err.to_string();
        match err {
            OrchestratorError::JobNotFound(id) => {
                Self::new(StatusCode::NOT_FOUND, message).with_job(id)
            }
            OrchestratorError::NotReady { job_id, state } => {
                let mut api = Self::new(StatusCode::CONFLICT, message).with_job(job_id);
                api.body.state = Some(state);
                api
            }
            OrchestratorError::ArtifactUnavailable { job_id } => {
                Self::new(StatusCode::NOT_FOUND, message).with_job(job_id)
            }
            OrchestratorError::Ingest { job_id, source } => {
                let status = match source {
                    IngestError::InvalidUrl { .. } | IngestError::Stream { .. } => {
                        StatusCode::BAD_REQUEST
                    }
                    IngestError::Fetch { .. } | IngestError::TooLarge { .. } => {
                        StatusCode::BAD_GATEWAY
                    }
                    IngestError::FetchTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    IngestError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let mut api = Self::new(status, message).with_job(job_id);
                api.body.state = Some(JobState::Failed);
                api
            }
            OrchestratorError::Placer(_) => Self::new(StatusCode::BAD_GATEWAY, message),
            OrchestratorError::Registry(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit an uploaded file (multipart field `file`).
pub async fn submit_upload(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EditParams>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitReceipt>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let receipt = state
            .orchestrator()
            .submit_upload(file_name.as_deref(), params.into(), field)
            .await?;
        return Ok((StatusCode::ACCEPTED, Json(receipt)));
    }

    Err(ApiError::bad_request("No file provided"))
}

/// Submit a remote URL to fetch and edit.
pub async fn submit_url(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitUrlBody>,
) -> Result<(StatusCode, Json<SubmitReceipt>), ApiError> {
    parse_fetch_url(&body.url).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let options = EditOptions {
        margin: body.margin,
        edit_mode: body.edit_mode,
        threshold: body.threshold,
    };
    let receipt = state.orchestrator().submit_url(&body.url, options).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// List all jobs, oldest first
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<ListJobsResponse> {
    let jobs: Vec<JobResponse> = state
        .orchestrator()
        .list_jobs()
        .into_iter()
        .map(JobResponse::from)
        .collect();
    let total = jobs.len();
    Json(ListJobsResponse { jobs, total })
}

/// Get a single job
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let record = state.orchestrator().get_status(&id)?;
    Ok(Json(record.into()))
}

/// Download a finished output.
///
/// Local outputs are streamed once and then deleted. Remote outputs answer
/// with a redirect to a presigned URL.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match state.orchestrator().retrieve_artifact(&id).await? {
        ArtifactRetrieval::Local(artifact) => {
            let file = tokio::fs::File::open(&artifact.path).await.map_err(|e| {
                warn!(job_id = %id, error = %e, "Failed to open claimed artifact");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to open output")
                    .with_job(id.clone())
            })?;

            let body = Body::from_stream(GuardedStream {
                inner: ReaderStream::new(file),
                _guard: artifact.guard,
            });
            let disposition = format!(
                "attachment; filename=\"{}\"",
                artifact.file_name.replace('"', "")
            );

            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::CONTENT_LENGTH, artifact.size_bytes.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
        ArtifactRetrieval::Remote { url, expires_at } => Ok((
            StatusCode::SEE_OTHER,
            [(header::LOCATION, url.clone())],
            Json(RemoteArtifactResponse {
                url,
                expires_at: expires_at.to_rfc3339(),
            }),
        )
            .into_response()),
    }
}

/// Discard a job and its local output
pub async fn discard_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DiscardResponse>, ApiError> {
    state.orchestrator().discard(&id).await?;
    Ok(Json(DiscardResponse {
        job_id: id,
        discarded: true,
    }))
}

/// File stream that holds the delivery guard until the body is dropped.
struct GuardedStream {
    inner: ReaderStream<tokio::fs::File>,
    _guard: DeliveryGuard,
}

impl Stream for GuardedStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
