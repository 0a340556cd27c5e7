//! Job orchestrator implementation.
//!
//! Drives jobs through the state machine:
//! - Ingestion: inline with the submission, so failures surface immediately
//! - Execution: background task, bounded by a semaphore and a deadline
//! - Placement: same background task, one attempt

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::editor::{humanize_duration, EditExecutor, EditJob, EditOptions, EditOutcome};
use crate::ingest::{AssetIngestor, IngestError, IngestedAsset};
use crate::job::{
    JobArtifact, JobError, JobRecord, JobRegistry, JobSource, JobState, Retrievability,
};
use crate::metrics;
use crate::placer::{ArtifactPlacer, PlacementOutcome};
use crate::retention::{RetentionManager, RetentionTrigger};

use super::config::OrchestratorConfig;
use super::types::{
    ArtifactRetrieval, DeliveryGuard, LocalArtifact, OrchestratorError, OrchestratorStatus,
    SubmitReceipt,
};

const MSG_DOWNLOADING: &str = "Video is being downloaded";
const MSG_PROCESSING: &str = "Video is being processed";
const MSG_COMPLETED: &str = "Video processed successfully";
const MSG_DELIVERED: &str = "Video processed successfully; the local copy was delivered and removed";

/// The job orchestrator: runs each job through ingest, execution, and placement.
///
/// Cheap to clone; clones share the registry, execution slots, and collaborators.
#[derive(Clone)]
pub struct JobOrchestrator {
    config: OrchestratorConfig,
    registry: Arc<dyn JobRegistry>,
    ingestor: Arc<AssetIngestor>,
    executor: Arc<dyn EditExecutor>,
    placer: Arc<ArtifactPlacer>,
    retention: RetentionManager,
    output_dir: PathBuf,
    execution_deadline: Duration,
    execution_slots: Arc<Semaphore>,
    active_executions: Arc<AtomicUsize>,
}

impl JobOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<dyn JobRegistry>,
        ingestor: Arc<AssetIngestor>,
        executor: Arc<dyn EditExecutor>,
        placer: Arc<ArtifactPlacer>,
    ) -> Self {
        let execution_slots = Arc::new(Semaphore::new(config.max_concurrent_executions.max(1)));
        Self {
            config,
            registry,
            ingestor,
            executor,
            placer,
            retention: RetentionManager::new(),
            output_dir: std::env::temp_dir().join("autotrim-outputs"),
            execution_deadline: Duration::from_secs(3600),
            execution_slots,
            active_executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Directory where outputs are written.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Wall-clock bound for each tool execution.
    pub fn with_execution_deadline(mut self, deadline: Duration) -> Self {
        self.execution_deadline = deadline;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn upload_dir(&self) -> &Path {
        self.ingestor.upload_dir()
    }

    /// Output path for a job: `{output_dir}/{job_id}_output.{ext}`.
    pub fn output_path(&self, job_id: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_output.{}", job_id, extension))
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submits an uploaded file.
    ///
    /// The upload is stored before this returns; execution continues in the
    /// background.
    pub async fn submit_upload<S, E>(
        &self,
        file_name: Option<&str>,
        options: EditOptions,
        stream: S,
    ) -> Result<SubmitReceipt, OrchestratorError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::fmt::Display + Send,
    {
        let job_id = new_job_id();
        self.create_job(
            &job_id,
            JobSource::Upload {
                file_name: file_name.map(str::to_string),
            },
        )?;
        metrics::JOBS_SUBMITTED.with_label_values(&["upload"]).inc();

        let guard = self.ingest_guard(
            &job_id,
            self.ingestor.upload_extension(file_name),
            "Error saving file: upload interrupted",
        );
        let result = self.ingestor.ingest_upload(&job_id, file_name, stream).await;
        guard.disarm();

        match result {
            Ok(asset) => self.start_processing(job_id, asset, options).await,
            Err(e) => Err(self.fail_ingest(job_id, "Error saving file", e)),
        }
    }

    /// Submits a remote URL.
    ///
    /// The asset is fetched before this returns; a fetch failure marks the job
    /// `Failed` and is returned to the caller.
    pub async fn submit_url(
        &self,
        url: &str,
        options: EditOptions,
    ) -> Result<SubmitReceipt, OrchestratorError> {
        let job_id = new_job_id();
        self.create_job(
            &job_id,
            JobSource::Url {
                url: url.to_string(),
            },
        )?;
        metrics::JOBS_SUBMITTED.with_label_values(&["url"]).inc();

        let guard = self.ingest_guard(
            &job_id,
            self.ingestor.url_extension(url),
            "Failed to download video: request cancelled",
        );
        let result = self.ingestor.ingest_from_url(&job_id, url).await;
        guard.disarm();

        match result {
            Ok(asset) => self.start_processing(job_id, asset, options).await,
            Err(e) => Err(self.fail_ingest(job_id, "Failed to download video", e)),
        }
    }

    fn create_job(&self, job_id: &str, source: JobSource) -> Result<(), OrchestratorError> {
        self.registry.create(job_id, source)?;
        self.registry
            .transition(job_id, JobState::Downloading, MSG_DOWNLOADING, None)?;
        info!(job_id = %job_id, "Job created");
        Ok(())
    }

    fn ingest_guard(&self, job_id: &str, extension: String, message: &'static str) -> IngestGuard {
        IngestGuard {
            job_id: job_id.to_string(),
            input_path: self.ingestor.input_path(job_id, &extension),
            message,
            registry: Arc::clone(&self.registry),
            retention: self.retention.clone(),
            armed: true,
        }
    }

    fn fail_ingest(&self, job_id: String, prefix: &str, err: IngestError) -> OrchestratorError {
        warn!(job_id = %job_id, error = %err, "Ingestion failed");
        self.record_failure(&job_id, &format!("{}: {}", prefix, err), "ingest_failed");
        OrchestratorError::Ingest {
            job_id,
            source: err,
        }
    }

    async fn start_processing(
        &self,
        job_id: String,
        asset: IngestedAsset,
        options: EditOptions,
    ) -> Result<SubmitReceipt, OrchestratorError> {
        let record = match self
            .registry
            .transition(&job_id, JobState::Processing, MSG_PROCESSING, None)
        {
            Ok(record) => record,
            Err(e) => {
                // Discarded while the input was still arriving.
                self.retention
                    .schedule_delete(&asset.path, RetentionTrigger::InputConsumed)
                    .await;
                return Err(e.into());
            }
        };
        info!(job_id = %job_id, input = %asset.path.display(), "Job processing");

        self.spawn_pipeline(job_id, asset, options);

        Ok(SubmitReceipt {
            job_id: record.id,
            state: record.state,
            message: record.message,
        })
    }

    // =========================================================================
    // Background pipeline
    // =========================================================================

    /// Runs the pipeline in a task supervised by a second task.
    ///
    /// If the pipeline panics, the supervisor still records `Failed` and
    /// removes the job's scratch files.
    fn spawn_pipeline(&self, job_id: String, asset: IngestedAsset, options: EditOptions) {
        let supervisor = self.clone();
        tokio::spawn(async move {
            let input_path = asset.path.clone();
            let output_path = supervisor.output_path(&job_id, &asset.extension);

            let worker = {
                let this = supervisor.clone();
                let job_id = job_id.clone();
                tokio::spawn(async move { this.run_pipeline(&job_id, asset, options).await })
            };

            if let Err(join_error) = worker.await {
                let detail = join_error_message(join_error);
                error!(job_id = %job_id, error = %detail, "Pipeline task crashed");

                supervisor.record_failure(
                    &job_id,
                    &format!("Processing error: {}", detail),
                    "error",
                );
                supervisor
                    .retention
                    .schedule_delete(&input_path, RetentionTrigger::InputConsumed)
                    .await;
                // A completed job still owns its output; a failed or discarded one does not.
                let completed = matches!(
                    supervisor.registry.get(&job_id),
                    Ok(record) if record.state == JobState::Completed
                );
                if !completed {
                    supervisor
                        .retention
                        .schedule_delete(&output_path, RetentionTrigger::ToolFailed)
                        .await;
                }
            }
        });
    }

    async fn run_pipeline(&self, job_id: &str, asset: IngestedAsset, options: EditOptions) {
        let output_path = self.output_path(job_id, &asset.extension);
        let edit_job = EditJob {
            job_id: job_id.to_string(),
            input_path: asset.path.clone(),
            output_path: output_path.clone(),
            options,
        };

        let result = {
            let _permit = match self.execution_slots.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    self.record_failure(job_id, "Processing error: execution pool closed", "error");
                    self.retention
                        .schedule_delete(&asset.path, RetentionTrigger::InputConsumed)
                        .await;
                    return;
                }
            };

            if self.registry.get(job_id).is_err() {
                debug!(job_id = %job_id, "Job discarded before execution");
                self.retention
                    .schedule_delete(&asset.path, RetentionTrigger::InputConsumed)
                    .await;
                return;
            }

            let _slot = ExecutionSlot::enter(&self.active_executions);
            let start = Instant::now();
            let result = self.executor.run(&edit_job, self.execution_deadline).await;
            let label = match &result {
                Ok(outcome) => outcome.label(),
                Err(_) => "error",
            };
            metrics::EXECUTION_DURATION
                .with_label_values(&[label])
                .observe(start.elapsed().as_secs_f64());
            result
        };

        self.retention
            .schedule_delete(&asset.path, RetentionTrigger::InputConsumed)
            .await;

        match result {
            Ok(EditOutcome::Success { output_path, .. }) => {
                self.place_and_complete(job_id, &output_path).await;
            }
            Ok(EditOutcome::ToolFailure { exit_code, stderr }) => {
                warn!(job_id = %job_id, exit_code = ?exit_code, "Edit tool failed");
                self.retention
                    .schedule_delete(&output_path, RetentionTrigger::ToolFailed)
                    .await;
                self.record_failure(
                    job_id,
                    &format!("Auto-editor error: {}", stderr),
                    "tool_failed",
                );
            }
            Ok(EditOutcome::Timeout { deadline }) => {
                self.retention
                    .schedule_delete(&output_path, RetentionTrigger::ToolFailed)
                    .await;
                self.record_failure(
                    job_id,
                    &format!("Processing timeout (>{})", humanize_duration(deadline)),
                    "timeout",
                );
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Edit execution error");
                self.retention
                    .schedule_delete(&output_path, RetentionTrigger::ToolFailed)
                    .await;
                self.record_failure(job_id, &format!("Processing error: {}", e), "error");
            }
        }
    }

    async fn place_and_complete(&self, job_id: &str, output_path: &Path) {
        let outcome = self.placer.place(output_path, job_id).await;

        let (message, artifact) = match outcome {
            PlacementOutcome::Local { path } => {
                (MSG_COMPLETED.to_string(), JobArtifact::Local { path })
            }
            PlacementOutcome::Remote {
                locator,
                presigned_url,
                expires_at,
            } => (
                MSG_COMPLETED.to_string(),
                JobArtifact::Remote {
                    locator,
                    presigned_url,
                    expires_at,
                },
            ),
            PlacementOutcome::RemoteFailed { path, reason } => (
                format!(
                    "{}; remote storage unavailable ({}), available for local download only",
                    MSG_COMPLETED, reason
                ),
                JobArtifact::Local { path },
            ),
        };

        let local_path = match &artifact {
            JobArtifact::Local { path } => Some(path.clone()),
            JobArtifact::Remote { .. } => None,
        };

        match self
            .registry
            .transition(job_id, JobState::Completed, &message, Some(artifact))
        {
            Ok(_) => {
                info!(job_id = %job_id, "Job completed");
                metrics::JOBS_FINISHED
                    .with_label_values(&["completed"])
                    .inc();
            }
            Err(JobError::NotFound(_)) => {
                debug!(job_id = %job_id, "Job discarded during processing, removing output");
                if let Some(path) = local_path {
                    self.retention
                        .schedule_delete(&path, RetentionTrigger::Discarded)
                        .await;
                }
            }
            Err(e) => warn!(job_id = %job_id, error = %e, "Failed to record completion"),
        }
    }

    /// Records `Failed`. A vanished or already terminal job is left alone.
    fn record_failure(&self, job_id: &str, message: &str, result: &str) {
        match self
            .registry
            .transition(job_id, JobState::Failed, message, None)
        {
            Ok(_) => {
                info!(job_id = %job_id, message = %message, "Job failed");
                metrics::JOBS_FINISHED.with_label_values(&[result]).inc();
            }
            Err(JobError::NotFound(_)) => {
                debug!(job_id = %job_id, "Job vanished before failure was recorded");
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Failed to record failure");
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns a snapshot of a job.
    pub fn get_status(&self, job_id: &str) -> Result<JobRecord, OrchestratorError> {
        Ok(self.registry.get(job_id)?)
    }

    /// Lists all jobs, oldest first.
    pub fn list_jobs(&self) -> Vec<JobRecord> {
        self.registry.list()
    }

    /// Resolves how a finished job's output can be retrieved.
    ///
    /// A local artifact is claimed for exactly one caller; the returned guard
    /// deletes the file when dropped. Remote URLs close to expiry are
    /// regenerated.
    pub async fn retrieve_artifact(
        &self,
        job_id: &str,
    ) -> Result<ArtifactRetrieval, OrchestratorError> {
        let record = self.registry.get(job_id)?;

        match record.retrievability() {
            Retrievability::NotReady(state) => Err(OrchestratorError::NotReady {
                job_id: job_id.to_string(),
                state,
            }),
            Retrievability::Remote(locator) => self.remote_retrieval(&record, &locator).await,
            Retrievability::Local(_) => self.claim_local(job_id).await,
            Retrievability::Unavailable => Err(OrchestratorError::ArtifactUnavailable {
                job_id: job_id.to_string(),
            }),
        }
    }

    async fn remote_retrieval(
        &self,
        record: &JobRecord,
        locator: &str,
    ) -> Result<ArtifactRetrieval, OrchestratorError> {
        let margin = chrono::Duration::seconds(self.config.url_refresh_margin_secs as i64);
        if let (Some(url), Some(expires_at)) =
            (&record.presigned_url, record.presigned_url_expires_at)
        {
            if expires_at > Utc::now() + margin {
                return Ok(ArtifactRetrieval::Remote {
                    url: url.clone(),
                    expires_at,
                });
            }
        }

        let (url, expires_at) = self.placer.refresh_url(locator).await?;
        self.registry
            .refresh_presigned_url(&record.id, url.clone(), expires_at)?;
        info!(job_id = %record.id, expires_at = %expires_at, "Presigned URL refreshed");
        Ok(ArtifactRetrieval::Remote { url, expires_at })
    }

    async fn claim_local(&self, job_id: &str) -> Result<ArtifactRetrieval, OrchestratorError> {
        let unavailable = || OrchestratorError::ArtifactUnavailable {
            job_id: job_id.to_string(),
        };

        let path = self
            .registry
            .claim_local_artifact(job_id, MSG_DELIVERED)?
            .ok_or_else(unavailable)?;
        let guard = DeliveryGuard::new(job_id, path.clone(), self.retention.clone());

        let size_bytes = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                warn!(job_id = %job_id, path = %path.display(), "Claimed artifact is missing on disk");
                return Err(unavailable());
            }
        };

        let file_name = path
            .file_name()
            .map(|n| format!("edited_{}", n.to_string_lossy()))
            .unwrap_or_else(|| format!("edited_{}", job_id));

        info!(job_id = %job_id, size_bytes, "Artifact claimed for delivery");
        Ok(ArtifactRetrieval::Local(LocalArtifact {
            path,
            file_name,
            size_bytes,
            guard,
        }))
    }

    /// Removes a job and any output still on local disk.
    pub async fn discard(&self, job_id: &str) -> Result<(), OrchestratorError> {
        let record = self
            .registry
            .discard(job_id)
            .ok_or_else(|| OrchestratorError::JobNotFound(job_id.to_string()))?;

        if let Some(path) = record.local_artifact_path {
            self.retention
                .schedule_delete(&path, RetentionTrigger::Discarded)
                .await;
        }
        info!(job_id = %job_id, state = %record.state, "Job discarded");
        Ok(())
    }

    /// Counts jobs per state and running executions.
    pub fn status(&self) -> OrchestratorStatus {
        let jobs = self.registry.list();
        let count = |state: JobState| jobs.iter().filter(|j| j.state == state).count();

        OrchestratorStatus {
            total_jobs: jobs.len(),
            downloading_count: count(JobState::Downloading),
            processing_count: count(JobState::Processing),
            completed_count: count(JobState::Completed),
            failed_count: count(JobState::Failed),
            active_executions: self.active_executions.load(Ordering::SeqCst),
            max_concurrent_executions: self.config.max_concurrent_executions.max(1),
            remote_enabled: self.placer.is_remote_enabled(),
        }
    }
}

/// Tracks one running execution; released on drop, including on panic.
struct ExecutionSlot(Arc<AtomicUsize>);

impl ExecutionSlot {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        metrics::ACTIVE_EXECUTIONS.inc();
        Self(Arc::clone(counter))
    }
}

impl Drop for ExecutionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
        metrics::ACTIVE_EXECUTIONS.dec();
    }
}

/// Fails a job whose submission is dropped while its input is arriving.
///
/// A client that disconnects mid-upload cancels the request future, so the
/// normal failure path never runs. Dropping an armed guard records `Failed`
/// and removes the partial input.
struct IngestGuard {
    job_id: String,
    input_path: PathBuf,
    message: &'static str,
    registry: Arc<dyn JobRegistry>,
    retention: RetentionManager,
    armed: bool,
}

impl IngestGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for IngestGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(job_id = %self.job_id, "Submission dropped during ingestion");
        match self
            .registry
            .transition(&self.job_id, JobState::Failed, self.message, None)
        {
            Ok(_) => {
                metrics::JOBS_FINISHED
                    .with_label_values(&["ingest_failed"])
                    .inc();
            }
            Err(e) => debug!(job_id = %self.job_id, error = %e, "Could not record cancelled ingestion"),
        }
        self.retention
            .spawn_delete(self.input_path.clone(), RetentionTrigger::IngestFailed);
    }
}

fn new_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
