//! Mock edit executor for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::editor::{EditExecutor, EditJob, EditOutcome, EditorError};

/// What the mock does when `run` is called.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Copy the input to the output and report success.
    Succeed,
    /// Exit with a non-zero status and the given diagnostic.
    Fail { exit_code: i32, stderr: String },
    /// Never finish; report a timeout once the deadline elapses.
    Hang,
    /// Fail to run at all.
    Error(String),
    /// Panic inside the executor, after writing a partial output.
    Panic(String),
}

/// Mock implementation of the EditExecutor trait.
///
/// Provides controllable behavior for testing:
/// - Track submitted jobs for assertions
/// - Simulate success, tool failure, timeout, and crashes
/// - Add an artificial delay before finishing
/// - Observe the peak number of concurrent runs
#[derive(Debug)]
pub struct MockExecutor {
    /// Recorded jobs, in call order.
    jobs: Arc<RwLock<Vec<EditJob>>>,
    /// Behavior for every run.
    behavior: Arc<RwLock<MockBehavior>>,
    /// Simulated run duration.
    delay: Arc<RwLock<Duration>>,
    active: Arc<AtomicUsize>,
    peak_active: Arc<AtomicUsize>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// Create a mock that succeeds immediately.
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            behavior: Arc::new(RwLock::new(MockBehavior::Succeed)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            active: Arc::new(AtomicUsize::new(0)),
            peak_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Builder: start with the given behavior.
    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(RwLock::new(behavior)),
            ..self
        }
    }

    /// Builder: wait this long before acting.
    pub fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Arc::new(RwLock::new(delay)),
            ..self
        }
    }

    pub async fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write().await = behavior;
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Get all recorded jobs.
    pub async fn recorded_jobs(&self) -> Vec<EditJob> {
        self.jobs.read().await.clone()
    }

    /// Get the number of runs performed.
    pub async fn run_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Highest number of runs that were in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }
}

/// Decrements the active counter even when the run panics.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EditExecutor for MockExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, job: &EditJob, deadline: Duration) -> Result<EditOutcome, EditorError> {
        self.jobs.write().await.push(job.clone());

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(Arc::clone(&self.active));

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay.min(deadline)).await;
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let behavior = self.behavior.read().await.clone();
        match behavior {
            MockBehavior::Succeed => {
                tokio::fs::copy(&job.input_path, &job.output_path).await?;
                Ok(EditOutcome::Success {
                    output_path: job.output_path.clone(),
                    duration_ms: delay.as_millis() as u64,
                })
            }
            MockBehavior::Fail { exit_code, stderr } => {
                // Tools commonly leave a partial output behind on failure.
                tokio::fs::write(&job.output_path, b"partial").await?;
                Ok(EditOutcome::ToolFailure {
                    exit_code: Some(exit_code),
                    stderr,
                })
            }
            MockBehavior::Hang => {
                tokio::time::sleep(deadline.saturating_sub(delay)).await;
                Ok(EditOutcome::Timeout { deadline })
            }
            MockBehavior::Error(reason) => Err(EditorError::Io(std::io::Error::other(reason))),
            MockBehavior::Panic(message) => {
                tokio::fs::write(&job.output_path, b"partial").await?;
                panic!("{}", message)
            }
        }
    }

    async fn validate(&self) -> Result<(), EditorError> {
        Ok(())
    }
}
