//! auto-editor process executor.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Duration};
use tracing::{debug, info, warn};

use super::config::EditorConfig;
use super::error::EditorError;
use super::traits::EditExecutor;
use super::types::{EditJob, EditOutcome};

/// Runs `auto-editor <input> -o <output> [options]` as a child process.
pub struct AutoEditorExecutor {
    config: EditorConfig,
}

impl AutoEditorExecutor {
    pub fn new(config: EditorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(EditorConfig::default())
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Builds the full argument list for one job.
    pub fn build_args(&self, job: &EditJob) -> Vec<String> {
        let mut args = self.config.global_args.clone();
        args.push(job.input_path.to_string_lossy().into_owned());
        args.push("-o".to_string());
        args.push(job.output_path.to_string_lossy().into_owned());
        args.extend(job.options.to_args());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> EditorError {
        if e.kind() == std::io::ErrorKind::NotFound {
            EditorError::BinaryNotFound {
                path: self.config.binary_path.clone(),
            }
        } else {
            EditorError::Io(e)
        }
    }
}

#[async_trait]
impl EditExecutor for AutoEditorExecutor {
    fn name(&self) -> &str {
        "auto-editor"
    }

    async fn run(&self, job: &EditJob, deadline: Duration) -> Result<EditOutcome, EditorError> {
        if !tokio::fs::try_exists(&job.input_path).await? {
            return Err(EditorError::InputNotFound {
                path: job.input_path.clone(),
            });
        }
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(job);
        debug!(job_id = %job.job_id, binary = %self.config.binary_path.display(), ?args, "Spawning auto-editor");

        let start = Instant::now();
        let deadline_at = tokio::time::Instant::now() + deadline;

        let mut command = Command::new(&self.config.binary_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // auto-editor starts ffmpeg; a group kill reaches it too.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;
        let process_group = child.id();
        let capture = StderrCapture::start(child.stderr.take());

        let status = match timeout_at(deadline_at, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    job_id = %job.job_id,
                    deadline_secs = deadline.as_secs(),
                    "auto-editor exceeded deadline, killing process group"
                );
                kill_process_group(process_group);
                if let Err(e) = child.kill().await {
                    warn!(job_id = %job.job_id, error = %e, "Failed to kill auto-editor process");
                }
                return Ok(EditOutcome::Timeout { deadline });
            }
        };

        // Whatever the tool left behind in its group is orphaned now.
        kill_process_group(process_group);
        let stderr = capture.finish(deadline_at).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if !status.success() {
            info!(
                job_id = %job.job_id,
                exit_code = ?status.code(),
                duration_ms,
                "auto-editor failed"
            );
            return Ok(EditOutcome::ToolFailure {
                exit_code: status.code(),
                stderr,
            });
        }

        if !output_exists(&job.output_path).await {
            return Err(EditorError::OutputMissing {
                path: job.output_path.clone(),
            });
        }

        info!(job_id = %job.job_id, duration_ms, "auto-editor finished");
        Ok(EditOutcome::Success {
            output_path: job.output_path.clone(),
            duration_ms,
        })
    }

    async fn validate(&self) -> Result<(), EditorError> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            warn!(
                binary = %self.config.binary_path.display(),
                "auto-editor --version exited with {:?}",
                output.status.code()
            );
        }
        Ok(())
    }
}

async fn output_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Reads the tool's stderr in the background.
///
/// Drained concurrently so a chatty tool never blocks on a full pipe.
struct StderrCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl StderrCapture {
    fn start(stderr: Option<ChildStderr>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let task = stderr.map(|mut stderr| {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move {
                let mut chunk = [0u8; 4096];
                loop {
                    match stderr.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&chunk[..n]),
                    }
                }
            })
        });
        Self { buf, task }
    }

    /// Waits for the pipe to close, but not past `deadline_at`.
    ///
    /// A process outside the group can keep the pipe open; in that case the
    /// text read so far is returned.
    async fn finish(mut self, deadline_at: tokio::time::Instant) -> String {
        if let Some(mut task) = self.task.take() {
            if timeout_at(deadline_at, &mut task).await.is_err() {
                debug!("stderr still open at deadline");
                task.abort();
            }
        }
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Drop for StderrCapture {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Sends SIGKILL to every process in the group led by the tool.
#[cfg(unix)]
fn kill_process_group(pgid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pgid else { return };
    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<u32>) {}
