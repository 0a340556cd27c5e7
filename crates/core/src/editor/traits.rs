//! Trait definitions for the editor module.

use async_trait::async_trait;
use std::time::Duration;

use super::error::EditorError;
use super::types::{EditJob, EditOutcome};

/// Runs the external editing tool on one input.
#[async_trait]
pub trait EditExecutor: Send + Sync {
    /// Returns the name of this executor implementation.
    fn name(&self) -> &str;

    /// Runs one execution, bounded by `deadline`.
    ///
    /// When the deadline elapses the process must be terminated before
    /// returning [`EditOutcome::Timeout`].
    async fn run(&self, job: &EditJob, deadline: Duration) -> Result<EditOutcome, EditorError>;

    /// Checks that the tool is installed and runnable.
    async fn validate(&self) -> Result<(), EditorError>;
}
