//! Error types for the editor module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent an execution from producing an outcome.
///
/// A tool that runs and fails is not an error here; that is
/// [`EditOutcome::ToolFailure`](super::EditOutcome::ToolFailure).
#[derive(Debug, Error)]
pub enum EditorError {
    /// The tool binary could not be found.
    #[error("auto-editor not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The tool exited successfully but wrote no output.
    #[error("Output file not created: {path}")]
    OutputMissing { path: PathBuf },

    /// I/O error while spawning or supervising the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
