//! Edit execution.
//!
//! Wraps the external `auto-editor` tool. The executor only reports how a
//! run ended; mapping outcomes to job states is the orchestrator's job.

mod auto_editor;
mod config;
mod error;
mod traits;
mod types;

pub use auto_editor::AutoEditorExecutor;
pub use config::EditorConfig;
pub use error::EditorError;
pub use traits::EditExecutor;
pub use types::{humanize_duration, EditJob, EditOptions, EditOutcome};
