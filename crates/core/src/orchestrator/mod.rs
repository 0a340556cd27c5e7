//! Job orchestrator.
//!
//! Owns the lifecycle of every job:
//! - **Ingestion**: inline with submission; failures are returned to the caller
//! - **Execution**: background task, capped by a semaphore and a hard deadline
//! - **Placement**: one attempt, degrading to local-only on remote failure
//!
//! A supervising task records `Failed` if the background pipeline panics, so
//! no job is left in `Processing` and no input file leaks.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::JobOrchestrator;
pub use types::{
    ArtifactRetrieval, DeliveryGuard, LocalArtifact, OrchestratorError, OrchestratorStatus,
    SubmitReceipt,
};
