//! Job registry: the only shared mutable structure of the service.
//!
//! Records are created in `Downloading` state and only move forward.
//! Other components never hold a mutable copy; they request changes
//! through the [`JobRegistry`] trait and read snapshots back.

mod registry;
mod types;

pub use registry::{InMemoryJobRegistry, JobError, JobRegistry};
pub use types::{JobArtifact, JobRecord, JobSource, JobState, Retrievability};
