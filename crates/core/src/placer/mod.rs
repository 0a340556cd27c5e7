//! Artifact placement.
//!
//! When a remote bucket is configured, finished outputs are uploaded once
//! and served through presigned URLs; otherwise they stay on local disk.
//! A failed upload never fails the job. The output is kept locally and
//! the job completes in a degraded, local-only state.

mod config;
mod error;
mod placer;
mod s3;
mod traits;
mod types;

pub use config::{PlacementConfig, RemoteStoreConfig};
pub use error::PlacerError;
pub use placer::ArtifactPlacer;
pub use s3::S3BlobStore;
pub use traits::BlobStore;
pub use types::PlacementOutcome;
