//! Asset ingestion.
//!
//! Produces the local input file of a job, either from an upload stream
//! or by fetching a remote URL. Remote fetches are bounded by a timeout
//! and never retried.

mod config;
mod error;
mod fetcher;
mod ingestor;

pub use config::IngestConfig;
pub use error::IngestError;
pub use fetcher::{parse_fetch_url, HttpFetcher, RemoteFetcher};
pub use ingestor::{extension_from_name, extension_from_url, AssetIngestor, IngestedAsset};
