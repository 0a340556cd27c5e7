//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam of the orchestrator (the editing tool,
//! the remote store, and remote fetches), so the full job lifecycle can be
//! exercised without auto-editor, S3, or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use autotrim_core::testing::{MockBlobStore, MockExecutor, MockBehavior};
//!
//! let executor = MockExecutor::new().with_delay(Duration::from_millis(50));
//! let blob_store = MockBlobStore::new();
//! blob_store.fail_next_put("bucket unreachable").await;
//! ```

mod mock_blob_store;
mod mock_executor;
mod mock_fetcher;

pub use mock_blob_store::MockBlobStore;
pub use mock_executor::{MockBehavior, MockExecutor};
pub use mock_fetcher::MockFetcher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::editor::EditOptions;

    /// Stand-in bytes for a short video clip.
    pub fn clip_bytes(seconds: u32) -> Vec<u8> {
        let mut data = b"FAKE-MP4".to_vec();
        data.extend((0..seconds * 64).map(|i| (i % 251) as u8));
        data
    }

    /// Options selecting on audio loudness, as used for talking-head clips.
    pub fn audio_edit_options(threshold: f64) -> EditOptions {
        EditOptions::default()
            .with_edit_mode("audio")
            .with_threshold(threshold)
    }
}
