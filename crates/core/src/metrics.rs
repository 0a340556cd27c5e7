//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job submission and terminal outcomes
//! - Edit tool executions
//! - Artifact placement and file retention

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs submitted total by source.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("autotrim_jobs_submitted_total", "Total jobs submitted"),
        &["source"], // "upload", "url"
    )
    .unwrap()
});

/// Jobs reaching a terminal state by result.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "autotrim_jobs_finished_total",
            "Total jobs that reached a terminal state",
        ),
        &["result"], // "completed", "ingest_failed", "tool_failed", "timeout", "error"
    )
    .unwrap()
});

// =============================================================================
// Executions
// =============================================================================

/// Edit tool execution duration in seconds.
pub static EXECUTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "autotrim_execution_duration_seconds",
            "Duration of edit tool executions",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
        &["outcome"], // "success", "tool_failure", "timeout", "error"
    )
    .unwrap()
});

/// Edit tool processes currently running.
pub static ACTIVE_EXECUTIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "autotrim_active_executions",
        "Edit tool processes currently running",
    )
    .unwrap()
});

// =============================================================================
// Placement & Retention
// =============================================================================

/// Artifact placements total by result.
pub static PLACEMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("autotrim_placements_total", "Total artifact placements"),
        &["result"], // "local", "remote", "remote_failed"
    )
    .unwrap()
});

/// File deletions requested through the retention manager.
pub static FILES_DELETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "autotrim_files_deleted_total",
            "Total scratch file deletions by trigger and outcome",
        ),
        &["trigger", "outcome"], // outcome: "deleted", "absent", "error"
    )
    .unwrap()
});

/// Returns every core metric for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(EXECUTION_DURATION.clone()),
        Box::new(ACTIVE_EXECUTIONS.clone()),
        Box::new(PLACEMENTS_TOTAL.clone()),
        Box::new(FILES_DELETED.clone()),
    ]
}
