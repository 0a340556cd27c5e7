use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, jobs, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit =
        usize::try_from(state.config().server.max_upload_bytes).unwrap_or(usize::MAX);

    // API routes
    let api_routes = Router::new()
        // Health, config and status
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        // Jobs
        .route("/jobs", post(jobs::submit_upload).get(jobs::list_jobs))
        .route("/jobs/url", post(jobs::submit_url))
        .route("/jobs/{id}", get(jobs::get_job).delete(jobs::discard_job))
        .route("/jobs/{id}/download", get(jobs::download))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/", get(handlers::index))
        .route("/metrics", get(handlers::metrics))
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
