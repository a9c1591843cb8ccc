// [[AGENTDECK]]/apps/console-server/src/server/mod.rs
// Purpose: Shared state and route table for the console API.
// Architecture: API Layer
// Dependencies: Axum, tower-http

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::backend::{ReviewSource, TelemetrySource};
use crate::metrics::AggregationOptions;

pub struct AppState {
    pub telemetry: Arc<dyn TelemetrySource>,
    pub reviews: Arc<dyn ReviewSource>,
    pub options: AggregationOptions,
    pub last_runs_limit: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/dashboard/agents", get(handlers::get_agent_rows))
        .route("/api/reviews/repos", get(handlers::list_repos))
        .route("/api/reviews/prs", get(handlers::list_prs))
        .route("/api/reviews/pr/latest", get(handlers::get_latest_review))
        .route("/api/reviews/pr/history", get(handlers::get_pr_history))
        .route("/api/reviews/jobs/:job_id", get(handlers::get_review_by_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
