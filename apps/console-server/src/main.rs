// [[AGENTDECK]]/apps/console-server/src/main.rs
// Purpose: Entry point. Reads configuration, wires the backend client and starts the server.
// Architecture: Application Boot
// Dependencies: Axum, Tower, Tokio

mod backend;
mod config;
mod error;
mod format;
mod metrics;
mod models;
mod names;
mod observability;
mod policy;
mod reviews;
mod security;
mod server;
#[cfg(test)]
mod test_support;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::backend::HttpBackend;
use crate::config::ConsoleConfig;
use crate::server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing();

    tracing::info!("Initializing AgentDeck console server...");

    let config = ConsoleConfig::from_env().context("Invalid console configuration")?;
    tracing::info!(
        "Backend: {} (timeout {:?}, tail latency {:?})",
        config.backend_base_url,
        config.backend_timeout,
        config.tail_percentile
    );

    let backend = Arc::new(HttpBackend::new(
        config.backend_base_url.clone(),
        config.backend_timeout,
    )?);

    let state = Arc::new(AppState {
        telemetry: backend.clone(),
        reviews: backend,
        options: config.aggregation_options(),
        last_runs_limit: config.last_runs_limit,
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any);
    let cors = match &config.cors_allow_origin {
        Some(origin) => cors.allow_origin(
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS_ALLOW_ORIGIN: {}", origin))?,
        ),
        None => cors.allow_origin(Any),
    };

    let app = server::router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("AgentDeck console server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
