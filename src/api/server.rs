use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::{
    services::{create_job, get_job, get_result, healthz, history, job_completed, login, minio_webhook},
    state::AppState,
};
use crate::backends::{AnyError, open_queue, open_store, open_stream};
use crate::config::Config;
use crate::observability::Metrics;
use crate::shutdown::shutdown_signal;
use crate::storage::StorageClient;

/// Build the router with all job-management, auth, health, and event-ingress
/// routes wired to shared `AppState`. Split out from [`run`] so tests can
/// exercise it in-process with `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> Router {
    let max_payload = state.config.server.api.max_payload_bytes.as_u64() as usize;

    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/{job_id}", get(get_job))
        .route("/jobs/{job_id}/result", get(get_result))
        .route("/history", get(history))
        .route("/auth/login", post(login))
        .route("/healthz", get(healthz))
        .route("/minio/webhook", post(minio_webhook))
        .route("/events/job-completed", post(job_completed))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(DefaultBodyLimit::max(max_payload))
}

/// Load config, open every backend, and serve the HTTP API until shutdown.
pub async fn run() -> Result<(), AnyError> {
    info!("loading configuration");
    let config = Config::load().map_err(|e| format!("failed to load config: {e}"))?;

    let store = open_store(&config).await?;
    let queue = open_queue(&config).await?;
    let stream = open_stream(&config).await?;
    let storage = StorageClient::from_config(&config.storage)?;
    let metrics = Arc::new(Metrics::new());

    let bind_addr = config.server.bind_addr;
    let app = build_router(AppState::new(config, store, queue, stream, storage, metrics));

    let listener = TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "videopipe API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
