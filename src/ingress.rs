//! The Event Ingress process (§4.7, §10.4): a standalone HTTP server hosting
//! only the webhook-normalization and direct-submission endpoints, so it can
//! scale and deploy independently of the job-management API.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::post,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::backends::{AnyError, open_stream};
use crate::config::Config;
use crate::events::{
    EventStream,
    ingress::{JobCompletedRequest, MissingFailureReason, normalize_minio_webhook},
};
use crate::model::StreamEvent;
use crate::shutdown::shutdown_signal;

#[derive(Clone)]
struct IngressState {
    stream: Arc<dyn EventStream>,
}

async fn minio_webhook(State(state): State<IngressState>, Json(body): Json<serde_json::Value>) -> Result<impl IntoResponse, (axum::http::StatusCode, String)> {
    let events = normalize_minio_webhook(&body);
    let published = events.len();
    for event in events {
        state
            .stream
            .publish(event)
            .await
            .map_err(|e| (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    }
    Ok(Json(serde_json::json!({ "published": published })))
}

async fn job_completed(
    State(state): State<IngressState>,
    Json(request): Json<JobCompletedRequest>,
) -> Result<impl IntoResponse, (axum::http::StatusCode, String)> {
    let event: StreamEvent = request
        .try_into()
        .map_err(|e: MissingFailureReason| (axum::http::StatusCode::BAD_REQUEST, e.to_string()))?;
    state
        .stream
        .publish(event)
        .await
        .map_err(|e| (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(serde_json::json!({ "published": 1 })))
}

pub async fn run() -> Result<(), AnyError> {
    info!("loading configuration");
    let config = Config::load().map_err(|e| format!("failed to load config: {e}"))?;
    let stream = open_stream(&config).await?;

    let app = Router::new()
        .route("/minio/webhook", post(minio_webhook))
        .route("/events/job-completed", post(job_completed))
        .with_state(IngressState { stream })
        .layer(DefaultBodyLimit::max(config.server.api.max_payload_bytes.as_u64() as usize));

    let listener = TcpListener::bind(config.server.ingress_bind_addr).await?;
    info!(bind_addr = %config.server.ingress_bind_addr, "event ingress listening");

    axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
