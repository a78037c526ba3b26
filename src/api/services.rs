//! Route handlers (§6, §10.1). Body-size limiting is applied by
//! `DefaultBodyLimit` at the router layer in `server.rs`; handlers here only
//! validate shape and business rules.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use super::{
    auth::{self, AuthUser},
    error::ApiError,
    models::{CreateJobRequest, CreateJobResponse, HealthResponse, HistoryQuery, HistoryResponse, LoginRequest, LoginResponse},
    state::AppState,
    validation::validate_create_job,
};
use crate::events::ingress::{JobCompletedRequest, MissingFailureReason, normalize_minio_webhook};
use crate::model::{JobStatus, StreamEvent};
use crate::store::clamp_limit;

/// `POST /jobs` (§6): creates a Job in `AWAITING_UPLOAD` and returns a
/// presigned-URL stand-in under `uploads/<job_id>/<filename>`.
pub async fn create_job(State(state): State<AppState>, _auth: AuthUser, Json(request): Json<CreateJobRequest>) -> Result<impl IntoResponse, ApiError> {
    validate_create_job(&request).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    let job_id = Uuid::now_v7().to_string();
    let bucket = state.storage.bucket.clone();
    let key = format!("uploads/{job_id}/{}", request.filename);

    state.store.create_job_if_missing(&job_id, &bucket, &key, JobStatus::AwaitingUpload).await?;
    state.metrics.job_accepted();

    let response = CreateJobResponse {
        job_id,
        upload_url: format!("https://{bucket}.storage.local/{key}?upload-token=stand-in"),
        bucket,
        key,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /jobs/{job_id}`.
pub async fn get_job(State(state): State<AppState>, _auth: AuthUser, Path(job_id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let job = state.store.get_job(&job_id).await?.ok_or_else(|| ApiError::NotFound(format!("job {job_id}")))?;
    Ok(Json(job))
}

/// `GET /jobs/{job_id}/result`.
pub async fn get_result(State(state): State<AppState>, _auth: AuthUser, Path(job_id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .store
        .get_result(&job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("result for job {job_id}")))?;
    Ok(Json(result))
}

/// `GET /history?limit=`.
pub async fn history(State(state): State<AppState>, _auth: AuthUser, Query(query): Query<HistoryQuery>) -> Result<impl IntoResponse, ApiError> {
    let limit = clamp_limit(query.limit.unwrap_or(50));
    let jobs = state.store.list_jobs(limit).await?;
    Ok(Json(HistoryResponse { jobs }))
}

/// `POST /auth/login`: issues a bearer token for the configured username/password.
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<impl IntoResponse, ApiError> {
    let expected_password = state
        .config
        .auth
        .password
        .as_deref()
        .ok_or_else(|| ApiError::Internal("auth password not configured".to_string()))?;
    let secret = state
        .config
        .auth
        .jwt_secret
        .as_deref()
        .ok_or_else(|| ApiError::Internal("JWT secret not configured".to_string()))?;

    if request.username != state.config.auth.username || request.password != expected_password {
        return Err(ApiError::Unauthorized("invalid username or password".to_string()));
    }

    let (token, expires_in) = auth::issue_token(&request.username, secret, &state.config.auth.jwt_issuer, state.config.auth.jwt_ttl_seconds)?;
    Ok(Json(LoginResponse { token, expires_in }))
}

/// `GET /healthz`: liveness, no auth (§6).
pub async fn healthz(State(_state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let response = HealthResponse {
        status: "healthy".to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

/// `POST /minio/webhook` (§4.7, §6): normalizes a provider `Records` envelope
/// into `ObjectCreated` events. Records missing `bucket`/`key` are dropped.
pub async fn minio_webhook(State(state): State<AppState>, Json(body): Json<serde_json::Value>) -> Result<impl IntoResponse, ApiError> {
    let events = normalize_minio_webhook(&body);
    let published = events.len();
    for event in events {
        state.stream.publish(event).await?;
    }
    Ok(Json(serde_json::json!({ "published": published })))
}

/// `POST /events/job-completed` (§4.7, §6): forwards a direct `JobCompleted`
/// submission unchanged. Unlike webhook records, a malformed submission is
/// rejected rather than dropped.
pub async fn job_completed(State(state): State<AppState>, Json(request): Json<JobCompletedRequest>) -> Result<impl IntoResponse, ApiError> {
    let event: StreamEvent = request.try_into().map_err(|e: MissingFailureReason| ApiError::InvalidPayload(e.to_string()))?;
    state.stream.publish(event).await?;
    Ok(Json(serde_json::json!({ "published": 1 })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::events::local::LocalEventStream;
    use crate::observability::Metrics;
    use crate::queue::local::LocalQueue;
    use crate::storage::StorageClient;
    use crate::store::local::LocalStore;

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        let mut config = Config::default();
        config.auth.password = Some("s3cret".to_string());
        config.auth.jwt_secret = Some("test-signing-secret".to_string());

        let store = Arc::new(LocalStore::open(dir.path().join("store")).unwrap());
        let queue = Arc::new(LocalQueue::open(dir.path().join("queue")).unwrap());
        let stream = Arc::new(LocalEventStream::open(dir.path().join("stream")).unwrap());
        let storage = StorageClient::in_memory();
        let metrics = Arc::new(Metrics::new());

        AppState::new(config, store, queue, stream, storage, metrics)
    }

    fn router(state: AppState) -> axum::Router {
        super::super::server::build_router(state)
    }

    #[tokio::test]
    async fn healthz_requires_no_auth() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(&dir));

        let response = app
            .oneshot(axum::http::Request::builder().uri("/healthz").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_job_without_token_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(&dir));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/jobs")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(r#"{"filename":"sample.mp4"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_then_create_job_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let app = router(state.clone());

        let login_response = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/auth/login")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(r#"{"username":"admin","password":"s3cret"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(login_response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(login_response.into_body(), usize::MAX).await.unwrap();
        let login: LoginResponse = serde_json::from_slice(&body).unwrap();

        let create_response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/jobs")
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {}", login.token))
                    .body(axum::body::Body::from(r#"{"filename":"sample.mp4"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(create_response.status(), StatusCode::CREATED);
    }
}
