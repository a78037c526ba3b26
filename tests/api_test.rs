//! Integration tests for the HTTP API (§10.1, §10.5): exercises the router
//! end-to-end with `tower::ServiceExt::oneshot` against in-memory/temp-dir
//! backends, no network involved.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use videopipe::api::models::{CreateJobResponse, LoginResponse};
use videopipe::api::state::AppState;
use videopipe::config::Config;
use videopipe::events::LocalEventStream;
use videopipe::observability::Metrics;
use videopipe::queue::LocalQueue;
use videopipe::storage::StorageClient;
use videopipe::store::LocalStore;

fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.password = Some("s3cret".to_string());
    config.auth.jwt_secret = Some("test-signing-secret".to_string());
    config
}

async fn build_test_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let store = Arc::new(LocalStore::open(temp_dir.path().join("store")).unwrap());
    let queue = Arc::new(LocalQueue::open(temp_dir.path().join("queue")).unwrap());
    let stream = Arc::new(LocalEventStream::open(temp_dir.path().join("stream")).unwrap());
    let storage = StorageClient::in_memory();
    let metrics = Arc::new(Metrics::new());

    let state = AppState::new(test_config(), store, queue, stream, storage, metrics);
    let app = Router::new()
        .route("/jobs", axum::routing::post(videopipe::api::services::create_job))
        .route("/jobs/{job_id}", axum::routing::get(videopipe::api::services::get_job))
        .route("/jobs/{job_id}/result", axum::routing::get(videopipe::api::services::get_result))
        .route("/history", axum::routing::get(videopipe::api::services::history))
        .route("/auth/login", axum::routing::post(videopipe::api::services::login))
        .route("/healthz", axum::routing::get(videopipe::api::services::healthz))
        .route("/minio/webhook", axum::routing::post(videopipe::api::services::minio_webhook))
        .route("/events/job-completed", axum::routing::post(videopipe::api::services::job_completed))
        .with_state(state);

    (app, temp_dir)
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"username": "admin", "password": "s3cret"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let login: LoginResponse = serde_json::from_slice(&body).unwrap();
    login.token
}

#[tokio::test]
async fn healthz_is_public() {
    let (app, _dir) = build_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn jobs_require_a_bearer_token() {
    let (app, _dir) = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"filename": "sample.mp4"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejects_login_with_wrong_password() {
    let (app, _dir) = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"username": "admin", "password": "wrong"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_job_then_fetch_it_through_history() {
    let (app, _dir) = build_test_app().await;
    let token = login(&app).await;

    let create_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(json!({"filename": "sample.mp4"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create_response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(create_response.into_body(), usize::MAX).await.unwrap();
    let created: CreateJobResponse = serde_json::from_slice(&body).unwrap();
    assert!(created.key.starts_with(&format!("uploads/{}/", created.job_id)));

    let get_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{}", created.job_id))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);

    let history_response = app
        .oneshot(
            Request::builder()
                .uri("/history")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(history_response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(history_response.into_body(), usize::MAX).await.unwrap();
    let history: Value = serde_json::from_slice(&body).unwrap();
    let jobs = history["jobs"].as_array().unwrap();
    assert!(jobs.iter().any(|j| j["job_id"] == created.job_id));
}

#[tokio::test]
async fn missing_job_result_is_404() {
    let (app, _dir) = build_test_app().await;
    let token = login(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/jobs/does-not-exist/result")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn minio_webhook_drops_records_missing_bucket_or_key() {
    let (app, _dir) = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/minio/webhook")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"Records": [{"s3": {"object": {"key": "uploads/abc/v.mp4"}}}]}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["published"], 0);
}

#[tokio::test]
async fn rejects_filenames_with_path_separators() {
    let (app, _dir) = build_test_app().await;
    let token = login(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(json!({"filename": "../escape.mp4"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
