//! API request/response shapes for the job-submission and status surface
//! (§10.1, §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Job, JobResult};

/// `POST /jobs` body. Creates a Job in `AWAITING_UPLOAD` for the given
/// filename; the Job's `(bucket, key)` is fixed at `uploads/<job_id>/<filename>`
/// (§6: this layout is load-bearing for the Orchestrator's key parsing).
#[derive(Debug, Deserialize, Clone)]
pub struct CreateJobRequest {
    pub filename: String,
}

/// Response to `POST /jobs`: a presigned-URL stand-in the caller uploads to.
/// This crate does not implement real presigning (no credential-scoped URL
/// signing service is in scope); `upload_url` is a stand-in pointing at the
/// same `(bucket, key)` the Orchestrator will later derive `job_id` from.
#[derive(Debug, Serialize, Clone)]
pub struct CreateJobResponse {
    pub job_id: String,
    pub bucket: String,
    pub key: String,
    pub upload_url: String,
}

/// `GET /jobs/{job_id}` response: the Job row verbatim.
pub type JobSnapshot = Job;

/// `GET /jobs/{job_id}/result` response: the Result row verbatim.
pub type ResultSnapshot = JobResult;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
