//! Durable keyed storage for the three logical tables the pipeline needs:
//! `jobs`, `results`, `idempotency` (§4.2). Two backends share this trait —
//! one embedded (Fjall, single-node), one managed (Postgres) — so the rest of
//! the system is written once against [`StateStore`] and the backend is a
//! configuration choice, not a compile-time branch.

pub mod error;
pub mod local;
pub mod managed;

pub use error::{Result, StoreError};
pub use local::LocalStore;
pub use managed::ManagedStore;

use async_trait::async_trait;

use crate::model::{Job, JobResult, JobStatus};

/// Clamp a `list_jobs` limit to the documented `[1, 200]` range (§8).
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, 200)
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Insert a job row iff `job_id` is absent. Silent no-op on conflict.
    async fn create_job_if_missing(
        &self,
        job_id: &str,
        bucket: &str,
        key: &str,
        status: JobStatus,
    ) -> Result<()>;

    /// Unconditional update of status/timestamps/error fields. Missing job is
    /// not an error. On transition into `SUCCEEDED`, error fields are cleared
    /// regardless of what the caller passed (Design Decision D1).
    async fn update_job(
        &self,
        job_id: &str,
        status: JobStatus,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Result<()>;

    async fn get_job(&self, job_id: &str) -> Result<Option<Job>>;

    /// Most-recent-first scan (by `created_at`, stable tie-break by `job_id`),
    /// capped at `limit ∈ [1, 200]`.
    async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>>;

    /// Upsert by `job_id`.
    async fn store_result(&self, job_id: &str, metadata: serde_json::Value, summary: String) -> Result<()>;

    async fn get_result(&self, job_id: &str) -> Result<Option<JobResult>>;

    /// Conditional insert. Returns `true` iff the row was newly created;
    /// `false` if it already existed. Must be atomic w.r.t. concurrent callers.
    async fn try_claim_idempotency(&self, idempotency_key: &str, job_id: &str) -> Result<bool>;
}
