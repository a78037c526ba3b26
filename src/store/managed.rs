//! Postgres-backed managed State Store.
//!
//! Stands in for the original system's managed NoSQL backend (a real remote
//! datastore reached over the network, with conditional-put semantics). The
//! corpus carries no AWS SDK or Redis client anywhere, but `sqlx`/Postgres is
//! used elsewhere in the wider example pack for exactly this kind of
//! job/event persistence, so it is the grounded choice here (see DESIGN.md).
//!
//! Design Decision D2: the managed backend always writes `error_code` /
//! `error_message` as empty strings rather than SQL NULL (matching the
//! original DynamoDB-backed implementation's `update_item` behavior), and
//! normalizes empty string back to `None` on every read. This keeps
//! `update_job`'s "unconditional update" contract backend-agnostic while
//! reproducing the original's on-the-wire quirk rather than papering over it.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::model::{Job, JobResult, JobStatus};

use super::error::Result;
use super::StateStore;

pub struct ManagedStore {
    pool: PgPool,
}

impl ManagedStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                job_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                bucket TEXT NOT NULL,
                key TEXT NOT NULL,
                error_code TEXT NOT NULL DEFAULT '',
                error_message TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_results (
                job_id TEXT PRIMARY KEY,
                metadata JSONB NOT NULL,
                summary TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS idempotency (
                idempotency_key TEXT PRIMARY KEY,
                job_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_job(row: JobRow) -> Job {
        Job {
            job_id: row.job_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            bucket: row.bucket,
            key: row.key,
            error_code: normalize_empty(row.error_code),
            error_message: normalize_empty(row.error_message),
        }
    }
}

fn normalize_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    job_id: String,
    status: JobStatus,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
    bucket: String,
    key: String,
    error_code: String,
    error_message: String,
}

#[async_trait]
impl StateStore for ManagedStore {
    async fn create_job_if_missing(
        &self,
        job_id: &str,
        bucket: &str,
        key: &str,
        status: JobStatus,
    ) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, status, created_at, updated_at, bucket, key)
            VALUES ($1, $2, $3, $3, $4, $5)
            ON CONFLICT (job_id) DO NOTHING
            "#,
        )
        .bind(job_id)
        .bind(status_str(status))
        .bind(now)
        .bind(bucket)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_job(
        &self,
        job_id: &str,
        status: JobStatus,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Result<()> {
        let (error_code, error_message) = if status == JobStatus::Succeeded {
            (String::new(), String::new())
        } else {
            (error_code.unwrap_or_default(), error_message.unwrap_or_default())
        };

        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, updated_at = $2, error_code = $3, error_message = $4
            WHERE job_id = $5
            "#,
        )
        .bind(status_str(status))
        .bind(Utc::now())
        .bind(error_code)
        .bind(error_message)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT job_id, status, created_at, updated_at, bucket, key, error_code, error_message
            FROM jobs WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_job))
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>> {
        let limit = super::clamp_limit(limit) as i64;
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT job_id, status, created_at, updated_at, bucket, key, error_code, error_message
            FROM jobs
            ORDER BY created_at DESC, job_id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_job).collect())
    }

    async fn store_result(&self, job_id: &str, metadata: serde_json::Value, summary: String) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_results (job_id, metadata, summary)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_id) DO UPDATE SET metadata = EXCLUDED.metadata, summary = EXCLUDED.summary
            "#,
        )
        .bind(job_id)
        .bind(metadata)
        .bind(summary)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_result(&self, job_id: &str) -> Result<Option<JobResult>> {
        let row: Option<(serde_json::Value, String)> =
            sqlx::query_as("SELECT metadata, summary FROM job_results WHERE job_id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(metadata, summary)| JobResult {
            job_id: job_id.to_string(),
            metadata,
            summary,
        }))
    }

    async fn try_claim_idempotency(&self, idempotency_key: &str, job_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency (idempotency_key, job_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(idempotency_key)
        .bind(job_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::AwaitingUpload => "AWAITING_UPLOAD",
        JobStatus::Submitted => "SUBMITTED",
        JobStatus::Processing => "PROCESSING",
        JobStatus::Succeeded => "SUCCEEDED",
        JobStatus::Failed => "FAILED",
    }
}

impl sqlx::Type<sqlx::Postgres> for JobStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for JobStatus {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s.as_str() {
            "AWAITING_UPLOAD" => Ok(JobStatus::AwaitingUpload),
            "SUBMITTED" => Ok(JobStatus::Submitted),
            "PROCESSING" => Ok(JobStatus::Processing),
            "SUCCEEDED" => Ok(JobStatus::Succeeded),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}").into()),
        }
    }
}
