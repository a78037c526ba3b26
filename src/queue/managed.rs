//! Postgres-backed managed Work Queue + DLQ.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::error::Result;
use super::{DlqEntry, Receipt, WorkQueue};

pub struct ManagedQueue {
    pool: PgPool,
}

impl ManagedQueue {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        let queue = Self { pool };
        queue.migrate().await?;
        Ok(queue)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS work_queue (
                id BIGSERIAL PRIMARY KEY,
                payload JSONB NOT NULL,
                inflight BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dead_letter_queue (
                id BIGSERIAL PRIMARY KEY,
                job_id TEXT NOT NULL,
                bucket TEXT NOT NULL,
                key TEXT NOT NULL,
                error_code TEXT NOT NULL,
                error_message TEXT NOT NULL,
                recommendation TEXT NOT NULL,
                attempts INT NOT NULL,
                failed_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl WorkQueue for ManagedQueue {
    async fn enqueue_process_video(&self, job_id: &str, bucket: &str, key: &str) -> Result<()> {
        let payload = serde_json::json!({
            "message_type": "ProcessVideo",
            "job_id": job_id,
            "bucket": bucket,
            "key": key,
        });
        sqlx::query("INSERT INTO work_queue (payload) VALUES ($1)")
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<(Receipt, serde_json::Value)>> {
        let row = sqlx::query(
            r#"
            UPDATE work_queue
            SET inflight = TRUE
            WHERE id = (
                SELECT id FROM work_queue
                WHERE inflight = FALSE
                ORDER BY id ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, payload
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: i64 = row.try_get("id")?;
        let payload: serde_json::Value = row.try_get("payload")?;
        Ok(Some((Receipt(id.to_string()), payload)))
    }

    async fn ack(&self, receipt: &Receipt) -> Result<()> {
        let id: i64 = receipt
            .0
            .parse()
            .map_err(|_| super::QueueError::InvalidReceipt(receipt.0.clone()))?;
        sqlx::query("DELETE FROM work_queue WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn push_dlq(&self, entry: DlqEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dead_letter_queue
                (job_id, bucket, key, error_code, error_message, recommendation, attempts, failed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.job_id)
        .bind(entry.bucket)
        .bind(entry.key)
        .bind(entry.error_code)
        .bind(entry.error_message)
        .bind(entry.recommendation)
        .bind(entry.attempts as i32)
        .bind(entry.failed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn drain_dlq(&self, limit: usize) -> Result<Vec<DlqEntry>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, job_id, bucket, key, error_code, error_message, recommendation, attempts, failed_at
            FROM dead_letter_queue
            ORDER BY id ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&mut *tx)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get::<i64, _>("id")?);
            entries.push(DlqEntry {
                job_id: row.try_get("job_id")?,
                bucket: row.try_get("bucket")?,
                key: row.try_get("key")?,
                error_code: row.try_get("error_code")?,
                error_message: row.try_get("error_message")?,
                recommendation: row.try_get("recommendation")?,
                attempts: row.try_get::<i32, _>("attempts")? as u32,
                failed_at: row.try_get("failed_at")?,
            });
        }

        if !ids.is_empty() {
            sqlx::query("DELETE FROM dead_letter_queue WHERE id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(entries)
    }
}
