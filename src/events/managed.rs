//! Postgres-backed managed Event Stream.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::model::StreamEvent;

use super::error::Result;
use super::{EventStream, STREAM_CAPACITY};

pub struct ManagedEventStream {
    pool: PgPool,
}

impl ManagedEventStream {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        let stream = Self { pool };
        stream.migrate().await?;
        Ok(stream)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stream_events (
                id BIGSERIAL PRIMARY KEY,
                payload JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stream_acked (
                group_name TEXT NOT NULL,
                event_id BIGINT NOT NULL,
                PRIMARY KEY (group_name, event_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS stream_consumer_groups (name TEXT PRIMARY KEY)"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl EventStream for ManagedEventStream {
    async fn publish(&self, event: StreamEvent) -> Result<String> {
        let payload = serde_json::to_value(&event)?;
        let row = sqlx::query("INSERT INTO stream_events (payload) VALUES ($1) RETURNING id")
            .bind(payload)
            .fetch_one(&self.pool)
            .await?;
        let id: i64 = row.try_get("id")?;

        sqlx::query(
            r#"
            DELETE FROM stream_events
            WHERE id <= (SELECT COALESCE(MAX(id), 0) FROM stream_events) - $1
            "#,
        )
        .bind(STREAM_CAPACITY as i64)
        .execute(&self.pool)
        .await?;

        Ok(id.to_string())
    }

    async fn ensure_consumer_group(&self, group: &str) -> Result<()> {
        sqlx::query("INSERT INTO stream_consumer_groups (name) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(group)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn read_group(
        &self,
        group: &str,
        _consumer: &str,
        count: usize,
    ) -> Result<Vec<(String, serde_json::Value)>> {
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.payload
            FROM stream_events e
            WHERE NOT EXISTS (
                SELECT 1 FROM stream_acked a WHERE a.group_name = $1 AND a.event_id = e.id
            )
            ORDER BY e.id ASC
            LIMIT $2
            "#,
        )
        .bind(group)
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let payload: serde_json::Value = row.try_get("payload")?;
            out.push((id.to_string(), payload));
        }
        Ok(out)
    }

    async fn ack(&self, group: &str, id: &str) -> Result<()> {
        let event_id: i64 = id
            .parse()
            .map_err(|_| super::EventStreamError::InvalidEventId(id.to_string()))?;
        sqlx::query(
            "INSERT INTO stream_acked (group_name, event_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(group)
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
