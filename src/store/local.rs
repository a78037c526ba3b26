//! Fjall-backed embedded State Store (single-node, file-backed).

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use crate::model::{Job, JobResult, JobStatus};

use super::error::Result;
use super::StateStore;

fn encode_job_key(job_id: &str) -> Vec<u8> {
    format!("job:{job_id}").into_bytes()
}

fn encode_history_key(created_at_millis: i64, job_id: &str) -> Vec<u8> {
    format!("{created_at_millis:020}:{job_id}").into_bytes()
}

fn encode_result_key(job_id: &str) -> Vec<u8> {
    format!("result:{job_id}").into_bytes()
}

fn encode_idem_key(key: &str) -> Vec<u8> {
    format!("idem:{key}").into_bytes()
}

/// Fjall-backed implementation of [`StateStore`].
///
/// `try_claim_idempotency` is the one operation that needs true
/// check-then-act atomicity; everything else is a single Fjall write and is
/// already atomic per key. A process-local mutex around the claim gives the
/// same observable guarantee the managed backend gets from a conditional
/// `INSERT`, since this backend is single-node by construction.
pub struct LocalStore {
    keyspace: Keyspace,
    jobs: PartitionHandle,
    jobs_history: PartitionHandle,
    results: PartitionHandle,
    idempotency: PartitionHandle,
    claim_lock: Mutex<()>,
}

impl LocalStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening local state store");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let jobs = keyspace.open_partition("jobs", PartitionCreateOptions::default())?;
        let jobs_history =
            keyspace.open_partition("jobs_history", PartitionCreateOptions::default())?;
        let results = keyspace.open_partition("results", PartitionCreateOptions::default())?;
        let idempotency =
            keyspace.open_partition("idempotency", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            jobs,
            jobs_history,
            results,
            idempotency,
            claim_lock: Mutex::new(()),
        })
    }

    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStore {
    async fn create_job_if_missing(
        &self,
        job_id: &str,
        bucket: &str,
        key: &str,
        status: JobStatus,
    ) -> Result<()> {
        let job_key = encode_job_key(job_id);
        if self.jobs.contains_key(&job_key)? {
            debug!(job_id, "create_job_if_missing: already present, no-op");
            return Ok(());
        }

        let now = Utc::now();
        let job = Job {
            job_id: job_id.to_string(),
            status,
            created_at: now,
            updated_at: now,
            bucket: bucket.to_string(),
            key: key.to_string(),
            error_code: None,
            error_message: None,
        };

        self.jobs.insert(&job_key, serde_json::to_vec(&job)?)?;
        self.jobs_history.insert(
            encode_history_key(now.timestamp_millis(), job_id),
            job_id.as_bytes(),
        )?;
        debug!(job_id, "job created");
        Ok(())
    }

    async fn update_job(
        &self,
        job_id: &str,
        status: JobStatus,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Result<()> {
        let job_key = encode_job_key(job_id);
        let Some(bytes) = self.jobs.get(&job_key)? else {
            debug!(job_id, "update_job: job not found, no-op");
            return Ok(());
        };

        let mut job: Job = serde_json::from_slice(&bytes)?;
        job.status = status;
        job.updated_at = Utc::now();
        if status == JobStatus::Succeeded {
            job.error_code = None;
            job.error_message = None;
        } else {
            job.error_code = error_code;
            job.error_message = error_message;
        }

        self.jobs.insert(&job_key, serde_json::to_vec(&job)?)?;
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        match self.jobs.get(encode_job_key(job_id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>> {
        let limit = super::clamp_limit(limit);

        let mut entries = Vec::new();
        for item in self.jobs_history.iter() {
            let (_, value) = item?;
            entries.push(String::from_utf8_lossy(&value).to_string());
        }

        let mut jobs = Vec::with_capacity(limit);
        for job_id in entries.into_iter().rev().take(limit) {
            if let Some(job) = self.get_job(&job_id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    async fn store_result(&self, job_id: &str, metadata: serde_json::Value, summary: String) -> Result<()> {
        let result = JobResult {
            job_id: job_id.to_string(),
            metadata,
            summary,
        };
        self.results
            .insert(encode_result_key(job_id), serde_json::to_vec(&result)?)?;
        Ok(())
    }

    async fn get_result(&self, job_id: &str) -> Result<Option<JobResult>> {
        match self.results.get(encode_result_key(job_id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn try_claim_idempotency(&self, idempotency_key: &str, job_id: &str) -> Result<bool> {
        let _guard = self.claim_lock.lock().unwrap_or_else(|e| e.into_inner());
        let key = encode_idem_key(idempotency_key);
        if self.idempotency.contains_key(&key)? {
            return Ok(false);
        }
        self.idempotency.insert(&key, job_id.as_bytes())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (LocalStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().join("store")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn create_job_if_missing_is_idempotent() {
        let (store, _dir) = store();
        store
            .create_job_if_missing("job1", "videos", "uploads/job1/v.mp4", JobStatus::Submitted)
            .await
            .unwrap();
        store
            .create_job_if_missing("job1", "videos", "other-key", JobStatus::Processing)
            .await
            .unwrap();

        let job = store.get_job("job1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Submitted);
        assert_eq!(job.key, "uploads/job1/v.mp4");
    }

    #[tokio::test]
    async fn try_claim_idempotency_once() {
        let (store, _dir) = store();
        assert!(store.try_claim_idempotency("k", "job1").await.unwrap());
        assert!(!store.try_claim_idempotency("k", "job2").await.unwrap());
    }

    #[tokio::test]
    async fn update_job_clears_error_fields_on_success() {
        let (store, _dir) = store();
        store
            .create_job_if_missing("job1", "b", "k", JobStatus::Submitted)
            .await
            .unwrap();
        store
            .update_job(
                "job1",
                JobStatus::Failed,
                Some("bad_media".into()),
                Some("moov atom missing".into()),
            )
            .await
            .unwrap();
        store
            .update_job("job1", JobStatus::Succeeded, None, None)
            .await
            .unwrap();

        let job = store.get_job("job1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(job.error_code.is_none());
        assert!(job.error_message.is_none());
    }

    #[tokio::test]
    async fn update_job_missing_is_noop() {
        let (store, _dir) = store();
        store
            .update_job("missing", JobStatus::Processing, None, None)
            .await
            .unwrap();
        assert!(store.get_job("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_jobs_most_recent_first() {
        let (store, _dir) = store();
        for id in ["job1", "job2", "job3"] {
            store
                .create_job_if_missing(id, "b", "k", JobStatus::Submitted)
                .await
                .unwrap();
        }

        let jobs = store.list_jobs(2).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_id, "job3");
        assert_eq!(jobs[1].job_id, "job2");
    }

    #[tokio::test]
    async fn store_result_is_upsert() {
        let (store, _dir) = store();
        store
            .store_result("job1", serde_json::json!({"codec": "h264"}), "first".into())
            .await
            .unwrap();
        store
            .store_result("job1", serde_json::json!({"codec": "av1"}), "second".into())
            .await
            .unwrap();

        let result = store.get_result("job1").await.unwrap().unwrap();
        assert_eq!(result.summary, "second");
        assert_eq!(result.metadata["codec"], "av1");
    }
}
