//! Fjall-backed embedded Work Queue + DLQ. JSON payloads (the corpus's
//! protobuf plumbing was never wired to a `.proto`/`build.rs`, and §6 of the
//! wire format specifies JSON anyway).

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde_json::json;
use tracing::{debug, info};

use super::error::Result;
use super::{DlqEntry, Receipt, WorkQueue};

pub struct LocalQueue {
    keyspace: Keyspace,
    tasks: PartitionHandle,
    inflight: PartitionHandle,
    dlq: PartitionHandle,
    next_task_seq: AtomicU64,
    next_dlq_seq: AtomicU64,
}

impl LocalQueue {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening local work queue");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let tasks = keyspace.open_partition("tasks", PartitionCreateOptions::default())?;
        let inflight = keyspace.open_partition("inflight", PartitionCreateOptions::default())?;
        let dlq = keyspace.open_partition("dlq", PartitionCreateOptions::default())?;

        let next_task_seq = max_key_seq(&tasks)?.max(max_key_seq(&inflight)?) + 1;
        let next_dlq_seq = max_key_seq(&dlq)? + 1;

        Ok(Self {
            keyspace,
            tasks,
            inflight,
            dlq,
            next_task_seq: AtomicU64::new(next_task_seq),
            next_dlq_seq: AtomicU64::new(next_dlq_seq),
        })
    }

    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}

fn max_key_seq(partition: &PartitionHandle) -> Result<u64> {
    let mut max = 0u64;
    for item in partition.iter() {
        let (key, _) = item?;
        let seq = u64::from_be_bytes(key.as_ref().try_into().unwrap_or([0u8; 8]));
        max = max.max(seq);
    }
    Ok(max)
}

#[async_trait]
impl WorkQueue for LocalQueue {
    async fn enqueue_process_video(&self, job_id: &str, bucket: &str, key: &str) -> Result<()> {
        let seq = self.next_task_seq.fetch_add(1, Ordering::SeqCst);
        let payload = json!({
            "message_type": "ProcessVideo",
            "job_id": job_id,
            "bucket": bucket,
            "key": key,
        });
        self.tasks
            .insert(seq.to_be_bytes(), serde_json::to_vec(&payload)?)?;
        debug!(seq, job_id, "enqueued ProcessVideo");
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<(Receipt, serde_json::Value)>> {
        let Some(item) = self.tasks.iter().next() else {
            return Ok(None);
        };
        let (key, value) = item?;
        let payload: serde_json::Value = serde_json::from_slice(&value)?;

        self.inflight.insert(&key, &value)?;
        self.tasks.remove(&key)?;

        let seq = u64::from_be_bytes(key.as_ref().try_into().unwrap_or([0u8; 8]));
        Ok(Some((Receipt(seq.to_string()), payload)))
    }

    async fn ack(&self, receipt: &Receipt) -> Result<()> {
        let seq: u64 = receipt
            .0
            .parse()
            .map_err(|_| super::QueueError::InvalidReceipt(receipt.0.clone()))?;
        self.inflight.remove(seq.to_be_bytes())?;
        Ok(())
    }

    async fn push_dlq(&self, entry: DlqEntry) -> Result<()> {
        let seq = self.next_dlq_seq.fetch_add(1, Ordering::SeqCst);
        self.dlq
            .insert(seq.to_be_bytes(), serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    async fn drain_dlq(&self, limit: usize) -> Result<Vec<DlqEntry>> {
        let mut drained = Vec::new();
        for item in self.dlq.iter().take(limit) {
            let (key, value) = item?;
            drained.push((key, serde_json::from_slice::<DlqEntry>(&value)?));
        }
        for (key, _) in &drained {
            self.dlq.remove(key)?;
        }
        Ok(drained.into_iter().map(|(_, entry)| entry).collect())
    }
}
