//! Fjall-backed embedded Event Stream.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use crate::model::StreamEvent;

use super::error::Result;
use super::{EventStream, STREAM_CAPACITY};

pub struct LocalEventStream {
    keyspace: Keyspace,
    stream: PartitionHandle,
    acked: PartitionHandle,
    groups: PartitionHandle,
    next_seq: AtomicU64,
    trim_lock: Mutex<()>,
}

impl LocalEventStream {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening local event stream");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let stream = keyspace.open_partition("stream", PartitionCreateOptions::default())?;
        let acked = keyspace.open_partition("acked", PartitionCreateOptions::default())?;
        let groups = keyspace.open_partition("groups", PartitionCreateOptions::default())?;

        let mut next_seq = 0u64;
        for item in stream.iter() {
            let (key, _) = item?;
            let seq = u64::from_be_bytes(key.as_ref().try_into().unwrap_or([0u8; 8]));
            next_seq = next_seq.max(seq + 1);
        }

        Ok(Self {
            keyspace,
            stream,
            acked,
            groups,
            next_seq: AtomicU64::new(next_seq),
            trim_lock: Mutex::new(()),
        })
    }

    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    fn trim(&self) -> Result<()> {
        let _guard = self.trim_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut count = 0u64;
        for item in self.stream.iter() {
            item?;
            count += 1;
        }
        if count <= STREAM_CAPACITY {
            return Ok(());
        }

        let overshoot = count - STREAM_CAPACITY;
        let mut removed = 0u64;
        for item in self.stream.iter() {
            if removed >= overshoot {
                break;
            }
            let (key, _) = item?;
            self.stream.remove(&key)?;
            removed += 1;
        }
        debug!(removed, "trimmed event stream backlog");
        Ok(())
    }
}

fn acked_key(group: &str, id: &str) -> Vec<u8> {
    format!("{group}:{id}").into_bytes()
}

#[async_trait]
impl EventStream for LocalEventStream {
    async fn publish(&self, event: StreamEvent) -> Result<String> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.stream
            .insert(seq.to_be_bytes(), serde_json::to_vec(&event)?)?;
        self.trim()?;
        Ok(seq.to_string())
    }

    async fn ensure_consumer_group(&self, group: &str) -> Result<()> {
        self.groups.insert(group.as_bytes(), b"1")?;
        Ok(())
    }

    async fn read_group(
        &self,
        group: &str,
        _consumer: &str,
        count: usize,
    ) -> Result<Vec<(String, serde_json::Value)>> {
        let mut out = Vec::with_capacity(count);
        for item in self.stream.iter() {
            if out.len() >= count {
                break;
            }
            let (key, value) = item?;
            let seq = u64::from_be_bytes(key.as_ref().try_into().unwrap_or([0u8; 8]));
            let id = seq.to_string();
            if self.acked.contains_key(acked_key(group, &id))? {
                continue;
            }
            let payload: serde_json::Value = serde_json::from_slice(&value)?;
            out.push((id, payload));
        }
        Ok(out)
    }

    async fn ack(&self, group: &str, id: &str) -> Result<()> {
        self.acked.insert(acked_key(group, id), b"1")?;
        Ok(())
    }
}
