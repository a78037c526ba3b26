//! Work Queue + DLQ (§4.6 / §2 item 3): a FIFO queue of `ProcessVideo`
//! messages for Workers, paired with a dead-letter queue of classified
//! failures consumed only by the DLQ Analyzer.

pub mod error;
pub mod local;
pub mod managed;

pub use error::{QueueError, Result};
pub use local::LocalQueue;
pub use managed::ManagedQueue;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque handle returned by `dequeue`, passed back to `ack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt(pub String);

/// A DLQ entry: the classified failure plus enough of the original message
/// to retry or investigate it (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    pub job_id: String,
    pub bucket: String,
    pub key: String,
    pub error_code: String,
    pub error_message: String,
    pub recommendation: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue a `ProcessVideo` message.
    async fn enqueue_process_video(&self, job_id: &str, bucket: &str, key: &str) -> Result<()>;

    /// Dequeue the oldest pending message, if any. The message is moved to an
    /// in-flight set until `ack`ed; unknown `message_type` payloads are
    /// returned as-is so the caller can log-and-drop per §8.
    async fn dequeue(&self) -> Result<Option<(Receipt, serde_json::Value)>>;

    /// Acknowledge a dequeued message, removing it from the in-flight set.
    async fn ack(&self, receipt: &Receipt) -> Result<()>;

    async fn push_dlq(&self, entry: DlqEntry) -> Result<()>;

    /// Drain up to `limit` DLQ entries (removing them). The DLQ Analyzer is
    /// the only caller.
    async fn drain_dlq(&self, limit: usize) -> Result<Vec<DlqEntry>>;
}
