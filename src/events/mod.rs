//! Event Stream (§4.6): an ordered, consumer-grouped log carrying
//! `ObjectCreated` and `JobCompleted` events, with at-least-once delivery,
//! explicit acknowledgment, and a replayable backlog.

pub mod error;
pub mod ingress;
pub mod local;
pub mod managed;

pub use error::{EventStreamError, Result};
pub use local::LocalEventStream;
pub use managed::ManagedEventStream;

use async_trait::async_trait;

use crate::model::StreamEvent;

/// Approximate capacity bound for the backing log (§4.6).
pub const STREAM_CAPACITY: u64 = 10_000;

/// Fixed consumer group name the Orchestrator reads under (§4.3).
pub const ORCHESTRATOR_GROUP: &str = "orchestrator";

#[async_trait]
pub trait EventStream: Send + Sync {
    /// Append to the log, returning the new entry's message id.
    async fn publish(&self, event: StreamEvent) -> Result<String>;

    /// Idempotent create; "already exists" is success.
    async fn ensure_consumer_group(&self, group: &str) -> Result<()>;

    /// Blocking read of up to `count` entries not yet acked by `group`.
    /// Entries become pending for `group` until acked — in this
    /// implementation that's simply "not yet acked", so an entry left
    /// unacked (orchestrator crash, per-event error) is redelivered on the
    /// next read.
    ///
    /// Returns raw JSON rather than a typed [`StreamEvent`] so a consumer can
    /// recognize and drop an unknown `event_type` instead of failing to
    /// deserialize it (§8: unknown discriminators are logged and acked, not
    /// fatal).
    async fn read_group(
        &self,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> Result<Vec<(String, serde_json::Value)>>;

    async fn ack(&self, group: &str, id: &str) -> Result<()>;
}
