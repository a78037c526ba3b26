//! The Orchestrator (§4.3): the single writer that turns Event Stream
//! entries into durable job decisions and Work Queue messages.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::{EventStream, ORCHESTRATOR_GROUP};
use crate::model::{JobStatus, StreamEvent};
use crate::observability::Metrics;
use crate::queue::WorkQueue;
use crate::store::StateStore;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
    #[error(transparent)]
    Queue(#[from] crate::queue::QueueError),
    #[error(transparent)]
    Stream(#[from] crate::events::EventStreamError),
    #[error("malformed event payload: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Enqueued,
    SkipDuplicate,
}

/// Orchestrator decisions are the unit of testability (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub job_id: String,
    pub idempotency_key: String,
}

/// `job_id_from_s3_key` (§4.3 key-parsing rule): split on `/`; return the
/// second segment iff the first is `"uploads"` and the result has >= 3
/// segments, else `None`.
pub fn job_id_from_s3_key(key: &str) -> Option<String> {
    let parts: Vec<&str> = key.split('/').collect();
    if parts.len() >= 3 && parts[0] == "uploads" {
        Some(parts[1].to_string())
    } else {
        None
    }
}

/// Outcome of handling a single stream entry. `UnknownEventType` and
/// `JobCompletedApplied` both result in an ack with no Decision; only
/// `ObjectCreated` handling produces one (§4.3).
#[derive(Debug)]
pub enum EventOutcome {
    Decision(Decision),
    JobCompletedApplied,
    UnknownEventType,
}

pub struct Orchestrator {
    consumer_name: String,
    stream: Arc<dyn EventStream>,
    store: Arc<dyn StateStore>,
    queue: Arc<dyn WorkQueue>,
    metrics: Arc<Metrics>,
}

impl Orchestrator {
    pub fn new(
        consumer_name: String,
        stream: Arc<dyn EventStream>,
        store: Arc<dyn StateStore>,
        queue: Arc<dyn WorkQueue>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            consumer_name,
            stream,
            store,
            queue,
            metrics,
        }
    }

    /// Long-lived consumer loop (§4.3 loop contract). Runs until cancelled.
    pub async fn run(&self, poll_interval: Duration) -> Result<(), OrchestratorError> {
        self.stream.ensure_consumer_group(ORCHESTRATOR_GROUP).await?;

        loop {
            let batch = self
                .stream
                .read_group(ORCHESTRATOR_GROUP, &self.consumer_name, 16)
                .await?;

            if batch.is_empty() {
                tokio::time::sleep(poll_interval).await;
                continue;
            }

            for (message_id, payload) in batch {
                match self.handle_event(&payload).await {
                    Ok(_) => {
                        if let Err(e) = self.stream.ack(ORCHESTRATOR_GROUP, &message_id).await {
                            error!(message_id, error = %e, "failed to ack stream message");
                        }
                    }
                    Err(e) => {
                        error!(
                            message_id,
                            error = %e,
                            "orchestrator event handling failed, leaving pending for redelivery"
                        );
                    }
                }
            }
        }
    }

    /// Handle one stream entry. Exposed directly for testing decisions
    /// without running the full loop.
    pub async fn handle_event(&self, payload: &serde_json::Value) -> Result<EventOutcome, OrchestratorError> {
        let event_type = payload.get("event_type").and_then(|v| v.as_str()).unwrap_or("");

        match event_type {
            "ObjectCreated" => {
                let event: StreamEvent = serde_json::from_value(payload.clone())?;
                let StreamEvent::ObjectCreated { bucket, key, .. } = event else {
                    unreachable!("event_type already matched ObjectCreated")
                };
                self.handle_object_created(&bucket, &key).await.map(EventOutcome::Decision)
            }
            "JobCompleted" => {
                let event: StreamEvent = serde_json::from_value(payload.clone())?;
                let StreamEvent::JobCompleted {
                    job_id,
                    status,
                    error_code,
                    error_message,
                    ..
                } = event
                else {
                    unreachable!("event_type already matched JobCompleted")
                };
                self.store.update_job(&job_id, status, error_code, error_message).await?;
                Ok(EventOutcome::JobCompletedApplied)
            }
            other => {
                warn!(event_type = other, "unknown_event_type");
                Ok(EventOutcome::UnknownEventType)
            }
        }
    }

    async fn handle_object_created(&self, bucket: &str, key: &str) -> Result<Decision, OrchestratorError> {
        let job_id = job_id_from_s3_key(key).unwrap_or_else(|| Uuid::new_v4().to_string());
        let idempotency_key = format!("s3://{bucket}/{key}");

        let claimed = self.store.try_claim_idempotency(&idempotency_key, &job_id).await?;
        if !claimed {
            info!(job_id, idempotency_key, "skip_duplicate");
            self.metrics.orchestrator_decision("skip_duplicate");
            return Ok(Decision {
                action: Action::SkipDuplicate,
                job_id,
                idempotency_key,
            });
        }

        self.store
            .create_job_if_missing(&job_id, bucket, key, JobStatus::Submitted)
            .await?;
        self.store.update_job(&job_id, JobStatus::Processing, None, None).await?;
        self.queue.enqueue_process_video(&job_id, bucket, key).await?;

        info!(job_id, idempotency_key, "enqueued");
        self.metrics.orchestrator_decision("enqueued");
        Ok(Decision {
            action: Action::Enqueued,
            job_id,
            idempotency_key,
        })
    }
}
