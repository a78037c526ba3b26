//! Wire and domain types for the job lifecycle pipeline: Job, Result,
//! Idempotency Claim, Queue Message, and Stream Event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job lifecycle state (§4.1). Serialized on the wire as the SCREAMING_SNAKE_CASE
/// names used throughout the original event/API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    AwaitingUpload,
    Submitted,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// A Job row (§3). `(bucket, key)` is immutable after creation; `created_at`
/// never changes after `create_job_if_missing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub bucket: String,
    pub key: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// Result of a successfully processed job. Upsert by `job_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub metadata: serde_json::Value,
    pub summary: String,
}

/// An idempotency claim row: at most one per `idempotency_key`, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyClaim {
    pub idempotency_key: String,
    pub job_id: String,
    pub created_at: DateTime<Utc>,
}

/// Messages carried by the Work Queue and DLQ (§3, §6). Tagged on `message_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type")]
pub enum QueueMessage {
    ProcessVideo {
        job_id: String,
        bucket: String,
        key: String,
    },
    #[serde(rename = "DLQ")]
    Dlq {
        job_id: String,
        bucket: String,
        key: String,
        error_code: String,
        error_message: String,
        recommendation: String,
    },
}

/// Events carried by the Event Stream (§3, §6). Tagged on `event_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum StreamEvent {
    ObjectCreated {
        bucket: String,
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        etag: Option<String>,
        event_time: DateTime<Utc>,
    },
    JobCompleted {
        job_id: String,
        status: JobStatus,
        event_time: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
}
