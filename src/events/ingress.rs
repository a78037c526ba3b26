//! Event Ingress (§4.7): normalizes external object-creation notifications
//! (a provider-specific `Records` envelope) into `ObjectCreated` events, and
//! forwards direct `JobCompleted` submissions unchanged.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{JobStatus, StreamEvent};

/// URL-decode a webhook-supplied key, treating `+` as space (mirrors the
/// `unquote_plus` behavior of the original notification parser).
pub fn decode_webhook_key(raw: &str) -> String {
    let space_restored = raw.replace('+', " ");
    percent_encoding::percent_decode_str(&space_restored)
        .decode_utf8_lossy()
        .into_owned()
}

/// Normalize a minio/S3-style `Records` envelope into `ObjectCreated` events.
/// Records missing `bucket` or `key` are dropped silently (§4.7, §8).
pub fn normalize_minio_webhook(body: &serde_json::Value) -> Vec<StreamEvent> {
    let Some(records) = body.get("Records").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut events = Vec::with_capacity(records.len());
    for record in records {
        let bucket = record.pointer("/s3/bucket/name").and_then(|v| v.as_str());
        let key = record.pointer("/s3/object/key").and_then(|v| v.as_str());
        let (Some(bucket), Some(key)) = (bucket, key) else {
            continue;
        };

        let size = record.pointer("/s3/object/size").and_then(|v| v.as_u64());
        let etag = record
            .pointer("/s3/object/eTag")
            .and_then(|v| v.as_str())
            .map(str::to_owned);

        events.push(StreamEvent::ObjectCreated {
            bucket: bucket.to_string(),
            key: decode_webhook_key(key),
            size,
            etag,
            event_time: Utc::now(),
        });
    }
    events
}

/// Direct `JobCompleted` submission body (§6). Unlike webhook records, a
/// malformed submission is rejected rather than dropped.
#[derive(Debug, Deserialize)]
pub struct JobCompletedRequest {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A direct submission claims `FAILED` without saying why (§8 invariant 2: a
/// terminal `FAILED` job always carries a non-empty `error_code`).
#[derive(Debug, thiserror::Error)]
#[error("job_completed submission has status=FAILED but no error_code/error_message")]
pub struct MissingFailureReason;

impl TryFrom<JobCompletedRequest> for StreamEvent {
    type Error = MissingFailureReason;

    fn try_from(req: JobCompletedRequest) -> Result<Self, Self::Error> {
        if req.status == JobStatus::Failed && req.error_code.is_none() && req.error_message.is_none() {
            return Err(MissingFailureReason);
        }

        Ok(StreamEvent::JobCompleted {
            job_id: req.job_id,
            status: req.status,
            event_time: req.event_time.unwrap_or_else(Utc::now),
            error_code: req.error_code,
            error_message: req.error_message,
        })
    }
}
