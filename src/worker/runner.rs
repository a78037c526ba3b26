//! The Worker (§4.4/§4.5): dequeues `ProcessVideo` messages and runs the
//! download → extract → summarize pipeline, with an outer attempt loop and
//! failure classification/DLQ handoff on exhaustion.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::capabilities::{MediaExtractor, Summarizer};
use crate::classifier::{self, Category};
use crate::events::EventStream;
use crate::model::{JobStatus, QueueMessage, StreamEvent};
use crate::observability::Metrics;
use crate::queue::{DlqEntry, WorkQueue};
use crate::storage::StorageClient;
use crate::store::StateStore;

pub use super::error::WorkerError;
use super::download::download_with_retry;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of parallel `dequeue` consumers within this process (§7).
    pub concurrency: usize,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Where a finished job's `JobCompleted` event is sent (§4.4 step 4): either
/// directly onto the stream this process already holds a handle to, or
/// through the Event Ingress's `job-completed` HTTP endpoint when this
/// Worker runs without direct stream access.
pub enum CompletionSink {
    Direct(Arc<dyn EventStream>),
    IngressUrl(String),
}

impl CompletionSink {
    async fn emit(&self, event: StreamEvent) {
        let result = match self {
            CompletionSink::Direct(stream) => stream.publish(event).await.map(|_| ()).map_err(|e| e.to_string()),
            CompletionSink::IngressUrl(url) => reqwest::Client::new()
                .post(url)
                .json(&event)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map(|_| ())
                .map_err(|e| e.to_string()),
        };
        if let Err(e) = result {
            warn!(error = %e, "best-effort JobCompleted emission failed");
        }
    }
}

pub struct Worker {
    store: Arc<dyn StateStore>,
    queue: Arc<dyn WorkQueue>,
    storage: StorageClient,
    extractor: Arc<dyn MediaExtractor>,
    summarizer: Arc<dyn Summarizer>,
    completion: CompletionSink,
    metrics: Arc<Metrics>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        store: Arc<dyn StateStore>,
        queue: Arc<dyn WorkQueue>,
        storage: StorageClient,
        extractor: Arc<dyn MediaExtractor>,
        summarizer: Arc<dyn Summarizer>,
        completion: CompletionSink,
        metrics: Arc<Metrics>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            storage,
            extractor,
            summarizer,
            completion,
            metrics,
            config,
        }
    }

    /// Long-lived loop. Spawns `config.concurrency` parallel consumers and
    /// waits on all of them (they run until cancelled, so in practice this
    /// never returns under normal operation).
    pub async fn run(self: Arc<Self>) {
        let mut handles = Vec::with_capacity(self.config.concurrency);
        for _ in 0..self.config.concurrency {
            let worker = Arc::clone(&self);
            handles.push(tokio::spawn(async move { worker.run_single().await }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn run_single(&self) {
        loop {
            match self.queue.dequeue().await {
                Ok(Some((receipt, payload))) => {
                    self.process_message(payload).await;
                    if let Err(e) = self.queue.ack(&receipt).await {
                        error!(error = %e, "failed to ack work queue message");
                    }
                }
                Ok(None) => tokio::time::sleep(self.config.poll_interval).await,
                Err(e) => {
                    error!(error = %e, "work queue dequeue failed");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    /// §4.4 step 2: unknown `message_type` payloads are logged and dropped
    /// (the caller still acks).
    async fn process_message(&self, payload: serde_json::Value) {
        let message: QueueMessage = match serde_json::from_value(payload) {
            Ok(QueueMessage::ProcessVideo { job_id, bucket, key }) => QueueMessage::ProcessVideo { job_id, bucket, key },
            Ok(QueueMessage::Dlq { .. }) => {
                warn!("unexpected DLQ message on the work queue, dropping");
                return;
            }
            Err(e) => {
                warn!(error = %e, "malformed work queue payload, dropping");
                return;
            }
        };

        let QueueMessage::ProcessVideo { job_id, bucket, key } = message else {
            unreachable!("matched above")
        };

        if let Err(e) = self.store.update_job(&job_id, JobStatus::Processing, None, None).await {
            error!(job_id, error = %e, "failed to mark job PROCESSING, continuing with attempt loop anyway");
        }

        let mut last_error = None;
        for attempt in 1..=self.config.max_attempts {
            match self.try_process(&job_id, &bucket, &key).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(job_id, attempt, error = %e, "worker attempt failed");
                    self.metrics.worker_retry();
                    last_error = Some(e);
                    if attempt < self.config.max_attempts {
                        let backoff = self.config.backoff_base * 2u32.pow(attempt - 1);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        let error = last_error.expect("loop runs at least once");
        self.handle_terminal_failure(&job_id, &bucket, &key, error).await;
    }

    /// One attempt of §4.4 step 4: download, extract, summarize, commit. The
    /// `NamedTempFile` is dropped (and the underlying file removed) on every
    /// exit path, including the early `?` returns below, via its `Drop` impl.
    async fn try_process(&self, job_id: &str, bucket: &str, key: &str) -> Result<(), WorkerError> {
        let bytes = download_with_retry(&self.storage, key).await?;

        let temp_file = NamedTempFile::new()?;
        tokio::fs::write(temp_file.path(), &bytes).await?;

        let (metadata, summary) = self.extract_and_summarize(temp_file.path()).await?;
        drop(temp_file);

        self.store.store_result(job_id, metadata, summary).await?;
        self.store
            .update_job(job_id, JobStatus::Succeeded, None, None)
            .await?;
        self.metrics.job_succeeded();

        self.completion
            .emit(StreamEvent::JobCompleted {
                job_id: job_id.to_string(),
                status: JobStatus::Succeeded,
                event_time: Utc::now(),
                error_code: None,
                error_message: None,
            })
            .await;

        info!(job_id, bucket, key, "job succeeded");
        Ok(())
    }

    async fn extract_and_summarize(&self, path: &Path) -> Result<(serde_json::Value, String), WorkerError> {
        let metadata = self.extractor.extract(path).await?;
        let summary = self.summarizer.summarize(&metadata).await?;
        Ok((metadata, summary))
    }

    /// §4.5: classify, record FAILED, push DLQ, emit JobCompleted, done.
    async fn handle_terminal_failure(&self, job_id: &str, bucket: &str, key: &str, error: WorkerError) {
        let is_media_probe = error.is_media_probe_error();
        let message = error.to_string();
        let category = classifier::classify(is_media_probe, &message);

        if let Err(e) = self
            .store
            .update_job(job_id, JobStatus::Failed, Some(category.as_str().to_string()), Some(message.clone()))
            .await
        {
            error!(job_id, error = %e, "failed to record terminal FAILED status");
        }

        let dlq_entry = DlqEntry {
            job_id: job_id.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            error_code: category.as_str().to_string(),
            error_message: message.clone(),
            recommendation: category.recommendation().to_string(),
            attempts: self.config.max_attempts,
            failed_at: Utc::now(),
        };
        if let Err(e) = self.queue.push_dlq(dlq_entry).await {
            error!(job_id, error = %e, "failed to push DLQ entry, job remains durably FAILED");
        } else {
            self.metrics.dlq_pushed();
        }

        self.completion
            .emit(StreamEvent::JobCompleted {
                job_id: job_id.to_string(),
                status: JobStatus::Failed,
                event_time: Utc::now(),
                error_code: Some(category.as_str().to_string()),
                error_message: Some(message),
            })
            .await;

        self.metrics.job_failed();
        warn!(job_id, category = category.as_str(), "job failed terminally");
    }
}
