//! End-to-end pipeline tests (§8): drive the Orchestrator and Worker against
//! local (Fjall-backed) backends, covering the documented scenarios without
//! any network dependency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;
use tokio::time::timeout;

use videopipe::analyzer::DlqAnalyzer;
use videopipe::capabilities::{ExtractorError, MediaExtractor, MockExtractor, MockSummarizer, Summarizer};
use videopipe::events::{EventStream, LocalEventStream, ORCHESTRATOR_GROUP};
use videopipe::model::{JobStatus, StreamEvent};
use videopipe::observability::Metrics;
use videopipe::orchestrator::{Action, Orchestrator};
use videopipe::queue::{LocalQueue, WorkQueue};
use videopipe::storage::StorageClient;
use videopipe::store::{LocalStore, StateStore};
use videopipe::worker::{CompletionSink, Worker, WorkerConfig};

struct Rig {
    store: Arc<LocalStore>,
    queue: Arc<LocalQueue>,
    stream: Arc<LocalEventStream>,
    storage: StorageClient,
    metrics: Arc<Metrics>,
    _dirs: (TempDir, TempDir, TempDir),
}

fn build_rig() -> Rig {
    let store_dir = TempDir::new().unwrap();
    let queue_dir = TempDir::new().unwrap();
    let stream_dir = TempDir::new().unwrap();

    let store = Arc::new(LocalStore::open(store_dir.path().join("store.fjall")).unwrap());
    let queue = Arc::new(LocalQueue::open(queue_dir.path().join("queue.fjall")).unwrap());
    let stream = Arc::new(LocalEventStream::open(stream_dir.path().join("stream.fjall")).unwrap());
    let storage = StorageClient::in_memory();
    let metrics = Arc::new(Metrics::new());

    Rig {
        store,
        queue,
        stream,
        storage,
        metrics,
        _dirs: (store_dir, queue_dir, stream_dir),
    }
}

fn object_created(bucket: &str, key: &str) -> serde_json::Value {
    let event = StreamEvent::ObjectCreated {
        bucket: bucket.to_string(),
        key: key.to_string(),
        size: None,
        etag: None,
        event_time: Utc::now(),
    };
    serde_json::to_value(&event).unwrap()
}

fn spawn_worker(worker: Arc<Worker>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { worker.run().await })
}

async fn wait_for_terminal_status(store: &LocalStore, job_id: &str) -> videopipe::model::Job {
    timeout(Duration::from_secs(5), async {
        loop {
            if let Some(job) = store.get_job(job_id).await.unwrap() {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not reach a terminal status in time")
}

/// Scenario 1 (§8): create → webhook → orchestrator enqueues → worker
/// succeeds → job and result are both observable.
#[tokio::test]
async fn happy_path_upload_to_succeeded_result() {
    let rig = build_rig();
    rig.storage.upload("uploads/job-1/sample.mp4", vec![1u8; 4096]).await.unwrap();

    let orchestrator = Orchestrator::new(
        "orchestrator-host1".to_string(),
        rig.stream.clone(),
        rig.store.clone(),
        rig.queue.clone(),
        rig.metrics.clone(),
    );
    let payload = object_created("videos", "uploads/job-1/sample.mp4");
    let outcome = orchestrator.handle_event(&payload).await.unwrap();
    match outcome {
        videopipe::orchestrator::EventOutcome::Decision(d) => {
            assert_eq!(d.action, Action::Enqueued);
            assert_eq!(d.job_id, "job-1");
        }
        _ => panic!("expected a Decision for ObjectCreated"),
    }

    let worker = Arc::new(Worker::new(
        rig.store.clone(),
        rig.queue.clone(),
        rig.storage.clone(),
        Arc::new(MockExtractor),
        Arc::new(MockSummarizer),
        CompletionSink::Direct(rig.stream.clone()),
        rig.metrics.clone(),
        WorkerConfig {
            concurrency: 1,
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
        },
    ));
    let handle = spawn_worker(worker);

    let job = wait_for_terminal_status(&rig.store, "job-1").await;
    handle.abort();

    assert_eq!(job.status, JobStatus::Succeeded);
    assert!(job.error_code.is_none());

    let result = rig.store.get_result("job-1").await.unwrap().unwrap();
    assert!(!result.summary.is_empty());
    assert!(result.metadata.is_object());
}

/// Scenario 2 (§8): two identical `ObjectCreated` events for the same
/// `(bucket, key)` yield exactly one enqueue, one `idempotency` row, and a
/// `["enqueued", "skip_duplicate"]` decision sequence.
#[tokio::test]
async fn duplicate_webhook_enqueues_exactly_once() {
    let rig = build_rig();
    let orchestrator = Orchestrator::new(
        "orchestrator-host1".to_string(),
        rig.stream.clone(),
        rig.store.clone(),
        rig.queue.clone(),
        rig.metrics.clone(),
    );

    let payload = object_created("videos", "uploads/abc/v.mp4");
    let first = orchestrator.handle_event(&payload).await.unwrap();
    let second = orchestrator.handle_event(&payload).await.unwrap();

    let actions: Vec<Action> = [first, second]
        .into_iter()
        .map(|outcome| match outcome {
            videopipe::orchestrator::EventOutcome::Decision(d) => d.action,
            _ => panic!("expected Decisions"),
        })
        .collect();
    assert_eq!(actions, vec![Action::Enqueued, Action::SkipDuplicate]);

    assert!(rig.queue.dequeue().await.unwrap().is_some());
    assert!(rig.queue.dequeue().await.unwrap().is_none());

    assert!(!rig.store.try_claim_idempotency("s3://videos/uploads/abc/v.mp4", "someone-else").await.unwrap());

    let job = rig.store.get_job("abc").await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
}

/// Scenario 3 (§8): a zero-byte upload exhausts all attempts with a
/// media-probe error, lands in FAILED with `error_code = bad_media`, and
/// produces exactly one DLQ entry.
#[tokio::test]
async fn bad_media_exhausts_attempts_and_reaches_dlq() {
    let rig = build_rig();
    rig.storage.upload("uploads/job-2/empty.mp4", vec![]).await.unwrap();
    rig.store
        .create_job_if_missing("job-2", "videos", "uploads/job-2/empty.mp4", JobStatus::Submitted)
        .await
        .unwrap();
    rig.queue.enqueue_process_video("job-2", "videos", "uploads/job-2/empty.mp4").await.unwrap();

    let worker = Arc::new(Worker::new(
        rig.store.clone(),
        rig.queue.clone(),
        rig.storage.clone(),
        Arc::new(MockExtractor),
        Arc::new(MockSummarizer),
        CompletionSink::Direct(rig.stream.clone()),
        rig.metrics.clone(),
        WorkerConfig {
            concurrency: 1,
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
        },
    ));
    let handle = spawn_worker(worker);

    let job = wait_for_terminal_status(&rig.store, "job-2").await;
    handle.abort();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_code.as_deref(), Some("bad_media"));
    assert!(job.error_message.is_some());
    assert!(rig.store.get_result("job-2").await.unwrap().is_none());

    let dlq = rig.queue.drain_dlq(10).await.unwrap();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].error_code, "bad_media");
}

/// An extractor that fails with a dependency-unavailable message on its
/// first `fail_times` calls, then delegates to [`MockExtractor`].
struct FlakyExtractor {
    remaining_failures: AtomicUsize,
}

impl FlakyExtractor {
    fn new(fail_times: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(fail_times),
        }
    }
}

#[async_trait]
impl MediaExtractor for FlakyExtractor {
    async fn extract(&self, path: &std::path::Path) -> Result<serde_json::Value, ExtractorError> {
        let remaining = self.remaining_failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            if n > 0 { Some(n - 1) } else { Some(0) }
        });
        if remaining.unwrap_or(0) > 0 {
            return Err(ExtractorError::MediaProbe("redis connection refused".to_string()));
        }
        MockExtractor.extract(path).await
    }
}

/// Scenario 4 (§8): two consecutive `dependency_unavailable` failures
/// followed by success still converge to SUCCEEDED, with exactly one Result
/// stored (the attempt budget, not the queue, absorbs the flakiness).
#[tokio::test]
async fn transient_dependency_failure_then_success() {
    let rig = build_rig();
    rig.storage.upload("uploads/job-3/sample.mp4", vec![9u8; 2048]).await.unwrap();
    rig.store
        .create_job_if_missing("job-3", "videos", "uploads/job-3/sample.mp4", JobStatus::Submitted)
        .await
        .unwrap();
    rig.queue.enqueue_process_video("job-3", "videos", "uploads/job-3/sample.mp4").await.unwrap();

    let worker = Arc::new(Worker::new(
        rig.store.clone(),
        rig.queue.clone(),
        rig.storage.clone(),
        Arc::new(FlakyExtractor::new(2)),
        Arc::new(MockSummarizer),
        CompletionSink::Direct(rig.stream.clone()),
        rig.metrics.clone(),
        WorkerConfig {
            concurrency: 1,
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
        },
    ));
    let handle = spawn_worker(worker);

    let job = wait_for_terminal_status(&rig.store, "job-3").await;
    handle.abort();

    assert_eq!(job.status, JobStatus::Succeeded);
    assert!(rig.store.get_result("job-3").await.unwrap().is_some());
    assert_eq!(rig.queue.drain_dlq(10).await.unwrap().len(), 0);
}

/// Scenario 5 (§8): if the Orchestrator's process dies before it acks a
/// message, the next read redelivers the same entry. The idempotency claim
/// (not the stream) is the commit point, so the net effect is identical to
/// the happy path: one job, one enqueue.
#[tokio::test]
async fn unacked_event_is_redelivered_and_absorbed_by_the_claim() {
    let rig = build_rig();
    rig.stream.ensure_consumer_group(ORCHESTRATOR_GROUP).await.unwrap();
    rig.stream.publish(StreamEvent::ObjectCreated {
        bucket: "videos".to_string(),
        key: "uploads/job-4/v.mp4".to_string(),
        size: None,
        etag: None,
        event_time: Utc::now(),
    })
    .await
    .unwrap();

    let orchestrator = Orchestrator::new(
        "orchestrator-host1".to_string(),
        rig.stream.clone(),
        rig.store.clone(),
        rig.queue.clone(),
        rig.metrics.clone(),
    );

    // First delivery: the orchestrator "crashes" before acking.
    let batch = rig.stream.read_group(ORCHESTRATOR_GROUP, "orchestrator-host1", 16).await.unwrap();
    assert_eq!(batch.len(), 1);
    let (message_id, payload) = &batch[0];
    orchestrator.handle_event(payload).await.unwrap();
    // deliberately not acked here

    // Restart: the same entry is redelivered and reprocessed.
    let redelivered = rig.stream.read_group(ORCHESTRATOR_GROUP, "orchestrator-host1", 16).await.unwrap();
    assert_eq!(redelivered.len(), 1);
    assert_eq!(&redelivered[0].0, message_id);
    let outcome = orchestrator.handle_event(&redelivered[0].1).await.unwrap();
    match outcome {
        videopipe::orchestrator::EventOutcome::Decision(d) => assert_eq!(d.action, Action::SkipDuplicate),
        _ => panic!("expected a Decision"),
    }
    rig.stream.ack(ORCHESTRATOR_GROUP, message_id).await.unwrap();

    // Net effect: exactly one job, one queued message.
    assert!(rig.store.get_job("job-4").await.unwrap().is_some());
    assert!(rig.queue.dequeue().await.unwrap().is_some());
    assert!(rig.queue.dequeue().await.unwrap().is_none());
}

/// Scenario 6 (§8): the DLQ Analyzer drains entries produced by a real
/// worker failure and aggregates them into an incident report.
#[tokio::test]
async fn dlq_analyzer_reports_worker_failures() {
    let rig = build_rig();
    rig.storage.upload("uploads/job-5/empty.mp4", vec![]).await.unwrap();
    rig.store
        .create_job_if_missing("job-5", "videos", "uploads/job-5/empty.mp4", JobStatus::Submitted)
        .await
        .unwrap();
    rig.queue.enqueue_process_video("job-5", "videos", "uploads/job-5/empty.mp4").await.unwrap();

    let worker = Arc::new(Worker::new(
        rig.store.clone(),
        rig.queue.clone(),
        rig.storage.clone(),
        Arc::new(MockExtractor),
        Arc::new(MockSummarizer),
        CompletionSink::Direct(rig.stream.clone()),
        rig.metrics.clone(),
        WorkerConfig {
            concurrency: 1,
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
        },
    ));
    let handle = spawn_worker(worker);
    wait_for_terminal_status(&rig.store, "job-5").await;
    handle.abort();

    let report_dir = TempDir::new().unwrap();
    let analyzer = DlqAnalyzer::new(rig.queue.clone(), report_dir.path());
    let report = analyzer.run(10, Utc::now()).await.unwrap();

    assert_eq!(report.total_entries, 1);
    assert_eq!(report.counts_by_category.get("bad_media"), Some(&1));
    assert!(report.exemplars.contains_key("bad_media"));
}
