//! Observability stubs (metrics, tracing)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Metrics handle for recording counters/gauges
#[derive(Debug, Default)]
pub struct Metrics {
    jobs_accepted: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    tasks_published: AtomicU64,
    worker_retries: AtomicU64,
    dlq_pushes: AtomicU64,
    orchestrator_decisions: Mutex<HashMap<String, u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_accepted(&self) {
        self.jobs_accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_accepted", "Metric incremented");
    }

    pub fn job_succeeded(&self) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_succeeded", "Metric incremented");
    }

    pub fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_failed", "Metric incremented");
    }

    pub fn task_published(&self) {
        self.tasks_published.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tasks_published", "Metric incremented");
    }

    pub fn worker_retry(&self) {
        self.worker_retries.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "worker_retries", "Metric incremented");
    }

    pub fn dlq_pushed(&self) {
        self.dlq_pushes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "dlq_pushes", "Metric incremented");
    }

    /// Record an Orchestrator decision (`"enqueued"` or `"skip_duplicate"`).
    pub fn orchestrator_decision(&self, action: &str) {
        let mut decisions = self
            .orchestrator_decisions
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *decisions.entry(action.to_string()).or_insert(0) += 1;
        tracing::debug!(counter = "orchestrator_decisions", action, "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_accepted: self.jobs_accepted.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            tasks_published: self.tasks_published.load(Ordering::Relaxed),
            worker_retries: self.worker_retries.load(Ordering::Relaxed),
            dlq_pushes: self.dlq_pushes.load(Ordering::Relaxed),
            orchestrator_decisions: self
                .orchestrator_decisions
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub jobs_accepted: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub tasks_published: u64,
    pub worker_retries: u64,
    pub dlq_pushes: u64,
    pub orchestrator_decisions: HashMap<String, u64>,
}
