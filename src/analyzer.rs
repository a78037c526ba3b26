//! DLQ Analyzer (§4.5): the sole consumer of the dead-letter queue. Drains
//! it, re-classifies each entry, aggregates counts per category, keeps one
//! exemplar per category, and writes a timestamped incident report to disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::classifier::{self, Category};
use crate::queue::{DlqEntry, QueueError, WorkQueue};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("failed to write incident report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize incident report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentReport {
    pub generated_at: chrono::DateTime<Utc>,
    pub total_entries: usize,
    pub counts_by_category: HashMap<String, usize>,
    pub exemplars: HashMap<String, DlqEntry>,
}

pub struct DlqAnalyzer {
    queue: Arc<dyn WorkQueue>,
    report_dir: PathBuf,
}

impl DlqAnalyzer {
    pub fn new(queue: Arc<dyn WorkQueue>, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            queue,
            report_dir: report_dir.into(),
        }
    }

    /// Drain up to `batch_size` DLQ entries, re-classify them, and write an
    /// incident report. Returns the report even when no entries were drained
    /// (an empty report still documents that the run happened).
    pub async fn run(&self, batch_size: usize, now: chrono::DateTime<Utc>) -> Result<IncidentReport, AnalyzerError> {
        let entries = self.queue.drain_dlq(batch_size).await?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut exemplars: HashMap<String, DlqEntry> = HashMap::new();

        for entry in &entries {
            let category = classifier::classify(false, &entry.error_message);
            let key = category.as_str().to_string();
            *counts.entry(key.clone()).or_insert(0) += 1;
            exemplars.entry(key).or_insert_with(|| entry.clone());
        }

        let report = IncidentReport {
            generated_at: now,
            total_entries: entries.len(),
            counts_by_category: counts,
            exemplars,
        };

        self.write_report(&report, now).await?;
        info!(total = report.total_entries, "dlq incident report written");
        Ok(report)
    }

    async fn write_report(&self, report: &IncidentReport, now: chrono::DateTime<Utc>) -> Result<(), AnalyzerError> {
        tokio::fs::create_dir_all(&self.report_dir).await?;
        let path = self.report_path(now);
        let body = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    fn report_path(&self, now: chrono::DateTime<Utc>) -> PathBuf {
        self.report_dir.join(format!("dlq-incident-{}.json", now.format("%Y%m%dT%H%M%SZ")))
    }
}

/// Returns the fixed recommendation string for a category, for use by
/// reporting/CLI surfaces that only have the category key (e.g. from a
/// previously-written report) and not a live classification.
pub fn recommendation_for(category: &str) -> Option<&'static str> {
    let category = match category {
        "bad_media" => Category::BadMedia,
        "timeout" => Category::Timeout,
        "provider_error" => Category::ProviderError,
        "dependency_unavailable" => Category::DependencyUnavailable,
        "unexpected_exception" => Category::UnexpectedException,
        _ => return None,
    };
    Some(category.recommendation())
}

pub fn default_report_dir() -> &'static Path {
    Path::new("dlq-reports")
}
