//! Failure classifier (§4.5): a pure function from the error that terminated
//! a Worker's attempt loop to one of five DLQ categories, each carrying a
//! fixed, human-readable recommendation. Shared between the Worker (classify
//! on terminal failure) and the DLQ Analyzer (re-classify on drain).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BadMedia,
    Timeout,
    ProviderError,
    DependencyUnavailable,
    UnexpectedException,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::BadMedia => "bad_media",
            Category::Timeout => "timeout",
            Category::ProviderError => "provider_error",
            Category::DependencyUnavailable => "dependency_unavailable",
            Category::UnexpectedException => "unexpected_exception",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Category::BadMedia => {
                "Source file is likely corrupt, truncated, or an unsupported codec/container. \
                 Re-processing will not succeed without a corrected upload."
            }
            Category::Timeout => {
                "Extraction or summarization exceeded its time budget. Retry during lower load, \
                 or raise the relevant timeout if this recurs for large files."
            }
            Category::ProviderError => {
                "The managed model provider rejected or throttled the request. Check provider \
                 quota and backoff, then retry."
            }
            Category::DependencyUnavailable => {
                "A downstream dependency (object store, cache, or endpoint) was unreachable. \
                 Check connectivity and retry."
            }
            Category::UnexpectedException => {
                "Unclassified failure. Inspect the attached error message and worker logs."
            }
        }
    }
}

/// Classify a terminal failure (§4.5). `is_media_probe_error` is set when the
/// failure originated from the media-probe step specifically, regardless of
/// its message text.
pub fn classify(is_media_probe_error: bool, message: &str) -> Category {
    let lower = message.to_lowercase();

    if is_media_probe_error
        || lower.contains("ffprobe")
        || lower.contains("codec")
        || lower.contains("moov")
    {
        return Category::BadMedia;
    }
    if lower.contains("timeout") || lower.contains("timed out") {
        return Category::Timeout;
    }
    if lower.contains("bedrock") || lower.contains("throttl") || lower.contains("model") {
        return Category::ProviderError;
    }
    if lower.contains("redis")
        || lower.contains("s3")
        || lower.contains("endpoint")
        || lower.contains("connection")
    {
        return Category::DependencyUnavailable;
    }
    Category::UnexpectedException
}
