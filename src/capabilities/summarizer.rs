//! Summarizer: a text generator producing a short summary over extracted
//! metadata.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer error: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, metadata: &serde_json::Value) -> Result<String, SummarizerError>;
}

/// Builds a deterministic one-line summary from the probe output, no model
/// call involved.
pub struct MockSummarizer;

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, metadata: &serde_json::Value) -> Result<String, SummarizerError> {
        let duration = metadata.get("duration_seconds").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let container = metadata.get("container").and_then(|v| v.as_str()).unwrap_or("unknown");
        let codec = metadata.get("codec").and_then(|v| v.as_str()).unwrap_or("unknown");
        Ok(format!(
            "A {duration:.1}s {container} video encoded with {codec}."
        ))
    }
}

/// Calls out to a managed text-generation provider over HTTP (config:
/// `capabilities.summarizer_endpoint`). The classifier's `provider_error`
/// category (keywords `bedrock`/`throttl`/`model`) is written with exactly
/// this kind of call in mind.
pub struct ManagedSummarizer {
    client: reqwest::Client,
    endpoint: String,
}

impl ManagedSummarizer {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Summarizer for ManagedSummarizer {
    async fn summarize(&self, metadata: &serde_json::Value) -> Result<String, SummarizerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(metadata)
            .send()
            .await
            .map_err(|e| SummarizerError::Failed(format!("model endpoint unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(SummarizerError::Failed(format!(
                "model endpoint returned {}",
                response.status()
            )));
        }

        #[derive(serde::Deserialize)]
        struct SummaryResponse {
            summary: String,
        }

        let body: SummaryResponse = response
            .json()
            .await
            .map_err(|e| SummarizerError::Failed(format!("invalid model response: {e}")))?;
        Ok(body.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_summarizer_renders_duration_and_codec() {
        let metadata = serde_json::json!({
            "duration_seconds": 12.5,
            "container": "mp4",
            "codec": "h264",
        });
        let summary = MockSummarizer.summarize(&metadata).await.unwrap();
        assert!(summary.contains("12.5"));
        assert!(summary.contains("mp4"));
        assert!(summary.contains("h264"));
    }
}
