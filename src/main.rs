mod cli;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use videopipe::analyzer::{DlqAnalyzer, default_report_dir};
use videopipe::backends::{AnyError, open_queue, open_store, open_stream};
use videopipe::capabilities::{MediaExtractor, ManagedExtractor, ManagedSummarizer, MockExtractor, MockSummarizer, Summarizer};
use videopipe::config::{CapabilityMode, Config};
use videopipe::observability::Metrics;
use videopipe::orchestrator::Orchestrator;
use videopipe::storage::StorageClient;
use videopipe::worker::{CompletionSink, Worker, WorkerConfig};
use videopipe::{api, ingress};

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Api => api::run().await?,
        Commands::Ingress => ingress::run().await?,
        Commands::Orchestrator => run_orchestrator().await?,
        Commands::Worker => run_worker().await?,
        Commands::DlqAnalyze(args) => run_dlq_analyze(args.batch_size).await?,
    }

    Ok(())
}

async fn run_orchestrator() -> Result<(), AnyError> {
    let config = Config::load().map_err(|e| format!("failed to load config: {e}"))?;
    let store = open_store(&config).await?;
    let queue = open_queue(&config).await?;
    let stream = open_stream(&config).await?;
    let metrics = Arc::new(Metrics::new());

    let consumer_name = format!("orchestrator-{}", std::process::id());
    let orchestrator = Orchestrator::new(consumer_name, stream, store, queue, metrics);
    orchestrator.run(Duration::from_millis(500)).await?;
    Ok(())
}

async fn run_worker() -> Result<(), AnyError> {
    let config = Config::load().map_err(|e| format!("failed to load config: {e}"))?;
    let store = open_store(&config).await?;
    let queue = open_queue(&config).await?;
    let storage = StorageClient::from_config(&config.storage)?;
    let metrics = Arc::new(Metrics::new());

    let extractor: Arc<dyn MediaExtractor> = match config.capabilities.extractor_mode {
        CapabilityMode::Mock => Arc::new(MockExtractor),
        CapabilityMode::Managed => {
            let endpoint = config.capabilities.extractor_endpoint.clone().ok_or("capabilities.extractor_endpoint not set")?;
            Arc::new(ManagedExtractor::new(endpoint))
        }
    };
    let summarizer: Arc<dyn Summarizer> = match config.capabilities.summarizer_mode {
        CapabilityMode::Mock => Arc::new(MockSummarizer),
        CapabilityMode::Managed => {
            let endpoint = config.capabilities.summarizer_endpoint.clone().ok_or("capabilities.summarizer_endpoint not set")?;
            Arc::new(ManagedSummarizer::new(endpoint))
        }
    };

    let completion = match &config.worker.completion_ingress_url {
        Some(url) => CompletionSink::IngressUrl(url.clone()),
        None => CompletionSink::Direct(open_stream(&config).await?),
    };

    let worker_config = WorkerConfig {
        concurrency: config.worker.concurrency,
        max_attempts: config.worker.max_attempts,
        backoff_base: Duration::from_secs_f64(config.worker.backoff_seconds),
        poll_interval: Duration::from_millis(config.worker.poll_interval_ms),
    };

    let worker = Arc::new(Worker::new(store, queue, storage, extractor, summarizer, completion, metrics, worker_config));
    worker.run().await;
    Ok(())
}

async fn run_dlq_analyze(batch_size: usize) -> Result<(), AnyError> {
    let config = Config::load().map_err(|e| format!("failed to load config: {e}"))?;
    let queue = open_queue(&config).await?;

    let analyzer = DlqAnalyzer::new(queue, default_report_dir());
    let report = analyzer.run(batch_size, Utc::now()).await?;

    tracing::info!(
        total = report.total_entries,
        categories = ?report.counts_by_category,
        "dlq analysis complete"
    );
    Ok(())
}
