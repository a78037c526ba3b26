use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "videopipe")]
#[command(about = "Video processing job pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API (job submission, status/result/history, auth).
    Api,

    /// Run the Event Ingress (webhook normalizer + direct JobCompleted submission).
    Ingress,

    /// Run the Orchestrator (Event Stream consumer -> Work Queue producer).
    Orchestrator,

    /// Run a Worker (Work Queue consumer -> extraction/summarization pipeline).
    Worker,

    /// Drain the DLQ, re-classify entries, and write an incident report.
    DlqAnalyze(DlqAnalyzeArgs),
}

#[derive(clap::Args, Debug)]
pub struct DlqAnalyzeArgs {
    /// Maximum number of DLQ entries to drain in this run.
    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,
}
