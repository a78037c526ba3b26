//! The Worker (§4.4/§4.5): dequeues `ProcessVideo` messages, runs the
//! metadata extraction + summarization pipeline per job, and classifies
//! terminal failures to the DLQ.

pub mod download;
pub mod error;
pub mod runner;

pub use error::WorkerError;
pub use runner::{CompletionSink, Worker, WorkerConfig};
