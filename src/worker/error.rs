use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error(transparent)]
    Queue(#[from] crate::queue::QueueError),

    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),

    #[error(transparent)]
    Extractor(#[from] crate::capabilities::ExtractorError),

    #[error(transparent)]
    Summarizer(#[from] crate::capabilities::SummarizerError),

    #[error("temporary file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed queue payload: {0}")]
    MalformedPayload(String),
}

impl WorkerError {
    /// Whether this attempt failed at the media-probe step specifically
    /// (§4.5: the classifier checks this regardless of message text).
    pub fn is_media_probe_error(&self) -> bool {
        matches!(self, WorkerError::Extractor(e) if e.is_media_probe())
    }
}
