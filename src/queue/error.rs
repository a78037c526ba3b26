use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("postgres error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid receipt: {0}")]
    InvalidReceipt(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
