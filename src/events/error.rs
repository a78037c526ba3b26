use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventStreamError {
    #[error("fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("postgres error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid event id: {0}")]
    InvalidEventId(String),
}

pub type Result<T> = std::result::Result<T, EventStreamError>;
