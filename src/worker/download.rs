//! Nested download retry (§4.4): each individual object download gets its
//! own exponential backoff (min 0.5s, max 10s, up to 3 tries) before
//! surfacing to the outer Worker attempt loop.

use std::time::Duration;

use tracing::warn;

use crate::storage::{StorageClient, StorageError};

const MIN_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const MAX_TRIES: u32 = 3;

pub async fn download_with_retry(storage: &StorageClient, key: &str) -> Result<Vec<u8>, StorageError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match storage.download(key).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if attempt >= MAX_TRIES => {
                warn!(key, attempt, error = %e, "download exhausted retries");
                return Err(e);
            }
            Err(e) => {
                let backoff = (MIN_BACKOFF.saturating_mul(1 << (attempt - 1))).min(MAX_BACKOFF);
                warn!(key, attempt, error = %e, backoff_ms = backoff.as_millis(), "download failed, retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
