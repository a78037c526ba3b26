use super::models::{Backend, Config, StorageProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("max_payload_bytes ({actual}) exceeds limit of 5MB ({limit})")]
    PayloadSizeExceedsLimit { actual: u64, limit: u64 },

    #[error("storage provider is S3 but missing credentials (access_key or secret_key)")]
    MissingS3Credentials,

    #[error("store/queue/stream backend is managed but no managed DSN was supplied (set DATABASE_URL)")]
    MissingManagedDsn,

    #[error("retention TTL must be positive: {field} = {value}")]
    InvalidRetentionTTL { field: String, value: u32 },

    #[error("store_max_bytes must be positive")]
    InvalidStoreMaxBytes,

    #[error("worker.concurrency must be at least 1")]
    InvalidWorkerConcurrency,

    #[error("worker.max_attempts must be at least 1")]
    InvalidWorkerMaxAttempts,

    #[error("capabilities.{field}_mode is managed but no endpoint was configured")]
    MissingCapabilityEndpoint { field: &'static str },
}

/// Validate the entire configuration (§10.3).
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_payload_size(config)?;
    validate_storage(config)?;
    validate_backends(config)?;
    validate_retention(config)?;
    validate_worker(config)?;
    validate_capabilities(config)?;
    Ok(())
}

const MAX_PAYLOAD_BYTES: u64 = 5 * 1024 * 1024;

fn validate_payload_size(config: &Config) -> Result<(), ValidationError> {
    if config.server.api.max_payload_bytes.as_u64() > MAX_PAYLOAD_BYTES {
        return Err(ValidationError::PayloadSizeExceedsLimit {
            actual: config.server.api.max_payload_bytes.as_u64(),
            limit: MAX_PAYLOAD_BYTES,
        });
    }
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.provider == StorageProvider::S3
        && (config.storage.access_key.is_none() || config.storage.secret_key.is_none())
    {
        return Err(ValidationError::MissingS3Credentials);
    }
    Ok(())
}

/// Any component configured with `backend = "managed"` needs a DSN loaded
/// from `DATABASE_URL` (§10.3's secrets-from-env rule).
fn validate_backends(config: &Config) -> Result<(), ValidationError> {
    let managed_missing_dsn = (config.store.backend == Backend::Managed && config.store.managed_dsn.is_none())
        || (config.queue.backend == Backend::Managed && config.queue.managed_dsn.is_none())
        || (config.stream.backend == Backend::Managed && config.stream.managed_dsn.is_none());

    if managed_missing_dsn {
        return Err(ValidationError::MissingManagedDsn);
    }
    Ok(())
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    if config.retention.job_ttl_days == 0 {
        return Err(ValidationError::InvalidRetentionTTL {
            field: "job_ttl_days".to_string(),
            value: 0,
        });
    }
    if config.retention.store_max_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidStoreMaxBytes);
    }
    Ok(())
}

fn validate_worker(config: &Config) -> Result<(), ValidationError> {
    if config.worker.concurrency == 0 {
        return Err(ValidationError::InvalidWorkerConcurrency);
    }
    if config.worker.max_attempts == 0 {
        return Err(ValidationError::InvalidWorkerMaxAttempts);
    }
    Ok(())
}

fn validate_capabilities(config: &Config) -> Result<(), ValidationError> {
    use super::models::CapabilityMode;

    if config.capabilities.extractor_mode == CapabilityMode::Managed && config.capabilities.extractor_endpoint.is_none()
    {
        return Err(ValidationError::MissingCapabilityEndpoint { field: "extractor" });
    }
    if config.capabilities.summarizer_mode == CapabilityMode::Managed
        && config.capabilities.summarizer_endpoint.is_none()
    {
        return Err(ValidationError::MissingCapabilityEndpoint { field: "summarizer" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::models::*;
    use super::*;

    fn create_test_config() -> Config {
        Config {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            store: StoreConfig::default(),
            queue: QueueConfig::default(),
            stream: StreamConfig::default(),
            worker: WorkerSectionConfig::default(),
            capabilities: CapabilitiesConfig::default(),
            auth: AuthConfig::default(),
            retention: RetentionConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = create_test_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_payload_size_limit() {
        let mut config = create_test_config();
        config.server.api.max_payload_bytes = ByteSize(10 * 1024 * 1024);
        assert!(matches!(validate(&config), Err(ValidationError::PayloadSizeExceedsLimit { .. })));
    }

    #[test]
    fn test_s3_credentials_missing() {
        let mut config = create_test_config();
        config.storage.provider = StorageProvider::S3;
        config.storage.access_key = None;
        assert!(matches!(validate(&config), Err(ValidationError::MissingS3Credentials)));
    }

    #[test]
    fn test_managed_backend_without_dsn() {
        let mut config = create_test_config();
        config.store.backend = Backend::Managed;
        assert!(matches!(validate(&config), Err(ValidationError::MissingManagedDsn)));
    }

    #[test]
    fn test_managed_backend_with_dsn_is_valid() {
        let mut config = create_test_config();
        config.store.backend = Backend::Managed;
        config.store.managed_dsn = Some("postgres://localhost/videopipe".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_retention_ttl() {
        let mut config = create_test_config();
        config.retention.job_ttl_days = 0;
        assert!(matches!(validate(&config), Err(ValidationError::InvalidRetentionTTL { .. })));
    }

    #[test]
    fn test_zero_worker_concurrency() {
        let mut config = create_test_config();
        config.worker.concurrency = 0;
        assert!(matches!(validate(&config), Err(ValidationError::InvalidWorkerConcurrency)));
    }

    #[test]
    fn test_managed_capability_without_endpoint() {
        let mut config = create_test_config();
        config.capabilities.extractor_mode = CapabilityMode::Managed;
        assert!(matches!(validate(&config), Err(ValidationError::MissingCapabilityEndpoint { field: "extractor" })));
    }
}
