use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration (§10.3).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub worker: WorkerSectionConfig,
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Server configuration (HTTP API bind address and request limits, §10.1).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Bind address for the standalone Event Ingress process (§4.7, §10.4).
    #[serde(default = "default_ingress_bind_addr")]
    pub ingress_bind_addr: SocketAddr,
    #[serde(default)]
    pub api: ApiLimits,
}

/// API request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            ingress_bind_addr: default_ingress_bind_addr(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_ingress_bind_addr() -> SocketAddr {
    "0.0.0.0:8081".parse().unwrap()
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(5 * 1024 * 1024)
}

/// Storage provider type for the object-store backend holding uploads/results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    S3,
    #[default]
    Local,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub endpoint: Option<String>,
    #[serde(skip)]
    pub access_key: Option<String>,
    #[serde(skip)]
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            bucket: default_bucket(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            region: None,
        }
    }
}

fn default_bucket() -> String {
    "videopipe-default".to_string()
}

/// Which backend implementation a pluggable component runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    // Local (embedded fjall) or Managed (Postgres-backed).
    #[default]
    Local,
    Managed,
}

/// State Store configuration (§4.2).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_store_path")]
    pub fjall_path: PathBuf,
    /// Postgres DSN for the managed backend. Loaded from env (`DATABASE_URL`), not TOML.
    #[serde(skip)]
    pub managed_dsn: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            fjall_path: default_store_path(),
            managed_dsn: None,
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/store")
}

/// Work Queue + DLQ configuration (§4.6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_queue_path")]
    pub fjall_path: PathBuf,
    #[serde(skip)]
    pub managed_dsn: Option<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            fjall_path: default_queue_path(),
            managed_dsn: None,
        }
    }
}

fn default_queue_path() -> PathBuf {
    PathBuf::from("data/queue")
}

/// Event Stream configuration (§4.6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_stream_path")]
    pub fjall_path: PathBuf,
    #[serde(skip)]
    pub managed_dsn: Option<String>,
    #[serde(default = "default_stream_name")]
    pub stream_name: String,
    #[serde(default = "default_trim_length")]
    pub trim_length: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            fjall_path: default_stream_path(),
            managed_dsn: None,
            stream_name: default_stream_name(),
            trim_length: default_trim_length(),
        }
    }
}

fn default_stream_path() -> PathBuf {
    PathBuf::from("data/stream")
}

fn default_stream_name() -> String {
    "video-events".to_string()
}

fn default_trim_length() -> u64 {
    crate::events::STREAM_CAPACITY
}

/// Worker configuration (§4.4). Named `WorkerSectionConfig` to avoid clashing
/// with [`crate::worker::WorkerConfig`], the runtime type it's converted into.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerSectionConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_seconds")]
    pub backoff_seconds: f64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// `JobCompleted` emission target (§4.4 step 4): `None` publishes
    /// directly onto the Event Stream handle this process already holds;
    /// `Some(url)` posts to the Event Ingress's `job-completed` endpoint
    /// instead (for Worker processes deployed without direct stream access).
    #[serde(default)]
    pub completion_ingress_url: Option<String>,
}

impl Default for WorkerSectionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            backoff_seconds: default_backoff_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            completion_ingress_url: None,
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_seconds() -> f64 {
    1.0
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Which implementation the extraction/summarization capabilities run
/// against (§10.3): `mock` for local development and tests, `managed` to
/// call out to a real HTTP-backed provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityMode {
    #[default]
    Mock,
    Managed,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CapabilitiesConfig {
    #[serde(default)]
    pub extractor_mode: CapabilityMode,
    pub extractor_endpoint: Option<String>,
    #[serde(default)]
    pub summarizer_mode: CapabilityMode,
    pub summarizer_endpoint: Option<String>,
}

/// Bearer-token auth configuration gating `/jobs/*` and `/history` (§10.1).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,
    #[serde(default = "default_jwt_ttl_seconds")]
    pub jwt_ttl_seconds: i64,
    /// Username accepted by `/auth/login`. The password is loaded from an
    /// environment variable, never stored in TOML.
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(skip)]
    pub jwt_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_issuer: default_jwt_issuer(),
            jwt_ttl_seconds: default_jwt_ttl_seconds(),
            username: default_username(),
            password: None,
            jwt_secret: None,
        }
    }
}

fn default_jwt_issuer() -> String {
    "videopipe".to_string()
}

fn default_jwt_ttl_seconds() -> i64 {
    3600
}

fn default_username() -> String {
    "admin".to_string()
}

/// Retention configuration (§4.2 terminal-job cleanup, not scheduled by this
/// crate — left as config for an external cron/operator to consult).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_job_ttl_days")]
    pub job_ttl_days: u32,
    #[serde(default = "default_store_max_bytes")]
    pub store_max_bytes: ByteSize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            job_ttl_days: default_job_ttl_days(),
            store_max_bytes: default_store_max_bytes(),
        }
    }
}

fn default_job_ttl_days() -> u32 {
    30
}

fn default_store_max_bytes() -> ByteSize {
    ByteSize(50 * 1024 * 1024 * 1024)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: SocketAddr,
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_addr: default_metrics_addr(),
            otlp_endpoint: None,
        }
    }
}

fn default_metrics_addr() -> SocketAddr {
    "0.0.0.0:9090".parse().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config {
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
        };

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.api.max_payload_bytes.as_u64(), 5 * 1024 * 1024);
        assert_eq!(config.worker.max_attempts, 3);
        assert_eq!(config.store.backend, Backend::Local);
    }
}
