//! Layered configuration for videopipe (§10.3).
//!
//! Settings load from, in increasing priority:
//! 1. Default values (embedded in struct `Default` impls)
//! 2. A TOML configuration file
//! 3. Environment variables (`VIDEOPIPE__SECTION__KEY`)
//!
//! Secrets (object-store credentials, the managed-backend DSN, auth
//! password/JWT secret) are loaded separately from plain environment
//! variables and never read from or written back to the TOML file.
//!
//! # Configuration file
//!
//! By default, configuration is loaded from `config/videopipe.toml`. This can
//! be overridden with the `VIDEOPIPE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    ApiLimits, AuthConfig, Backend, CapabilitiesConfig, CapabilityMode, Config, QueueConfig,
    RetentionConfig, ServerConfig, StorageConfig, StorageProvider, StreamConfig, StoreConfig,
    TelemetryConfig, WorkerSectionConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment), validating
    /// the result.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path. Useful for tests.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
