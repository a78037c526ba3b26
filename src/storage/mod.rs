//! Object storage abstraction for uploaded video objects and their results
//! Uses Apache Arrow object_store crate

use object_store::{ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem, path::Path as StoragePath};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageConfig, StorageProvider};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Metadata returned after upload
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub key: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// Storage client wrapping object_store
#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    pub bucket: String,
}

impl StorageClient {
    /// Create new storage client with any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String) -> Self {
        Self { store, bucket }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(object_store::memory::InMemory::new()),
            bucket: "videopipe-local".to_string(),
        }
    }

    /// Build a client from configuration (§10.3): `s3` wires a real bucket via
    /// `AmazonS3Builder` (optionally pointed at a non-AWS endpoint, e.g.
    /// minio); `local` uses the filesystem rooted at `data/objects`.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match config.provider {
            StorageProvider::S3 => {
                let mut builder = AmazonS3Builder::new().with_bucket_name(&config.bucket);
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.with_endpoint(endpoint).with_allow_http(true);
                }
                if let Some(region) = &config.region {
                    builder = builder.with_region(region);
                }
                if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
                    builder = builder.with_access_key_id(access_key).with_secret_access_key(secret_key);
                }
                Arc::new(
                    builder
                        .build()
                        .map_err(|e| StorageError::UploadFailed(format!("failed to build S3 client: {e}")))?,
                )
            }
            StorageProvider::Local => {
                let root = std::path::PathBuf::from("data/objects");
                std::fs::create_dir_all(&root)
                    .map_err(|e| StorageError::UploadFailed(format!("failed to create local storage root: {e}")))?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(&root)
                        .map_err(|e| StorageError::UploadFailed(format!("failed to open local storage root: {e}")))?,
                )
            }
        };

        Ok(Self {
            store,
            bucket: config.bucket.clone(),
        })
    }

    /// Upload bytes to storage
    pub async fn upload(&self, key: &str, data: Vec<u8>) -> Result<UploadMetadata> {
        let path = StoragePath::from(key);
        let size = data.len();

        let put_result = self.store
            .put(&path, data.into())
            .await?;

        tracing::info!(key, size, "Uploaded to storage");

        Ok(UploadMetadata {
            key: key.to_string(),
            etag: put_result.e_tag.clone(),
            size,
        })
    }

    /// Download from storage
    pub async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let path = StoragePath::from(key);

        let result = self.store
            .get(&path)
            .await?;

        let bytes = result.bytes().await?;

        tracing::info!(key, size = bytes.len(), "Downloaded from storage");

        Ok(bytes.to_vec())
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = StoragePath::from(key);

        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
