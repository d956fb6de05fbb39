//! Object storage for run artifacts
//! Uses Apache Arrow object_store crate

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{ObjectStore, path::Path as StoragePath};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageConfig, StorageProvider};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage is not configured: {0}")]
    NotConfigured(String),

    #[error("Cannot read local file {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Confirmation of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// Storage client wrapping object_store
#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    /// Bucket or root directory, for logging
    pub location: String,
}

impl StorageClient {
    /// Create new storage client with any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>, location: impl Into<String>) -> Self {
        Self {
            store,
            location: location.into(),
        }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "memory")
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.provider {
            StorageProvider::Memory => Ok(Self::in_memory()),
            StorageProvider::Local => {
                std::fs::create_dir_all(&config.root).map_err(|e| {
                    StorageError::NotConfigured(format!(
                        "cannot create storage root {}: {e}",
                        config.root.display()
                    ))
                })?;
                let store = LocalFileSystem::new_with_prefix(&config.root)?;
                tracing::info!(root = %config.root.display(), "Storage: local filesystem");
                Ok(Self::new(
                    Arc::new(store),
                    config.root.display().to_string(),
                ))
            }
            StorageProvider::S3 => {
                let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key)
                else {
                    return Err(StorageError::NotConfigured(
                        "S3 provider requires S3_ACCESS_KEY and S3_SECRET_KEY".into(),
                    ));
                };

                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(&config.bucket)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key);
                if let Some(region) = &config.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.is_empty()) {
                    let endpoint = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                        endpoint.to_string()
                    } else {
                        format!("https://{endpoint}")
                    };
                    builder = builder
                        .with_allow_http(endpoint.starts_with("http://"))
                        .with_endpoint(endpoint);
                }

                let store = builder.build()?;
                tracing::info!(bucket = %config.bucket, "Storage: S3");
                Ok(Self::new(Arc::new(store), config.bucket.clone()))
            }
        }
    }

    /// Upload bytes to storage
    pub async fn upload(&self, key: &str, data: Vec<u8>) -> Result<UploadReceipt> {
        let path = StoragePath::from(key);
        let size = data.len();

        let put_result = self.store.put(&path, data.into()).await?;

        tracing::info!(key, size, location = %self.location, "Uploaded to storage");

        Ok(UploadReceipt {
            key: key.to_string(),
            etag: put_result.e_tag,
            size,
        })
    }

    /// Upload a local file under `folder/<file name>`
    pub async fn upload_file(&self, folder: &str, local: &Path) -> Result<UploadReceipt> {
        let name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::NotFound(local.display().to_string()))?;
        let data = tokio::fs::read(local)
            .await
            .map_err(|source| StorageError::LocalRead {
                path: local.to_path_buf(),
                source,
            })?;

        self.upload(&object_key(folder, name), data).await
    }

    /// Download from storage
    pub async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let path = StoragePath::from(key);

        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = result.bytes().await?;

        tracing::debug!(key, size = bytes.len(), "Downloaded from storage");

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

/// Join a destination folder and object name into a key
pub fn object_key(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}
