//! Persistence of the finished batch

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::batch::Artifact;
use crate::storage::{StorageClient, StorageError, UploadReceipt};

#[derive(Debug, Error)]
pub enum SinkError {
    /// The local artifact is kept for a later retry
    #[error("Upload of {path} failed, local artifact kept: {source}")]
    Upload {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    #[error("Uploaded {path} but could not remove it: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination of finished artifacts
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, folder: &str, local: &Path) -> Result<UploadReceipt, StorageError>;
}

#[async_trait]
impl Uploader for StorageClient {
    async fn upload(&self, folder: &str, local: &Path) -> Result<UploadReceipt, StorageError> {
        self.upload_file(folder, local).await
    }
}

/// Hands an artifact to the uploader and removes it once the upload is confirmed
pub struct PersistenceSink<U> {
    uploader: U,
}

impl<U: Uploader> PersistenceSink<U> {
    pub fn new(uploader: U) -> Self {
        Self { uploader }
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub async fn persist(&self, artifact: &Artifact, folder: &str) -> Result<UploadReceipt, SinkError> {
        let receipt = match self.uploader.upload(folder, &artifact.path).await {
            Ok(receipt) => receipt,
            Err(source) => {
                warn!(path = %artifact.path.display(), error = %source, "Upload failed, keeping local artifact");
                return Err(SinkError::Upload {
                    path: artifact.path.clone(),
                    source,
                });
            }
        };

        tokio::fs::remove_file(&artifact.path)
            .await
            .map_err(|source| SinkError::Cleanup {
                path: artifact.path.clone(),
                source,
            })?;

        info!(
            key = %receipt.key,
            rows = artifact.rows,
            size = receipt.size,
            "Artifact persisted, local copy removed"
        );
        Ok(receipt)
    }
}
