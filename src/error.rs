use thiserror::Error;

use crate::batch::BatchError;
use crate::config::ConfigError;
use crate::credentials::CredentialError;
use crate::fetch::{FetchError, PaginateError, ShardError};
use crate::manifest::ManifestError;
use crate::schema::SchemaError;
use crate::sink::SinkError;
use crate::storage::StorageError;
use crate::window::WindowError;

/// Any failure that ends an ingestion run
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid window: {0}")]
    Window(#[from] WindowError),

    #[error("HTTP error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Shard error: {0}")]
    Shard(#[from] ShardError),

    #[error("Pagination error: {0}")]
    Paginate(#[from] PaginateError),

    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Persistence error: {0}")]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
