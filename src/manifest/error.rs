use std::path::PathBuf;
use thiserror::Error;

use crate::fetch::FetchError;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Manifest cache {path} is unreadable: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Manifest cache I/O error at {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ManifestError>;
