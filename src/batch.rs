//! Run batch spooled to disk
//!
//! Records are appended in arrival order to a gzip-compressed CSV file as
//! they are fetched, so memory use does not grow with the window. The spool
//! lives next to the artifact as `<name>.part` and only replaces the artifact
//! when the batch is finished, so an aborted run never touches an artifact
//! kept by an earlier run.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::schema::RawRecord;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Cannot create batch file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write batch file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Cannot finalize batch file {path}: {source}")]
    Finish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BatchError>;

/// A finished batch waiting to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub rows: u64,
}

/// Append-only record sequence backed by a compressed CSV file
pub struct Batch {
    path: PathBuf,
    spool: PathBuf,
    writer: csv::Writer<GzEncoder<File>>,
    rows: u64,
}

impl Batch {
    /// Create (or truncate) the spool for the artifact at `path` and write the header row
    pub fn create(path: impl Into<PathBuf>, header: &[String]) -> Result<Self> {
        let path = path.into();
        let spool = spool_path(&path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| BatchError::Create {
                path: spool.clone(),
                source,
            })?;
        }

        let file = File::create(&spool).map_err(|source| BatchError::Create {
            path: spool.clone(),
            source,
        })?;
        let mut writer = csv::Writer::from_writer(GzEncoder::new(file, Compression::default()));
        writer
            .write_record(header)
            .map_err(|source| BatchError::Write {
                path: spool.clone(),
                source,
            })?;

        Ok(Self {
            path,
            spool,
            writer,
            rows: 0,
        })
    }

    /// Where the artifact lands once finished
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spool(&self) -> &Path {
        &self.spool
    }

    pub fn len(&self) -> u64 {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Append records in the order given. No deduplication.
    pub fn append(&mut self, records: &[RawRecord]) -> Result<()> {
        for record in records {
            self.writer
                .write_record(record.values())
                .map_err(|source| BatchError::Write {
                    path: self.spool.clone(),
                    source,
                })?;
        }
        self.rows += records.len() as u64;
        debug!(appended = records.len(), total = self.rows, "Batch extended");
        Ok(())
    }

    /// Close the compressed stream and move the spool onto the artifact path
    pub fn finish(self) -> Result<Artifact> {
        let Self {
            path,
            spool,
            writer,
            rows,
        } = self;

        let encoder = writer.into_inner().map_err(|e| BatchError::Finish {
            path: spool.clone(),
            source: e.into_error(),
        })?;
        let file = encoder.finish().map_err(|source| BatchError::Finish {
            path: spool.clone(),
            source,
        })?;
        file.sync_all().map_err(|source| BatchError::Finish {
            path: spool.clone(),
            source,
        })?;
        drop(file);

        std::fs::rename(&spool, &path).map_err(|source| BatchError::Finish {
            path: path.clone(),
            source,
        })?;

        Ok(Artifact { path, rows })
    }

    /// Drop the partial spool of an aborted run; the artifact path is left alone
    pub fn discard(self) {
        let spool = self.spool.clone();
        drop(self);
        if let Err(e) = std::fs::remove_file(&spool) {
            debug!(path = %spool.display(), error = %e, "Could not remove partial batch");
        }
    }
}

fn spool_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
