//! Shard download and decoding
//!
//! Shards are compressed, headerless, tab-separated text. Column identity
//! comes from the declared schema; only the usecols are materialized.

use flate2::read::GzDecoder;
use std::borrow::Cow;
use std::io::{Cursor, Read};
use thiserror::Error;
use tracing::{debug, warn};

use super::http::{FetchError, HttpClient};
use crate::schema::{RawRecord, Schema};

#[derive(Debug, Error)]
pub enum ShardError {
    #[error("Shard download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Shard {url} is not a readable zip archive: {source}")]
    Archive {
        url: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Shard archive {0} contains no files")]
    EmptyArchive(String),

    #[error("Shard {url} could not be decompressed: {source}")]
    Decompress {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Shard {url} has unreadable rows: {source}")]
    Rows {
        url: String,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, ShardError>;

/// Payload compression, chosen from the shard filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Zip,
    Gzip,
    None,
}

impl Compression {
    pub fn from_url(url: &str) -> Self {
        let filename = url.rsplit('/').next().unwrap_or(url).to_ascii_lowercase();
        if filename.ends_with(".zip") {
            Compression::Zip
        } else if filename.ends_with(".gz") {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

/// Records of one shard
#[derive(Debug, Clone)]
pub struct DecodedShard {
    pub records: Vec<RawRecord>,
    /// Some bytes were not valid UTF-8 and were replaced
    pub lossy: bool,
}

/// Decompress, decode and project a shard payload
pub fn decode_shard(url: &str, payload: &[u8], schema: &Schema) -> Result<DecodedShard> {
    let raw = decompress(url, payload)?;

    let text = String::from_utf8_lossy(&raw);
    let lossy = matches!(text, Cow::Owned(_));
    if lossy {
        warn!(url, "Shard contains invalid UTF-8, replaced undecodable bytes");
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| ShardError::Rows {
            url: url.to_string(),
            source,
        })?;
        records.push(schema.project(&row));
    }

    debug!(url, rows = records.len(), "Shard decoded");
    Ok(DecodedShard { records, lossy })
}

fn decompress(url: &str, payload: &[u8]) -> Result<Vec<u8>> {
    match Compression::from_url(url) {
        Compression::Zip => {
            let mut archive =
                zip::ZipArchive::new(Cursor::new(payload)).map_err(|source| ShardError::Archive {
                    url: url.to_string(),
                    source,
                })?;

            for i in 0..archive.len() {
                let mut file = archive.by_index(i).map_err(|source| ShardError::Archive {
                    url: url.to_string(),
                    source,
                })?;
                if file.is_dir() {
                    continue;
                }
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)
                    .map_err(|source| ShardError::Decompress {
                        url: url.to_string(),
                        source,
                    })?;
                return Ok(contents);
            }
            Err(ShardError::EmptyArchive(url.to_string()))
        }
        Compression::Gzip => {
            let mut decoder = GzDecoder::new(payload);
            let mut contents = Vec::new();
            decoder
                .read_to_end(&mut contents)
                .map_err(|source| ShardError::Decompress {
                    url: url.to_string(),
                    source,
                })?;
            Ok(contents)
        }
        Compression::None => Ok(payload.to_vec()),
    }
}

/// Downloads shards one at a time and decodes them against a schema
pub struct ShardFetcher<'a> {
    http: &'a HttpClient,
    schema: &'a Schema,
}

impl<'a> ShardFetcher<'a> {
    pub fn new(http: &'a HttpClient, schema: &'a Schema) -> Self {
        Self { http, schema }
    }

    pub async fn fetch_shard(&self, url: &str) -> Result<DecodedShard> {
        let payload = self.http.get_bytes(url).await?;
        decode_shard(url, &payload, self.schema)
    }
}
