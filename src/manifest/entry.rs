use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Filename timestamp layouts, most specific first
const TIMESTAMP_FORMATS: &[&str] = &["%Y%m%d%H%M%S", "%Y%m%d%H%M"];

/// Why a manifest row was dropped
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("unexpected trailing field '{0}'")]
    TrailingField(String),
    #[error("size '{0}' is not an integer")]
    InvalidSize(String),
    #[error("no resource type in '{0}'")]
    NoResourceType(String),
    #[error("no timestamp in '{0}'")]
    InvalidTimestamp(String),
}

/// One downloadable shard listed in the manifest.
///
/// Serialized field names match the cache file columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub size: u64,
    #[serde(rename = "hash")]
    pub content_hash: String,
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub datetime_str: String,
    #[serde(rename = "datetime", with = "cache_datetime")]
    pub timestamp: NaiveDateTime,
}

impl ManifestEntry {
    /// Parse a `<size> <hash> <url>` manifest line
    pub fn parse_line(line: &str) -> Result<Self, ParseError> {
        let mut fields = line.split_whitespace();
        let size = fields.next().ok_or(ParseError::MissingField("size"))?;
        let content_hash = fields.next().ok_or(ParseError::MissingField("hash"))?;
        let url = fields.next().ok_or(ParseError::MissingField("url"))?;
        if let Some(extra) = fields.next() {
            return Err(ParseError::TrailingField(extra.to_string()));
        }

        let size = size
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidSize(size.to_string()))?;

        let resource_type = filename_part(url, 1)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ParseError::NoResourceType(url.to_string()))?;
        let datetime_str = filename_part(url, 0)
            .ok_or_else(|| ParseError::InvalidTimestamp(url.to_string()))?;
        let timestamp = parse_timestamp(datetime_str)
            .ok_or_else(|| ParseError::InvalidTimestamp(url.to_string()))?;

        Ok(Self {
            size,
            content_hash: content_hash.to_string(),
            url: url.to_string(),
            resource_type: resource_type.to_string(),
            datetime_str: datetime_str.to_string(),
            timestamp,
        })
    }
}

/// Dot-separated part `index` of the final path segment of `url`.
///
/// Returns `None` when the filename has fewer than two dot-separated parts,
/// so neither a type nor a timestamp can be derived from it.
fn filename_part(url: &str, index: usize) -> Option<&str> {
    let filename = url.rsplit('/').next()?;
    let parts: Vec<&str> = filename.split('.').collect();
    if parts.len() < 2 {
        return None;
    }
    parts.get(index).copied()
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y%m%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

/// `YYYY-MM-DD HH:MM:SS`, the layout written to the cache file
mod cache_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
