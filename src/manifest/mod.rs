//! Shard manifest acquisition
//!
//! The remote manifest is a plain-text list of `<size> <hash> <url>` rows.
//! Each url's filename carries the shard timestamp and type, e.g.
//! `20240101000000.gkg.csv.zip`. Rows whose fields are missing or whose
//! type/timestamp cannot be derived are dropped, never fatal.
//!
//! The filtered table is cached as CSV and reused verbatim on later runs
//! unless a refresh is requested.

mod entry;
mod error;
mod store;

pub use entry::{ManifestEntry, ParseError};
pub use error::{ManifestError, Result};
pub use store::{ManifestLoad, ManifestSource, ManifestStore, parse_manifest};
