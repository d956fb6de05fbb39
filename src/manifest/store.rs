use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::entry::ManifestEntry;
use super::error::{ManifestError, Result};
use crate::fetch::HttpClient;

/// Where the entries of a [`ManifestLoad`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSource {
    Remote,
    Cache,
}

/// Result of acquiring the manifest
#[derive(Debug, Clone)]
pub struct ManifestLoad {
    pub entries: Vec<ManifestEntry>,
    /// Rows dropped because a field was missing or underivable
    pub dropped_rows: usize,
    /// Well-formed rows of another shard type
    pub other_type_rows: usize,
    pub source: ManifestSource,
}

/// Fetches the remote shard manifest and keeps a local CSV copy of it
pub struct ManifestStore<'a> {
    http: &'a HttpClient,
    url: String,
    shard_type: String,
    cache_path: PathBuf,
}

impl<'a> ManifestStore<'a> {
    pub fn new(
        http: &'a HttpClient,
        url: impl Into<String>,
        shard_type: impl Into<String>,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            shard_type: shard_type.into(),
            cache_path: cache_path.into(),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Refresh from the remote manifest, or reuse the cache when allowed and present
    pub async fn get_manifest(&self, refresh: bool) -> Result<ManifestLoad> {
        if !refresh && self.cache_path.is_file() {
            info!(path = %self.cache_path.display(), "Using the local manifest cache");
            let entries = read_cache(&self.cache_path)?;
            return Ok(ManifestLoad {
                entries,
                dropped_rows: 0,
                other_type_rows: 0,
                source: ManifestSource::Cache,
            });
        }

        info!(url = %self.url, "Fetching the latest manifest");
        let text = self.http.get_text(&self.url).await?;
        let load = parse_manifest(&text, &self.shard_type);
        write_cache(&self.cache_path, &load.entries)?;

        info!(
            entries = load.entries.len(),
            dropped = load.dropped_rows,
            other_type = load.other_type_rows,
            path = %self.cache_path.display(),
            "Manifest cached"
        );
        Ok(load)
    }
}

/// Parse manifest text, dropping malformed rows and rows of another shard type
pub fn parse_manifest(text: &str, shard_type: &str) -> ManifestLoad {
    let mut entries = Vec::new();
    let mut dropped_rows = 0;
    let mut other_type_rows = 0;

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match ManifestEntry::parse_line(line) {
            Ok(entry) if entry.resource_type == shard_type => entries.push(entry),
            Ok(_) => other_type_rows += 1,
            Err(e) => {
                debug!(line = line_no + 1, error = %e, "Dropping manifest row");
                dropped_rows += 1;
            }
        }
    }

    ManifestLoad {
        entries,
        dropped_rows,
        other_type_rows,
        source: ManifestSource::Remote,
    }
}

fn write_cache(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ManifestError::CacheIo {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|source| ManifestError::Cache {
        path: path.to_path_buf(),
        source,
    })?;
    if entries.is_empty() {
        writer
            .write_record(["size", "hash", "url", "type", "datetime_str", "datetime"])
            .map_err(|source| ManifestError::Cache {
                path: path.to_path_buf(),
                source,
            })?;
    }
    for entry in entries {
        writer.serialize(entry).map_err(|source| ManifestError::Cache {
            path: path.to_path_buf(),
            source,
        })?;
    }
    writer.flush().map_err(|source| ManifestError::CacheIo {
        path: path.to_path_buf(),
        source,
    })
}

fn read_cache(path: &Path) -> Result<Vec<ManifestEntry>> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| ManifestError::Cache {
        path: path.to_path_buf(),
        source,
    })?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<ManifestEntry>, _>>()
        .map_err(|source| ManifestError::Cache {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::fetch::{FetchError, RetryPolicy};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MANIFEST: &str = "\
150383 297a16b493de7cf6ca809a7cc31d0b93 http://data.gdeltproject.org/gdeltv2/20240101000000.export.CSV.zip
318084 bb27f78ba45f69a17ea6ed7755e9f8ff http://data.gdeltproject.org/gdeltv2/20240101000000.mentions.CSV.zip
10768507 ea8dde0beb0ba98810a92db068c0ce99 http://data.gdeltproject.org/gdeltv2/20240101000000.gkg.csv.zip
bad line
10502456 2b4b4b7e1f0b3b1c1c0d1d9a2f0e7b55 http://data.gdeltproject.org/gdeltv2/20240101001500.gkg.csv.zip
7 abc http://data.gdeltproject.org/gdeltv2/masterfilelist
";

    fn http() -> HttpClient {
        HttpClient::new(&HttpConfig::default(), RetryPolicy::none()).unwrap()
    }

    async fn serve(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/masterfilelist.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_parse_manifest_keeps_expected_type() {
        let load = parse_manifest(MANIFEST, "gkg");

        assert_eq!(load.entries.len(), 2);
        assert_eq!(load.dropped_rows, 2);
        assert_eq!(load.other_type_rows, 2);
        assert!(load.entries.iter().all(|e| e.resource_type == "gkg"));
        assert!(load.entries[0].timestamp < load.entries[1].timestamp);
    }

    #[test]
    fn test_parse_then_filter_selects_single_shard() {
        let text = "100 abc http://x/20240101000000.gkg.csv.zip\nbad line\n";
        let load = parse_manifest(text, "gkg");
        let window = crate::window::TimeWindow::parse("2023-12-31", "2024-01-02").unwrap();

        let selected = crate::window::filter(&load.entries, &window);
        assert_eq!(selected.len(), 1);
        assert_eq!(
            selected[0].timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-01-01 00:00:00"
        );
    }

    #[test]
    fn test_cache_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("meta/manifest.csv");
        let entries = parse_manifest(MANIFEST, "gkg").entries;

        write_cache(&path, &entries).unwrap();
        let first = fs::read(&path).unwrap();
        assert!(String::from_utf8_lossy(&first)
            .starts_with("size,hash,url,type,datetime_str,datetime\n"));
        assert!(String::from_utf8_lossy(&first).contains(",2024-01-01 00:15:00\n"));

        let reread = read_cache(&path).unwrap();
        assert_eq!(reread, entries);

        write_cache(&path, &reread).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_empty_cache_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.csv");

        write_cache(&path, &[]).unwrap();
        assert!(read_cache(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_fetches_and_caches() {
        let server = serve(MANIFEST).await;
        let temp_dir = TempDir::new().unwrap();
        let cache = temp_dir.path().join("manifest.csv");
        let http = http();
        let store = ManifestStore::new(
            &http,
            format!("{}/masterfilelist.txt", server.uri()),
            "gkg",
            &cache,
        );

        let load = store.get_manifest(true).await.unwrap();
        assert_eq!(load.source, ManifestSource::Remote);
        assert_eq!(load.entries.len(), 2);
        assert!(cache.is_file());
    }

    #[tokio::test]
    async fn test_reuse_returns_cached_entries() {
        let server = serve(MANIFEST).await;
        let temp_dir = TempDir::new().unwrap();
        let cache = temp_dir.path().join("manifest.csv");
        let http = http();
        let url = format!("{}/masterfilelist.txt", server.uri());

        let fresh = ManifestStore::new(&http, &url, "gkg", &cache)
            .get_manifest(true)
            .await
            .unwrap();

        // A different expected type proves the cache is loaded without re-filtering
        let cached = ManifestStore::new(&http, &url, "export", &cache)
            .get_manifest(false)
            .await
            .unwrap();

        assert_eq!(cached.source, ManifestSource::Cache);
        assert_eq!(cached.entries, fresh.entries);
    }

    #[tokio::test]
    async fn test_missing_cache_forces_fetch() {
        let server = serve(MANIFEST).await;
        let temp_dir = TempDir::new().unwrap();
        let http = http();
        let store = ManifestStore::new(
            &http,
            format!("{}/masterfilelist.txt", server.uri()),
            "gkg",
            temp_dir.path().join("absent.csv"),
        );

        let load = store.get_manifest(false).await.unwrap();
        assert_eq!(load.source, ManifestSource::Remote);
    }

    #[tokio::test]
    async fn test_unreachable_manifest_without_cache_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let temp_dir = TempDir::new().unwrap();
        let http = http();
        let store = ManifestStore::new(
            &http,
            format!("{}/masterfilelist.txt", server.uri()),
            "gkg",
            temp_dir.path().join("manifest.csv"),
        );

        let err = store.get_manifest(false).await.unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Fetch(FetchError::Status { status: 503, .. })
        ));
        assert!(!store.cache_path().exists());
    }
}
