//! Offset-cursor pagination over a capped result set
//!
//! Each page is written verbatim to its own file named by the date range and
//! offset, so a run can be resumed by skipping offsets already on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use super::http::FetchError;
use super::search::{DateRange, SearchPage};

/// Anything that can return the page starting at `offset`
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, offset: u64) -> Result<SearchPage, FetchError>;
}

#[derive(Debug, Error)]
pub enum PaginateError {
    #[error("Search request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to write page {path}: {source}")]
    PageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read stored page {path}: {source}")]
    PageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Position within a paginated result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub offset: u64,
    /// `min(total, cap)`, unknown until the first page arrives
    pub total_available: Option<u64>,
    pub cap: u64,
    stalled: bool,
}

impl PaginationCursor {
    pub fn new(cap: u64) -> Self {
        Self {
            offset: 0,
            total_available: None,
            cap,
            stalled: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.stalled || self.total_available.is_some_and(|total| self.offset >= total)
    }

    /// A page that returned no results before the end was reached
    pub fn stalled(&self) -> bool {
        self.stalled
    }

    /// Fold one page into the cursor.
    ///
    /// The limit is recomputed from every page but never grows: a later,
    /// smaller `total` lowers it, a larger one is ignored.
    pub fn advance(&mut self, page_total: u64, page_results: u64) {
        let limit = page_total.min(self.cap);
        self.total_available = Some(match self.total_available {
            Some(previous) => previous.min(limit),
            None => limit,
        });
        self.offset += page_results;

        if page_results == 0 && !self.is_done() {
            self.stalled = true;
        }
    }
}

/// Directory of page files for one date range
#[derive(Debug, Clone)]
pub struct PageStore {
    dir: PathBuf,
    prefix: String,
    range: DateRange,
}

impl PageStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, range: DateRange) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            range,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, offset: u64) -> PathBuf {
        self.dir
            .join(format!("{}_{}_from_{}.json", self.prefix, self.range, offset))
    }

    pub async fn save(&self, offset: u64, raw: &str) -> Result<PathBuf, PaginateError> {
        let path = self.path_for(offset);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| PaginateError::PageWrite {
                path: path.clone(),
                source,
            })?;
        tokio::fs::write(&path, raw)
            .await
            .map_err(|source| PaginateError::PageWrite {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    pub async fn load(&self, offset: u64) -> Result<Option<String>, PaginateError> {
        let path = self.path_for(offset);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PaginateError::PageRead { path, source }),
        }
    }
}

/// Summary of a pagination run
#[derive(Debug, Clone)]
pub struct PaginationOutcome {
    pub cursor: PaginationCursor,
    pub pages_fetched: u64,
    pub pages_resumed: u64,
    pub files: Vec<PathBuf>,
}

/// Walk the result set from offset 0 until the capped total is reached.
///
/// A failed request ends the run immediately; pages already written stay on disk.
pub async fn paginate<S>(
    source: &S,
    store: &PageStore,
    cap: u64,
    resume: bool,
) -> Result<PaginationOutcome, PaginateError>
where
    S: PageSource + ?Sized,
{
    let mut cursor = PaginationCursor::new(cap);
    let mut outcome = PaginationOutcome {
        cursor,
        pages_fetched: 0,
        pages_resumed: 0,
        files: Vec::new(),
    };

    while !cursor.is_done() {
        let offset = cursor.offset;

        let stored = if resume { stored_page(store, offset).await? } else { None };

        let page = match stored {
            Some(page) => {
                info!(offset, path = %store.path_for(offset).display(), "Reusing stored page");
                outcome.pages_resumed += 1;
                outcome.files.push(store.path_for(offset));
                page
            }
            None => {
                let page = match source.fetch_page(offset).await {
                    Ok(page) => page,
                    Err(e) => {
                        if let FetchError::Status { status, body, .. } = &e {
                            error!(offset, status, body = %body, "Search request rejected");
                        } else {
                            error!(offset, error = %e, "Search request failed");
                        }
                        return Err(e.into());
                    }
                };
                let path = store.save(offset, &page.raw).await?;
                info!(offset, results = page.results, total = page.total, path = %path.display(), "Saved page");
                outcome.pages_fetched += 1;
                outcome.files.push(path);
                page
            }
        };

        cursor.advance(page.total, page.results);
    }

    if cursor.stalled() {
        warn!(
            offset = cursor.offset,
            total_available = ?cursor.total_available,
            "Page returned no results before the reported total, stopping"
        );
    }

    outcome.cursor = cursor;
    Ok(outcome)
}

async fn stored_page(store: &PageStore, offset: u64) -> Result<Option<SearchPage>, PaginateError> {
    let Some(raw) = store.load(offset).await? else {
        return Ok(None);
    };
    let path = store.path_for(offset);
    match SearchPage::parse(&path.display().to_string(), raw) {
        Ok(page) => Ok(Some(page)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Stored page is unreadable, fetching again");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serves pages of `page_size` out of `total`, optionally overriding totals per call
    struct ScriptedSource {
        total: u64,
        page_size: u64,
        totals: Mutex<Vec<u64>>,
        empty_from: Option<u64>,
        fail_at: Option<u64>,
        requested: Mutex<Vec<u64>>,
    }

    impl ScriptedSource {
        fn new(total: u64, page_size: u64) -> Self {
            Self {
                total,
                page_size,
                totals: Mutex::new(Vec::new()),
                empty_from: None,
                fail_at: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u64> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, offset: u64) -> Result<SearchPage, FetchError> {
            self.requested.lock().unwrap().push(offset);

            if self.fail_at == Some(offset) {
                return Err(FetchError::Status {
                    url: "scripted".into(),
                    status: 401,
                    body: "{\"error\":\"bad token\"}".into(),
                });
            }

            let total = {
                let mut totals = self.totals.lock().unwrap();
                if totals.is_empty() { self.total } else { totals.remove(0) }
            };
            let results = match self.empty_from {
                Some(from) if offset >= from => 0,
                _ => self.page_size.min(total.saturating_sub(offset)),
            };
            let raw = format!(r#"{{"total":{total},"results":{results},"data":[]}}"#);
            Ok(SearchPage { total, results, raw })
        }
    }

    fn store(dir: &TempDir) -> PageStore {
        PageStore::new(
            dir.path(),
            "journals",
            DateRange::parse("2024-01-01", "2024-01-31").unwrap(),
        )
    }

    #[test]
    fn test_cursor_stops_at_total() {
        let mut cursor = PaginationCursor::new(300);
        assert!(!cursor.is_done());

        cursor.advance(120, 100);
        assert_eq!(cursor.total_available, Some(120));
        assert!(!cursor.is_done());

        cursor.advance(120, 20);
        assert_eq!(cursor.offset, 120);
        assert!(cursor.is_done());
        assert!(!cursor.stalled());
    }

    #[test]
    fn test_cursor_zero_results_stops() {
        let mut cursor = PaginationCursor::new(300);
        cursor.advance(500, 0);
        assert!(cursor.is_done());
        assert!(cursor.stalled());
    }

    #[test]
    fn test_cursor_empty_result_set() {
        let mut cursor = PaginationCursor::new(300);
        cursor.advance(0, 0);
        assert!(cursor.is_done());
        assert!(!cursor.stalled());
    }

    #[tokio::test]
    async fn test_total_below_cap() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(250, 100);

        let outcome = paginate(&source, &store(&dir), 300, false).await.unwrap();

        assert_eq!(outcome.cursor.offset, 250);
        assert_eq!(source.requested(), vec![0, 100, 200]);
        assert_eq!(outcome.pages_fetched, 3);
    }

    #[tokio::test]
    async fn test_cap_binds() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(500, 100);

        let outcome = paginate(&source, &store(&dir), 300, false).await.unwrap();

        assert!(outcome.cursor.offset >= 300);
        assert_eq!(outcome.cursor.total_available, Some(300));
        assert_eq!(source.requested(), vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn test_pages_written_verbatim() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(120, 100);
        let store = store(&dir);

        let outcome = paginate(&source, &store, 300, false).await.unwrap();

        assert_eq!(outcome.cursor.offset, 120);
        assert_eq!(source.requested(), vec![0, 100]);
        assert_eq!(
            outcome.files,
            vec![
                dir.path().join("journals_2024-01-01_to_2024-01-31_from_0.json"),
                dir.path().join("journals_2024-01-01_to_2024-01-31_from_100.json"),
            ]
        );
        assert_eq!(
            std::fs::read_to_string(&outcome.files[1]).unwrap(),
            r#"{"total":120,"results":20,"data":[]}"#
        );
    }

    #[tokio::test]
    async fn test_zero_result_page_terminates() {
        let dir = TempDir::new().unwrap();
        let mut source = ScriptedSource::new(500, 100);
        source.empty_from = Some(100);

        let outcome = paginate(&source, &store(&dir), 300, false).await.unwrap();

        assert_eq!(source.requested(), vec![0, 100]);
        assert_eq!(outcome.cursor.offset, 100);
        assert!(outcome.cursor.stalled());
    }

    #[tokio::test]
    async fn test_shrinking_total_lowers_limit() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(300, 100);
        *source.totals.lock().unwrap() = vec![300, 150, 900];

        let outcome = paginate(&source, &store(&dir), 1000, false).await.unwrap();

        assert_eq!(source.requested(), vec![0, 100]);
        assert_eq!(outcome.cursor.total_available, Some(150));
    }

    #[tokio::test]
    async fn test_error_stops_run_and_keeps_earlier_pages() {
        let dir = TempDir::new().unwrap();
        let mut source = ScriptedSource::new(500, 100);
        source.fail_at = Some(100);
        let store = store(&dir);

        let err = paginate(&source, &store, 300, false).await.unwrap_err();

        assert!(matches!(err, PaginateError::Fetch(FetchError::Status { status: 401, .. })));
        assert_eq!(source.requested(), vec![0, 100]);
        assert!(store.path_for(0).exists());
        assert!(!store.path_for(100).exists());
    }

    #[tokio::test]
    async fn test_resume_skips_stored_pages() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store
            .save(0, r#"{"total":250,"results":100,"data":[]}"#)
            .await
            .unwrap();
        store.save(100, "truncated{").await.unwrap();
        let source = ScriptedSource::new(250, 100);

        let outcome = paginate(&source, &store, 300, true).await.unwrap();

        assert_eq!(source.requested(), vec![100, 200]);
        assert_eq!(outcome.pages_resumed, 1);
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.cursor.offset, 250);
    }

    #[tokio::test]
    async fn test_without_resume_stored_pages_are_refetched() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store
            .save(0, r#"{"total":250,"results":100,"data":[]}"#)
            .await
            .unwrap();
        let source = ScriptedSource::new(250, 100);

        paginate(&source, &store, 300, false).await.unwrap();

        assert_eq!(source.requested(), vec![0, 100, 200]);
    }
}
