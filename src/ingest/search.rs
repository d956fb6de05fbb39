//! Search-API ingestion: one stored page per offset until the capped total is reached

use bon::Builder;
use std::path::PathBuf;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::Result;
use crate::fetch::{DateRange, HttpClient, PageStore, SearchClient, paginate};
use crate::observability::{Metrics, MetricsSnapshot};

#[derive(Debug, Clone, Builder)]
pub struct SearchRunOptions {
    pub range: DateRange,
    /// Overrides `search.credentials_path`
    #[builder(into)]
    pub credentials: Option<PathBuf>,
    /// Overrides `search.output_dir`
    #[builder(into)]
    pub output_dir: Option<PathBuf>,
    /// Reuse page files already on disk
    #[builder(default)]
    pub resume: bool,
}

#[derive(Debug, Clone)]
pub struct SearchRunReport {
    pub run_id: Uuid,
    pub final_offset: u64,
    pub total_available: Option<u64>,
    /// Stopped on an empty page before the reported total
    pub stalled: bool,
    pub files: Vec<PathBuf>,
    pub metrics: MetricsSnapshot,
}

pub struct SearchIngest<'a> {
    config: &'a Config,
    http: &'a HttpClient,
}

impl<'a> SearchIngest<'a> {
    pub fn new(config: &'a Config, http: &'a HttpClient) -> Self {
        Self { config, http }
    }

    pub async fn run(&self, options: SearchRunOptions) -> Result<SearchRunReport> {
        let run_id = Uuid::now_v7();
        let span = info_span!("search", %run_id, range = %options.range);
        self.execute(run_id, options).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, options: SearchRunOptions) -> Result<SearchRunReport> {
        let metrics = Metrics::new();
        let retries_before = self.http.retries();

        let mut search = self.config.search.clone();
        if let Some(path) = options.credentials {
            search.credentials_path = path;
        }
        if let Some(dir) = options.output_dir {
            search.output_dir = dir;
        }

        let credentials = Credentials::resolve(&search)?;
        let client = SearchClient::new(self.http, &search, credentials, options.range);
        let store = PageStore::new(
            search.output_dir.clone(),
            search.file_prefix.as_str(),
            options.range,
        );

        info!(
            cap = search.max_results,
            page_size = search.page_size,
            dir = %store.dir().display(),
            resume = options.resume,
            "Starting paginated search"
        );
        let outcome = paginate(&client, &store, search.max_results, options.resume).await?;

        metrics.pages(outcome.pages_fetched, outcome.pages_resumed);
        metrics.retries(self.http.retries().saturating_sub(retries_before));
        let metrics = metrics.snapshot();
        metrics.log();

        Ok(SearchRunReport {
            run_id,
            final_offset: outcome.cursor.offset,
            total_available: outcome.cursor.total_available,
            stalled: outcome.cursor.stalled(),
            files: outcome.files,
            metrics,
        })
    }
}
