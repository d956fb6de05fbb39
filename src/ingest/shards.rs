//! Manifest-driven ingestion: manifest → window filter → shards → batch → sink

use bon::Builder;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::batch::{Artifact, Batch};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{HttpClient, ShardFetcher};
use crate::manifest::{ManifestEntry, ManifestSource, ManifestStore};
use crate::observability::{Metrics, MetricsSnapshot};
use crate::sink::{PersistenceSink, Uploader};
use crate::storage::UploadReceipt;
use crate::window::{self, TimeWindow};

#[derive(Debug, Clone, Builder)]
pub struct ShardRunOptions {
    pub window: TimeWindow,
    /// Fetch the manifest even when a cache exists
    #[builder(default = true)]
    pub refresh_manifest: bool,
    /// Overrides `manifest.cache_path`
    #[builder(into)]
    pub manifest_cache: Option<PathBuf>,
    /// Overrides `storage.folder`
    #[builder(into)]
    pub folder: Option<String>,
    /// Draw a terminal progress bar
    #[builder(default)]
    pub progress: bool,
}

#[derive(Debug, Clone)]
pub struct ShardRunReport {
    pub run_id: Uuid,
    pub manifest_source: ManifestSource,
    pub manifest_entries: usize,
    pub shards: usize,
    pub artifact: Artifact,
    pub receipt: UploadReceipt,
    pub metrics: MetricsSnapshot,
}

/// `{prefix}_{after}_{before}.csv.gz`
pub fn artifact_name(prefix: &str, window: &TimeWindow) -> String {
    format!("{prefix}_{}_{}.csv.gz", window.after(), window.before())
}

pub struct ShardIngest<'a, U> {
    config: &'a Config,
    http: &'a HttpClient,
    sink: &'a PersistenceSink<U>,
}

impl<'a, U: Uploader> ShardIngest<'a, U> {
    pub fn new(config: &'a Config, http: &'a HttpClient, sink: &'a PersistenceSink<U>) -> Self {
        Self { config, http, sink }
    }

    pub async fn run(&self, options: ShardRunOptions) -> Result<ShardRunReport> {
        let run_id = Uuid::now_v7();
        let span = info_span!("shards", %run_id, window = %options.window);
        self.execute(run_id, options).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, options: ShardRunOptions) -> Result<ShardRunReport> {
        let metrics = Metrics::new();
        let retries_before = self.http.retries();
        let schema = self.config.shard_schema()?;

        let cache_path = options
            .manifest_cache
            .clone()
            .unwrap_or_else(|| self.config.manifest.cache_path.clone());
        let store = ManifestStore::new(
            self.http,
            self.config.manifest.url.as_str(),
            self.config.manifest.shard_type.as_str(),
            cache_path,
        );
        let manifest = store.get_manifest(options.refresh_manifest).await?;
        metrics.manifest_rows_dropped(manifest.dropped_rows as u64);

        let selected = window::filter(&manifest.entries, &options.window);
        info!(
            manifest_entries = manifest.entries.len(),
            selected = selected.len(),
            "Shards selected"
        );

        let path = self.config.output.work_dir.join(artifact_name(
            &self.config.output.artifact_prefix,
            &options.window,
        ));
        let mut batch = Batch::create(&path, schema.usecols())?;

        let progress = progress_bar(selected.len() as u64, options.progress);
        let fetcher = ShardFetcher::new(self.http, &schema);
        if let Err(e) = fill(&fetcher, &selected, &mut batch, &metrics, &progress).await {
            progress.abandon_with_message("failed");
            batch.discard();
            return Err(e);
        }
        progress.finish_with_message("done");

        let artifact = batch.finish()?;
        metrics.retries(self.http.retries().saturating_sub(retries_before));

        let folder = options
            .folder
            .as_deref()
            .unwrap_or(self.config.storage.folder.as_str());
        let receipt = self.sink.persist(&artifact, folder).await?;

        let metrics = metrics.snapshot();
        metrics.log();

        Ok(ShardRunReport {
            run_id,
            manifest_source: manifest.source,
            manifest_entries: manifest.entries.len(),
            shards: selected.len(),
            artifact,
            receipt,
            metrics,
        })
    }
}

async fn fill(
    fetcher: &ShardFetcher<'_>,
    entries: &[ManifestEntry],
    batch: &mut Batch,
    metrics: &Metrics,
    progress: &ProgressBar,
) -> Result<()> {
    for entry in entries {
        progress.set_message(entry.datetime_str.clone());
        let shard = fetcher.fetch_shard(&entry.url).await?;
        batch.append(&shard.records)?;
        metrics.shard_fetched(shard.records.len() as u64, shard.lossy);
        info!(url = %entry.url, rows = shard.records.len(), "Shard fetched");
        progress.inc(1);
    }
    Ok(())
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_name_from_bounds() {
        let window = TimeWindow::parse("2024-01-01", "2024-01-02").unwrap();
        assert_eq!(
            artifact_name("gdelt_gkg", &window),
            "gdelt_gkg_2024-01-01_2024-01-02.csv.gz"
        );

        let window = TimeWindow::parse("2024-01-01T06:00:00", "2024-01-01T12:00:00").unwrap();
        assert_eq!(
            artifact_name("gdelt_gkg", &window),
            "gdelt_gkg_2024-01-01T060000_2024-01-01T120000.csv.gz"
        );
    }

    #[test]
    fn test_options_defaults() {
        let window = TimeWindow::parse("2024-01-01", "2024-01-02").unwrap();
        let options = ShardRunOptions::builder().window(window).build();

        assert!(options.refresh_manifest);
        assert!(!options.progress);
        assert!(options.folder.is_none());
        assert!(options.manifest_cache.is_none());
    }
}
