//! Logging setup and run metrics

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Counters for one ingestion run
#[derive(Debug, Default)]
pub struct Metrics {
    manifest_rows_dropped: AtomicU64,
    shards_fetched: AtomicU64,
    pages_fetched: AtomicU64,
    pages_resumed: AtomicU64,
    records_appended: AtomicU64,
    lossy_payloads: AtomicU64,
    retries: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manifest_rows_dropped(&self, n: u64) {
        self.manifest_rows_dropped.fetch_add(n, Ordering::Relaxed);
        tracing::debug!(counter = "manifest_rows_dropped", n, "Metric incremented");
    }

    pub fn shard_fetched(&self, records: u64, lossy: bool) {
        self.shards_fetched.fetch_add(1, Ordering::Relaxed);
        self.records_appended.fetch_add(records, Ordering::Relaxed);
        if lossy {
            self.lossy_payloads.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn pages(&self, fetched: u64, resumed: u64) {
        self.pages_fetched.fetch_add(fetched, Ordering::Relaxed);
        self.pages_resumed.fetch_add(resumed, Ordering::Relaxed);
    }

    pub fn retries(&self, n: u64) {
        self.retries.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            manifest_rows_dropped: self.manifest_rows_dropped.load(Ordering::Relaxed),
            shards_fetched: self.shards_fetched.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_resumed: self.pages_resumed.load(Ordering::Relaxed),
            records_appended: self.records_appended.load(Ordering::Relaxed),
            lossy_payloads: self.lossy_payloads.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub manifest_rows_dropped: u64,
    pub shards_fetched: u64,
    pub pages_fetched: u64,
    pub pages_resumed: u64,
    pub records_appended: u64,
    pub lossy_payloads: u64,
    pub retries: u64,
}

impl MetricsSnapshot {
    /// Emit the counters as one structured event
    pub fn log(&self) {
        tracing::info!(
            manifest_rows_dropped = self.manifest_rows_dropped,
            shards_fetched = self.shards_fetched,
            pages_fetched = self.pages_fetched,
            pages_resumed = self.pages_resumed,
            records_appended = self.records_appended,
            lossy_payloads = self.lossy_payloads,
            retries = self.retries,
            "Run metrics"
        );
    }
}
