use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::schema::{GKG_COLUMNS, GKG_USECOLS};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// HTTP client settings shared by every remote call
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_user_agent() -> String {
    concat!("windowfetch/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Retry policy for remote calls.
///
/// `max_attempts = 1` means a failed call is never repeated.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_multiplier() -> u32 {
    2
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

/// Shard manifest location and cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_url")]
    pub url: String,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Only manifest entries of this type are kept (e.g. "gkg")
    #[serde(default = "default_shard_type")]
    pub shard_type: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            url: default_manifest_url(),
            cache_path: default_cache_path(),
            shard_type: default_shard_type(),
        }
    }
}

fn default_manifest_url() -> String {
    "http://data.gdeltproject.org/gdeltv2/masterfilelist.txt".to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/meta/gdelt_gkg_masterfilelist.csv")
}

fn default_shard_type() -> String {
    "gkg".to_string()
}

/// Positional column names of shard payloads and the subset to keep
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaConfig {
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    #[serde(default = "default_usecols")]
    pub usecols: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            usecols: default_usecols(),
        }
    }
}

fn default_columns() -> Vec<String> {
    GKG_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_usecols() -> Vec<String> {
    GKG_USECOLS.iter().map(|c| c.to_string()).collect()
}

/// Where run artifacts are assembled before upload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default = "default_artifact_prefix")]
    pub artifact_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            artifact_prefix: default_artifact_prefix(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_artifact_prefix() -> String {
    "gdelt_gkg".to_string()
}

/// Storage provider type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    S3,
    #[default]
    Local,
    Memory,
}

/// Upload destination configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    /// Root directory for the local provider
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Destination folder used when the CLI does not name one
    #[serde(default = "default_folder")]
    pub folder: String,
    /// S3 access key (loaded from environment, not from config file)
    #[serde(skip)]
    pub access_key: Option<String>,
    /// S3 secret key (loaded from environment, not from config file)
    #[serde(skip)]
    pub secret_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Local,
            root: default_root(),
            bucket: default_bucket(),
            endpoint: None,
            region: None,
            folder: default_folder(),
            access_key: None,
            secret_key: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_bucket() -> String {
    "windowfetch".to_string()
}

fn default_folder() -> String {
    "gdelt".to_string()
}

/// A fixed clause of the search query.
///
/// Scalar values become `match` clauses, lists become `terms` clauses.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchFilter {
    pub field: String,
    pub value: FilterValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Terms(Vec<serde_json::Value>),
    Match(serde_json::Value),
}

/// Paginated search API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Hard cap on the number of results walked per run
    #[serde(default = "default_max_results")]
    pub max_results: u64,
    #[serde(default = "default_date_field")]
    pub sort_field: String,
    #[serde(default = "default_date_field")]
    pub date_field: String,
    #[serde(default = "default_filters")]
    pub filters: Vec<SearchFilter>,
    /// JSON file holding API tokens keyed by provider name
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_credentials_key")]
    pub credentials_key: String,
    #[serde(default = "default_pages_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// API token (loaded from environment, not from config file)
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: default_search_url(),
            page_size: default_page_size(),
            max_results: default_max_results(),
            sort_field: default_date_field(),
            date_field: default_date_field(),
            filters: default_filters(),
            credentials_path: default_credentials_path(),
            credentials_key: default_credentials_key(),
            output_dir: default_pages_dir(),
            file_prefix: default_file_prefix(),
            token: None,
        }
    }
}

fn default_search_url() -> String {
    "https://api.lens.org/scholarly/search".to_string()
}

fn default_page_size() -> u64 {
    100
}

fn default_max_results() -> u64 {
    300
}

fn default_date_field() -> String {
    "date_published".to_string()
}

fn default_filters() -> Vec<SearchFilter> {
    use serde_json::json;

    vec![
        SearchFilter {
            field: "source.type".to_string(),
            value: FilterValue::Match(json!("Journal")),
        },
        SearchFilter {
            field: "source.country".to_string(),
            value: FilterValue::Terms(vec![json!("United States"), json!("Australia")]),
        },
        SearchFilter {
            field: "is_open_access".to_string(),
            value: FilterValue::Match(json!(true)),
        },
        SearchFilter {
            field: "has_abstract".to_string(),
            value: FilterValue::Match(json!(true)),
        },
    ]
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("api_auth.json")
}

fn default_credentials_key() -> String {
    "lens".to_string()
}

fn default_pages_dir() -> PathBuf {
    PathBuf::from("data/raw/journals")
}

fn default_file_prefix() -> String {
    "journals".to_string()
}
