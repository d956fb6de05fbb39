//! Configuration management for windowfetch
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use windowfetch::config::Config;
//!
//! let config = Config::load_with(None).expect("Failed to load configuration");
//! println!("Manifest cache: {}", config.manifest.cache_path.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `WINDOWFETCH__<section>__<key>`
//!
//! Examples:
//! - `WINDOWFETCH__SEARCH__MAX_RESULTS=1000`
//! - `WINDOWFETCH__RETRY__MAX_ATTEMPTS=3`
//! - `WINDOWFETCH__STORAGE__PROVIDER=s3`
//!
//! Secrets are read from the environment only: `WINDOWFETCH_SEARCH_TOKEN`,
//! `S3_ACCESS_KEY`/`S3_SECRET_KEY` (or the AWS-style names).
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/windowfetch.toml`.
//! This can be overridden using the `WINDOWFETCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    Config, FilterValue, HttpConfig, ManifestConfig, OutputConfig, RetryConfig, SchemaConfig,
    SearchConfig, SearchFilter, StorageConfig, StorageProvider,
};
pub use validation::ValidationError;

use crate::schema::{Schema, SchemaError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`WINDOWFETCH__*`)
    /// 2. TOML file (`path`, else `$WINDOWFETCH_CONFIG`, else `config/windowfetch.toml`)
    /// 3. Default values
    pub fn load_with(path: Option<std::path::PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Column layout for shard payloads
    pub fn shard_schema(&self) -> Result<Schema, SchemaError> {
        Schema::new(self.schema.columns.clone(), self.schema.usecols.clone())
    }
}
