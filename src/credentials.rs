//! Search API credentials
//!
//! The token comes from `WINDOWFETCH_SEARCH_TOKEN` when set (already folded into
//! [`SearchConfig::token`] by the config loader), otherwise from a JSON file
//! mapping service names to tokens, e.g. `{"lens": "..."}`.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::SearchConfig;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Cannot read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credentials file {path} is not a JSON object of strings: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Credentials file {path} has no '{key}' entry")]
    MissingKey { path: PathBuf, key: String },

    #[error("Search token is empty")]
    Empty,
}

/// Bearer of the search API token, sent verbatim in the `Authorization` header
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("token", &"<redacted>").finish()
    }
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn from_file(path: &Path, key: &str) -> Result<Self, CredentialError> {
        let text = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut tokens: HashMap<String, String> =
            serde_json::from_str(&text).map_err(|source| CredentialError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let token = tokens
            .remove(key)
            .ok_or_else(|| CredentialError::MissingKey {
                path: path.to_path_buf(),
                key: key.to_string(),
            })?;
        Self::checked(token)
    }

    /// Environment token first, then the credentials file
    pub fn resolve(config: &SearchConfig) -> Result<Self, CredentialError> {
        match &config.token {
            Some(token) => Self::checked(token.clone()),
            None => Self::from_file(&config.credentials_path, &config.credentials_key),
        }
    }

    pub fn header(&self) -> (String, String) {
        ("Authorization".to_string(), self.token.clone())
    }

    fn checked(token: String) -> Result<Self, CredentialError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::Empty);
        }
        Ok(Self::new(token))
    }
}
