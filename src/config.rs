// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistent settings.
//!
//! Read from `--config <path>` or `~/.fwsync/config.json` when present.
//! Command-line flags override whatever the file says.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::download::{RetryPolicy, DEFAULT_CHUNK_SIZE};
use crate::types::ChecksumAlgorithm;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,
    /// Destination directory template.
    #[serde(default = "default_directory_template")]
    pub directory_template: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for catalog and firmware requests. `None` never
    /// times out, which large images need on slow links.
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
    /// Cap on download attempts when retrying; `None` retries until success.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub algorithm: ChecksumAlgorithm,
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_directory_template() -> String {
    "./".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            directory_template: default_directory_template(),
            chunk_size: default_chunk_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: None,
            max_attempts: None,
            algorithm: ChecksumAlgorithm::default(),
        }
    }
}

impl Config {
    /// `~/.fwsync/config.json`, if a home directory can be found.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".fwsync").join(CONFIG_FILE))
    }

    /// Load from an explicit path. The file must exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path`, or from the default location when it exists, or fall
    /// back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be greater than zero".to_string()));
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".to_string()));
        }
        if self.catalog_url.trim().is_empty() {
            return Err(ConfigError::Invalid("catalog_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Retry policy for the given `--retry` flag.
    pub fn retry_policy(&self, retry: bool) -> RetryPolicy {
        RetryPolicy {
            enabled: retry,
            max_attempts: self.max_attempts,
        }
    }

    /// Blocking HTTP client shared by the catalog and the downloader.
    pub fn http_client(&self) -> Result<reqwest::blocking::Client, ConfigError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(self.read_timeout_secs.map(Duration::from_secs))
            .build()?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.catalog_url, "https://api.ipsw.me/v4");
        assert_eq!(config.directory_template, "./");
        assert_eq!(config.chunk_size, 128 * 1024);
        assert_eq!(config.read_timeout_secs, None);
        assert_eq!(config.max_attempts, None);
        assert_eq!(config.algorithm, ChecksumAlgorithm::Sha1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"max_attempts": 5, "algorithm": "sha256"}"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_attempts, Some(5));
        assert_eq!(config.algorithm, ChecksumAlgorithm::Sha256);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let err = Config::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = Config {
            chunk_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_attempts: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = Config {
            max_attempts: Some(3),
            ..Config::default()
        };
        assert_eq!(config.retry_policy(true), RetryPolicy::bounded(3));
        assert!(!config.retry_policy(false).enabled);
    }
}
