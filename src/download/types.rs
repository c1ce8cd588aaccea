// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download types shared by the engine, the checker and the manager.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::HexDigest;

/// Default read size for streaming a response body to disk.
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// Failure of a single fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to create {}: {source}", .path.display())]
    Create { path: PathBuf, source: io::Error },

    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed reading response body: {0}")]
    Read(#[source] io::Error),

    #[error("failed writing {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Failure of a local integrity check.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("failed to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("failed reading {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
}

/// Why one download attempt did not produce a verified file.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("checksum mismatch (wanted: {expected}, got: {actual})")]
    Mismatch { expected: HexDigest, actual: HexDigest },
}

/// Caller-level retry policy.
///
/// Retries are immediate: no backoff, no jitter. With retries enabled and no
/// attempt cap the manager keeps going until the digest matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub enabled: bool,
    /// Total attempts allowed when enabled; `None` is unbounded.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// A single attempt, whatever the outcome.
    pub fn once() -> Self {
        Self::default()
    }

    pub fn unbounded() -> Self {
        Self {
            enabled: true,
            max_attempts: None,
        }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            enabled: true,
            max_attempts: Some(max_attempts),
        }
    }

    /// Whether another attempt may start after `attempts_made` failures.
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        if attempts_made == 0 {
            return true;
        }
        self.enabled && self.max_attempts.map_or(true, |max| attempts_made < max)
    }
}

/// Result of a managed download.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub verified: bool,
    pub attempts: u32,
    pub last_error: Option<AttemptError>,
}
