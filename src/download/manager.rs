// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download-verify-retry loop around the [`Fetcher`].

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

use super::engine::{Fetcher, Transport};
use super::state::RunCounters;
use super::types::{AttemptError, DownloadOutcome, RetryPolicy};
use crate::types::HexDigest;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Runs managed downloads: fetch, compare, retry.
pub struct DownloadManager<T> {
    fetcher: Fetcher<T>,
    policy: RetryPolicy,
    counters: Arc<RunCounters>,
    show_progress: bool,
}

impl<T: Transport> DownloadManager<T> {
    pub fn new(fetcher: Fetcher<T>, policy: RetryPolicy, counters: Arc<RunCounters>) -> Self {
        Self {
            fetcher,
            policy,
            counters,
            show_progress: true,
        }
    }

    /// Disable progress bars (quiet mode, tests).
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    /// Download `url` to `destination` until its digest equals `expected` or
    /// the policy gives up. Every attempt restarts from byte zero on the same
    /// path.
    pub fn download(&self, url: &str, destination: &Path, expected: &HexDigest, size: u64) -> DownloadOutcome {
        self.download_with_policy(url, destination, expected, size, self.policy)
    }

    pub fn download_with_policy(
        &self,
        url: &str,
        destination: &Path,
        expected: &HexDigest,
        size: u64,
        policy: RetryPolicy,
    ) -> DownloadOutcome {
        let mut attempts = 0u32;
        let mut last_error = None;

        while policy.allows_another(attempts) {
            attempts += 1;
            match self.attempt(url, destination, expected, size) {
                Ok(()) => {
                    return DownloadOutcome {
                        verified: true,
                        attempts,
                        last_error: None,
                    };
                }
                Err(e) => {
                    if policy.allows_another(attempts) {
                        tracing::info!("Retrying {} (attempt {})", display_name(destination), attempts + 1);
                    }
                    last_error = Some(e);
                }
            }
        }

        DownloadOutcome {
            verified: false,
            attempts,
            last_error,
        }
    }

    fn attempt(&self, url: &str, destination: &Path, expected: &HexDigest, size: u64) -> Result<(), AttemptError> {
        let name = display_name(destination);
        tracing::info!("Downloading {} ({})", name, HumanBytes(size));

        let bar = self.progress_bar(size);
        let result = self.fetcher.fetch(url, destination, |n| {
            self.counters.add_downloaded(n);
            bar.inc(n);
        });
        bar.finish_and_clear();

        let actual = match result {
            Ok(digest) => digest,
            Err(e) => {
                tracing::error!("Error while downloading {}, err: {}", name, e);
                return Err(e.into());
            }
        };

        if actual != *expected {
            tracing::warn!("File: {} failed checksum (wanted: {}, got: {})", name, expected, actual);
            return Err(AttemptError::Mismatch {
                expected: expected.clone(),
                actual,
            });
        }

        Ok(())
    }

    fn progress_bar(&self, size: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(size);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::hasher::ContentHasher;
    use crate::download::types::FetchError;
    use crate::types::ChecksumAlgorithm;
    use std::cell::Cell;
    use std::fs;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    /// Serves `bad` for the first `bad_attempts` opens, `good` afterwards.
    struct FlakyTransport {
        good: Vec<u8>,
        bad: Vec<u8>,
        bad_attempts: u32,
        opens: Cell<u32>,
    }

    impl Transport for FlakyTransport {
        fn open(&self, _url: &str) -> Result<Box<dyn Read + Send>, FetchError> {
            let n = self.opens.get();
            self.opens.set(n + 1);
            let body = if n < self.bad_attempts { self.bad.clone() } else { self.good.clone() };
            Ok(Box::new(Cursor::new(body)))
        }
    }

    fn manager(bad_attempts: u32, policy: RetryPolicy) -> (DownloadManager<FlakyTransport>, Arc<RunCounters>) {
        let transport = FlakyTransport {
            good: b"firmware image".to_vec(),
            bad: b"corrupted".to_vec(),
            bad_attempts,
            opens: Cell::new(0),
        };
        let counters = Arc::new(RunCounters::new());
        let manager = DownloadManager::new(Fetcher::new(transport), policy, Arc::clone(&counters)).without_progress();
        (manager, counters)
    }

    fn expected() -> HexDigest {
        ContentHasher::digest(ChecksumAlgorithm::Sha1, b"firmware image")
    }

    #[test]
    fn test_first_attempt_success() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let dest = dir.path().join("fw.ipsw");
        let (manager, counters) = manager(0, RetryPolicy::once());

        let outcome = manager.download("u", &dest, &expected(), 14);

        assert!(outcome.verified);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(counters.downloaded_bytes(), 14);
        assert_eq!(fs::read(&dest).unwrap(), b"firmware image");
    }

    #[test]
    fn test_mismatch_without_retry_stops_after_one_attempt() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let dest = dir.path().join("fw.ipsw");
        let (manager, _) = manager(5, RetryPolicy::once());

        let outcome = manager.download("u", &dest, &expected(), 14);

        assert!(!outcome.verified);
        assert_eq!(outcome.attempts, 1);
        assert!(matches!(outcome.last_error, Some(AttemptError::Mismatch { .. })));
        assert_eq!(manager.fetcher().transport().opens.get(), 1);
    }

    #[test]
    fn test_retry_until_digest_matches() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let dest = dir.path().join("fw.ipsw");
        let (manager, counters) = manager(2, RetryPolicy::unbounded());

        let outcome = manager.download("u", &dest, &expected(), 14);

        assert!(outcome.verified);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(fs::read(&dest).unwrap(), b"firmware image");
        // Two corrupted bodies plus the good one.
        assert_eq!(counters.downloaded_bytes(), 9 + 9 + 14);
    }

    #[test]
    fn test_retry_cap_is_honoured() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let dest = dir.path().join("fw.ipsw");
        let (manager, _) = manager(10, RetryPolicy::bounded(4));

        let outcome = manager.download("u", &dest, &expected(), 14);

        assert!(!outcome.verified);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(manager.fetcher().transport().opens.get(), 4);
    }

    #[test]
    fn test_fetch_error_counts_as_failed_attempt() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let dest = dir.path().join("missing-dir").join("fw.ipsw");
        let (manager, _) = manager(0, RetryPolicy::bounded(2));

        let outcome = manager.download("u", &dest, &expected(), 14);

        assert!(!outcome.verified);
        assert_eq!(outcome.attempts, 2);
        assert!(matches!(outcome.last_error, Some(AttemptError::Fetch(FetchError::Create { .. }))));
    }
}
