// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sequential execution of a [`WorkSet`].
//!
//! Devices and firmware are processed one at a time in plan order. In
//! download mode each missing file is fetched through the
//! [`DownloadManager`]; in check mode each existing file is re-hashed and,
//! when redownload is enabled, replaced if it fails verification.
//!
//! The process-wide Ctrl+C handler also lives here. It reports how much was
//! downloaded and exits immediately, leaving any partial file on disk.

use indicatif::HumanBytes;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::download::{verify, DownloadManager, DownloadOutcome, RetryPolicy, RunCounters, Transport};
use crate::plan::{SyncMode, WorkItem, WorkSet};

/// Tally of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Downloads that ended with a matching digest.
    pub downloaded: usize,
    /// Downloads that gave up without a matching digest.
    pub failed: usize,
    /// Existing files whose digest matched.
    pub verified: usize,
    /// Existing files that could not be verified.
    pub corrupt: usize,
    /// Items not attempted (directory creation failed, file appeared meanwhile).
    pub skipped: usize,
}

impl SyncReport {
    /// Whether anything ended in a state that needs attention.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.corrupt > self.downloaded
    }

    fn record(&mut self, outcome: &DownloadOutcome) {
        if outcome.verified {
            self.downloaded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Runs a work set against the filesystem.
pub struct Syncer<T> {
    manager: DownloadManager<T>,
    mode: SyncMode,
    redownload: bool,
}

impl<T: Transport> Syncer<T> {
    pub fn new(manager: DownloadManager<T>, mode: SyncMode) -> Self {
        Self {
            manager,
            mode,
            redownload: false,
        }
    }

    /// In check mode, download again any file that fails verification.
    pub fn with_redownload(mut self, redownload: bool) -> Self {
        self.redownload = redownload;
        self
    }

    pub fn manager(&self) -> &DownloadManager<T> {
        &self.manager
    }

    pub fn run(&self, work: &WorkSet) -> SyncReport {
        let mut report = SyncReport::default();

        for plan in work.devices.values() {
            match self.mode {
                SyncMode::Download => {
                    tracing::info!("Downloading {} firmwares for {}", plan.items.len(), plan.device.name);
                    self.download_device(&plan.items, &mut report);
                }
                SyncMode::Check => {
                    for item in &plan.items {
                        self.check_item(item, &mut report);
                    }
                }
            }
        }

        report
    }

    fn download_device(&self, items: &[WorkItem], report: &mut SyncReport) {
        for (index, item) in items.iter().enumerate() {
            if let Err(e) = create_directory(&item.directory) {
                tracing::error!(
                    "Unable to create download directory: {}, err: {}",
                    item.directory.display(),
                    e
                );
                report.skipped += items.len() - index;
                return;
            }

            // Devices sharing a template directory can point at the same image.
            match fs::metadata(&item.destination) {
                Ok(_) => {
                    tracing::debug!("{} already present, skipping", item.destination.display());
                    report.skipped += 1;
                    continue;
                }
                Err(e) if e.kind() != io::ErrorKind::NotFound => {
                    tracing::warn!("Error reading download path: {}, err: {}", item.destination.display(), e);
                    report.skipped += 1;
                    continue;
                }
                Err(_) => {}
            }

            let outcome = self.manager.download(
                &item.firmware.url,
                &item.destination,
                &item.expected,
                item.firmware.file_size,
            );
            report.record(&outcome);
        }
    }

    fn check_item(&self, item: &WorkItem, report: &mut SyncReport) {
        let name = item.file_name();
        let algorithm = self.manager.fetcher().algorithm();

        match verify(&item.destination, &item.expected, algorithm) {
            Ok(true) => {
                tracing::info!("{} verified successfully", name);
                report.verified += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Error verifying: {}, err: {}", name, e),
        }

        tracing::warn!("{} did not verify successfully", name);
        report.corrupt += 1;

        if !self.redownload {
            return;
        }

        // Redownloading a corrupt file always retries; the attempt cap still applies.
        let policy = RetryPolicy {
            enabled: true,
            ..self.manager.policy()
        };
        let outcome = self.manager.download_with_policy(
            &item.firmware.url,
            &item.destination,
            &item.expected,
            item.firmware.file_size,
            policy,
        );
        report.record(&outcome);
    }
}

/// `mkdir -p` with owner-only permissions on Unix.
fn create_directory(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)
}

/// Install the Ctrl+C handler: print the downloaded byte count and exit 0.
///
/// No cleanup runs. A partially written file stays where it is and is
/// replaced from byte zero on the next run.
pub fn install_interrupt_handler(counters: Arc<RunCounters>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", interrupt_message(&counters));
        std::process::exit(0);
    })
}

/// Line printed on Ctrl+C, straight to stderr; `--quiet` and `RUST_LOG` do
/// not apply to it.
pub fn interrupt_message(counters: &RunCounters) -> String {
    format!("Downloaded {}", HumanBytes(counters.downloaded_bytes()))
}
