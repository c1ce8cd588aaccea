// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Process-lifetime counters.
//!
//! Updated by the sequential work loop and read concurrently by the Ctrl+C
//! handler, so every counter is an atomic.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct RunCounters {
    downloaded_bytes: AtomicU64,
    firmware_count: AtomicUsize,
    device_count: AtomicUsize,
    total_size: AtomicU64,
}

/// A point-in-time copy of [`RunCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub downloaded_bytes: u64,
    pub firmware_count: usize,
    pub device_count: usize,
    pub total_size: u64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_downloaded(&self, bytes: u64) {
        self.downloaded_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_device(&self) {
        self.device_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one firmware to process and its expected size.
    pub fn record_firmware(&self, size: u64) {
        self.firmware_count.fetch_add(1, Ordering::Relaxed);
        self.total_size.fetch_add(size, Ordering::Relaxed);
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            downloaded_bytes: self.downloaded_bytes.load(Ordering::Relaxed),
            firmware_count: self.firmware_count.load(Ordering::Relaxed),
            device_count: self.device_count.load(Ordering::Relaxed),
            total_size: self.total_size.load(Ordering::Relaxed),
        }
    }
}
