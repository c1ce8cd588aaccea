// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download and verification engine for fwsync
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │ DownloadManager │────▶│ Fetcher         │──▶ file + hasher + progress
//! │ (retry policy)  │     │ (Transport)     │
//! └────────┬────────┘     └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ RunCounters     │     │ verify()        │──▶ re-hash local file
//! │ (atomics)       │     │ (check mode)    │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use fwsync::download::{DownloadManager, Fetcher, HttpTransport, RetryPolicy, RunCounters};
//! use fwsync::types::HexDigest;
//!
//! let transport = HttpTransport::new(reqwest::blocking::Client::new());
//! let counters = Arc::new(RunCounters::new());
//! let manager = DownloadManager::new(Fetcher::new(transport), RetryPolicy::unbounded(), counters);
//!
//! let outcome = manager.download(
//!     "https://example.com/fw.ipsw",
//!     Path::new("fw.ipsw"),
//!     &HexDigest::new("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"),
//!     11,
//! );
//! println!("verified: {}", outcome.verified);
//! ```

pub mod engine;
pub mod hasher;
pub mod manager;
pub mod state;
pub mod types;
pub mod verify;

pub use engine::{Fetcher, HttpTransport, Transport};
pub use hasher::ContentHasher;
pub use manager::DownloadManager;
pub use state::{CounterSnapshot, RunCounters};
pub use types::{AttemptError, DownloadOutcome, FetchError, RetryPolicy, VerifyError, DEFAULT_CHUNK_SIZE};
pub use verify::{digest_file, verify};
