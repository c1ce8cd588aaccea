// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! fwsync - Firmware catalog mirror library
//!
//! Every byte hashed as it lands, every file checked against the catalog.
//!
//! fwsync reads a firmware catalog (ipsw.me by default), selects firmware by
//! device, signing status, recency or any catalog field, and mirrors it into a
//! templated directory tree:
//!
//! **Catalog** -> **Plan** -> **Download + verify** -> **Retry**
//!
//! # Core Modules
//!
//! - [`catalog`] - Device and firmware metadata source
//! - [`filter`] - Generic field-by-name record filter
//! - [`path`] - Destination directory templates
//! - [`plan`] - Work-set construction and selection gates
//! - [`download`] - Streaming download, hashing, verification and retry
//! - [`sync`] - Sequential runner and interrupt handling
//! - [`config`] - Persistent settings
//! - [`error`] - Consistent error formatting utilities

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod filter;
pub mod path;
pub mod plan;
pub mod sync;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{ChecksumAlgorithm, Device, Firmware, HexDigest};

pub use catalog::{Catalog, CatalogError, IpswClient, DEFAULT_CATALOG_URL};
pub use config::{Config, ConfigError};
pub use filter::{is_known_field, matches, FieldValue, FilterSpec, Record};
pub use path::{resolve, DirectoryTemplate, ResolveError};
pub use plan::{build_plan, select_firmwares, PlanOptions, SyncMode, WorkItem, WorkSet};
pub use sync::{install_interrupt_handler, SyncReport, Syncer};

// Re-export download types
pub use download::{
    verify, DownloadManager, DownloadOutcome, FetchError, Fetcher, HttpTransport, RetryPolicy, RunCounters,
    Transport, VerifyError,
};

// Re-export error utilities
pub use error::format_error;
