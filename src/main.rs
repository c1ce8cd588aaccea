// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::HumanBytes;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use fwsync::catalog::IpswClient;
use fwsync::config::Config;
use fwsync::download::{DownloadManager, Fetcher, HttpTransport, RunCounters};
use fwsync::error::{catalog_unavailable, format_error};
use fwsync::filter::{is_known_field, FilterSpec};
use fwsync::path::DirectoryTemplate;
use fwsync::plan::{build_plan, PlanOptions, SyncMode};
use fwsync::sync::{install_interrupt_handler, SyncReport, Syncer};
use fwsync::types::{ChecksumAlgorithm, Firmware};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// Service unavailable - firmware catalog could not be read
    pub const SERVICE_UNAVAILABLE: i32 = 69;
    /// Configuration error - invalid config or directory template
    pub const CONFIG: i32 = 78;
}

use exit_codes::*;

/// fwsync - Mirror a firmware catalog to disk, verifying every file.
#[derive(Parser)]
#[command(name = "fwsync")]
#[command(version = VERSION)]
#[command(about = "Mirror a firmware catalog to disk, verifying every file.")]
#[command(long_about = "fwsync - Firmware catalog mirror\n\n\
    Everything, into ./:          fwsync\n\
    Latest signed per device:    fwsync -l -s\n\
    One device, sorted:          fwsync -i iPhone10,3 -d \"{{.Identifier}}/{{.Version}}\"\n\
    Check what is on disk:       fwsync -c\n\
    Check and repair:            fwsync -c -r\n\n\
    Directory templates accept any device or firmware field, e.g.\n\
    {{.Name}}, {{.Identifier}}, {{.BuildID}}, {{.Version}}.")]
struct Cli {
    /// Only the most recently uploaded firmware of each device
    #[arg(short = 'l', long)]
    latest: bool,

    /// Check the integrity of already downloaded files instead of downloading
    #[arg(short = 'c', long)]
    check: bool,

    /// Retry failed downloads, and redownload files that fail verification (with -c)
    #[arg(short = 'r', long)]
    retry: bool,

    /// Only firmware that is currently signed
    #[arg(short = 's', long)]
    signed: bool,

    /// Only this device identifier (e.g. iPhone10,3)
    #[arg(short = 'i', long, value_name = "ID")]
    identifier: Option<String>,

    /// Firmware field to filter on (e.g. BuildID, Version)
    #[arg(long, value_name = "FIELD", requires = "filter_value")]
    filter: Option<String>,

    /// Value the filter field must equal
    #[arg(long, value_name = "VALUE", requires = "filter")]
    filter_value: Option<String>,

    /// Where to save or check files; may contain templates like {{.Identifier}}
    #[arg(short = 'd', long, value_name = "TEMPLATE")]
    directory: Option<String>,

    /// Give up after this many attempts per file when retrying
    #[arg(long, value_name = "N")]
    max_attempts: Option<u32>,

    /// Read buffer size for downloads
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Whole-request timeout; unset means wait forever
    #[arg(long, value_name = "SECS")]
    read_timeout: Option<u64>,

    /// Checksum to verify against: sha1 or sha256
    #[arg(long, value_name = "ALGORITHM")]
    algorithm: Option<ChecksumAlgorithm>,

    /// Catalog API base URL
    #[arg(long, value_name = "URL")]
    catalog_url: Option<String>,

    /// Config file (default: ~/.fwsync/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose mode: debug logging
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet mode: warnings and errors only, no progress bars
    #[arg(short = 'q', long)]
    quiet: bool,
}

impl Cli {
    fn mode(&self) -> SyncMode {
        if self.check {
            SyncMode::Check
        } else {
            SyncMode::Download
        }
    }

    fn filter(&self) -> FilterSpec {
        FilterSpec::new(
            self.filter.clone().unwrap_or_default(),
            self.filter_value.clone().unwrap_or_default(),
        )
    }

    /// Command-line flags win over the config file.
    fn apply_to(&self, config: &mut Config) {
        if let Some(directory) = &self.directory {
            config.directory_template = directory.clone();
        }
        if let Some(url) = &self.catalog_url {
            config.catalog_url = url.clone();
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(secs) = self.read_timeout {
            config.read_timeout_secs = Some(secs);
        }
        if let Some(max) = self.max_attempts {
            config.max_attempts = Some(max);
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("warn,fwsync={}", level))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_to(&mut config);

    if let Err(e) = config.validate() {
        eprint!(
            "{}",
            format_error(
                &e.to_string(),
                &["A zero value in the config file or on the command line"],
                &["Check ~/.fwsync/config.json", "Run: fwsync --help"],
            )
        );
        std::process::exit(CONFIG);
    }

    let template = match DirectoryTemplate::parse(&config.directory_template) {
        Ok(template) => template,
        Err(e) => {
            eprint!(
                "{}",
                format_error(
                    &e.to_string(),
                    &["Unbalanced {{ }} in the directory template"],
                    &["Quote the template: -d \"{{.Identifier}}/{{.Version}}\""],
                )
            );
            std::process::exit(CONFIG);
        }
    };

    let filter = cli.filter();
    if filter.is_enabled() && !is_known_field::<Firmware>(&filter.field) {
        tracing::warn!("Unknown firmware field {:?}; no firmware will match the filter", filter.field);
    }

    let client = config.http_client().context("Failed to build HTTP client")?;
    let catalog = IpswClient::with_url(client.clone(), config.catalog_url.as_str());

    let counters = Arc::new(RunCounters::new());
    install_interrupt_handler(Arc::clone(&counters)).context("Failed to install Ctrl+C handler")?;

    let mode = cli.mode();
    let options = PlanOptions {
        identifier: cli.identifier.clone(),
        filter,
        signed_only: cli.signed,
        latest_only: cli.latest,
        template,
        algorithm: config.algorithm,
        mode,
    };

    let work = match build_plan(&catalog, &options, &counters) {
        Ok(work) => work,
        Err(e) => {
            eprint!("{}", catalog_unavailable(catalog.base_url(), &e));
            std::process::exit(SERVICE_UNAVAILABLE);
        }
    };

    let planned = counters.snapshot();
    match mode {
        SyncMode::Download => tracing::info!(
            "Downloading: {} IPSW files for {} device(s) ({})",
            planned.firmware_count,
            planned.device_count,
            HumanBytes(planned.total_size)
        ),
        SyncMode::Check => tracing::info!(
            "Checking: {} IPSW files for {} device(s)",
            planned.firmware_count,
            planned.device_count
        ),
    }

    let fetcher = Fetcher::new(HttpTransport::new(client))
        .with_chunk_size(config.chunk_size)
        .with_algorithm(config.algorithm);
    let mut manager = DownloadManager::new(fetcher, config.retry_policy(cli.retry), Arc::clone(&counters));
    if cli.quiet {
        manager = manager.without_progress();
    }

    let report = Syncer::new(manager, mode).with_redownload(cli.retry).run(&work);

    if !cli.quiet {
        print_summary(&report, mode, counters.downloaded_bytes());
    }
    if report.has_failures() {
        tracing::warn!("Some files are still missing or corrupt; rerun to pick them up");
    }

    Ok(())
}

fn print_summary(report: &SyncReport, mode: SyncMode, downloaded_bytes: u64) {
    println!();
    match mode {
        SyncMode::Download => {
            println!(
                "{} Downloaded {} file(s) ({})",
                "[OK]".green(),
                report.downloaded,
                HumanBytes(downloaded_bytes)
            );
        }
        SyncMode::Check => {
            println!("{} {} file(s) verified", "[OK]".green(), report.verified);
            if report.corrupt > 0 {
                println!("{} {} file(s) did not verify", "[!]".yellow(), report.corrupt);
            }
            if report.downloaded > 0 {
                println!(
                    "{} Redownloaded {} file(s) ({})",
                    "[OK]".green(),
                    report.downloaded,
                    HumanBytes(downloaded_bytes)
                );
            }
        }
    }

    if report.failed > 0 {
        println!("{} {} download(s) failed", "[✗]".red(), report.failed);
    }
    if report.skipped > 0 {
        println!("{} {} file(s) skipped", "[!]".yellow(), report.skipped);
    }
    if mode == SyncMode::Check && report.corrupt > 0 && report.downloaded + report.failed == 0 {
        println!("Run with -c -r to redownload them.");
    }
}
