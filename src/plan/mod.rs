// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Work-set construction.
//!
//! Turns the catalog into an ordered per-device list of firmware that still
//! needs action. Gates are applied in a fixed order which is part of the
//! observable behaviour:
//!
//! 1. signed-only
//! 2. latest-only (index 0 of the upload-date-descending list)
//! 3. field filter
//! 4. directory resolution
//! 5. existence check (mode dependent)

use indexmap::IndexMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, CatalogError};
use crate::download::RunCounters;
use crate::filter::FilterSpec;
use crate::path::DirectoryTemplate;
use crate::types::{ChecksumAlgorithm, Device, Firmware, HexDigest};
use crate::utils::file_name_from_url;

/// What the run does with each work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Download firmware that is not on disk yet.
    #[default]
    Download,
    /// Re-hash firmware that is already on disk.
    Check,
}

/// Selection criteria for [`build_plan`].
#[derive(Debug)]
pub struct PlanOptions {
    /// Restrict the run to one device identifier.
    pub identifier: Option<String>,
    pub filter: FilterSpec,
    pub signed_only: bool,
    pub latest_only: bool,
    pub template: DirectoryTemplate,
    pub algorithm: ChecksumAlgorithm,
    pub mode: SyncMode,
}

/// One resolved unit of download or verification work.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub device: Device,
    pub firmware: Firmware,
    /// Directory rendered from the template.
    pub directory: PathBuf,
    /// `directory` joined with the basename of the firmware URL.
    pub destination: PathBuf,
    pub expected: HexDigest,
}

impl WorkItem {
    pub fn file_name(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct DevicePlan {
    pub device: Device,
    /// Most recently uploaded first.
    pub items: Vec<WorkItem>,
}

/// Per-device plans in catalog order.
#[derive(Debug, Clone, Default)]
pub struct WorkSet {
    pub devices: IndexMap<String, DevicePlan>,
}

impl WorkSet {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.devices.values().map(|p| p.items.len()).sum()
    }

    pub fn total_size(&self) -> u64 {
        self.devices
            .values()
            .flat_map(|p| p.items.iter())
            .map(|i| i.firmware.file_size)
            .sum()
    }

    pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
        self.devices.values().flat_map(|p| p.items.iter())
    }
}

/// Sort by upload date, newest first. Stable, so equal dates keep catalog order.
pub fn sort_by_upload_date(firmwares: &mut [Firmware]) {
    firmwares.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
}

/// Apply the sort and the signed, latest and filter gates, in that order.
pub fn select_firmwares(mut firmwares: Vec<Firmware>, options: &PlanOptions) -> Vec<Firmware> {
    sort_by_upload_date(&mut firmwares);

    firmwares
        .into_iter()
        .enumerate()
        .filter(|(_, fw)| !options.signed_only || fw.signed)
        .filter(|(index, _)| !options.latest_only || *index == 0)
        .filter(|(_, fw)| options.filter.passes(fw))
        .map(|(_, fw)| fw)
        .collect()
}

/// Presence of a destination file, keeping stat errors distinct from absence.
fn exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Resolve one selected firmware into a work item, or log why it is skipped.
fn resolve_item(device: &Device, firmware: Firmware, options: &PlanOptions) -> Option<WorkItem> {
    let directory = match options.template.render(device, &firmware) {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!("Unable to parse download directory, err: {}", e);
            return None;
        }
    };

    let Some(file_name) = file_name_from_url(&firmware.url) else {
        tracing::warn!("Firmware {} has no file name in its URL: {}", firmware.build_id, firmware.url);
        return None;
    };
    let destination = directory.join(file_name);

    let Some(expected) = firmware.expected_digest(options.algorithm).cloned() else {
        tracing::warn!(
            "Firmware {} for {} has no {} checksum, skipping",
            firmware.build_id,
            device.identifier,
            options.algorithm
        );
        return None;
    };

    let wanted = match (options.mode, exists(&destination)) {
        (SyncMode::Download, Ok(present)) => !present,
        (SyncMode::Check, Ok(present)) => present,
        (_, Err(e)) => {
            tracing::warn!("Error reading download path: {}, err: {}", destination.display(), e);
            false
        }
    };

    wanted.then(|| WorkItem {
        device: device.clone(),
        firmware,
        directory,
        destination,
        expected,
    })
}

/// Build the ordered work set.
///
/// Fails only when the device list itself cannot be fetched. Devices whose
/// firmware list cannot be fetched are logged and skipped.
pub fn build_plan(
    catalog: &dyn Catalog,
    options: &PlanOptions,
    counters: &RunCounters,
) -> Result<WorkSet, CatalogError> {
    let devices = catalog.devices()?;
    let mut work = WorkSet::default();

    for device in devices {
        if options.identifier.as_deref().is_some_and(|id| id != device.identifier) {
            continue;
        }

        let firmwares = match catalog.firmwares(&device.identifier) {
            Ok(firmwares) => firmwares,
            Err(e) => {
                tracing::warn!("Could not get firmwares for device: {}, err: {}", device.identifier, e);
                continue;
            }
        };

        counters.record_device();

        let items: Vec<WorkItem> = select_firmwares(firmwares, options)
            .into_iter()
            .filter_map(|fw| resolve_item(&device, fw, options))
            .collect();

        for item in &items {
            counters.record_firmware(item.firmware.file_size);
        }

        if items.is_empty() {
            continue;
        }

        work.devices
            .entry(device.identifier.clone())
            .or_insert_with(|| DevicePlan {
                device: device.clone(),
                items: Vec::new(),
            })
            .items
            .extend(items);
    }

    Ok(work)
}
