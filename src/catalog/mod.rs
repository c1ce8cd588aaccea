// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Firmware catalog access.
//!
//! The catalog is read once per run: the device list, then one detail request
//! per device for its firmware list. Nothing is cached between runs.
//!
//! # Example
//!
//! ```no_run
//! use fwsync::catalog::{Catalog, IpswClient};
//!
//! let client = IpswClient::new(reqwest::blocking::Client::new());
//! for device in client.devices()? {
//!     println!("{} ({})", device.name, device.identifier);
//! }
//! # Ok::<(), fwsync::catalog::CatalogError>(())
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{Device, Firmware};

/// Default catalog endpoint.
pub const DEFAULT_CATALOG_URL: &str = "https://api.ipsw.me/v4";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot reach catalog at {url}: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("catalog returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("invalid catalog response from {url}: {source}")]
    Decode { url: String, source: reqwest::Error },
}

/// Source of device and firmware metadata.
pub trait Catalog {
    fn devices(&self) -> Result<Vec<Device>, CatalogError>;

    /// Firmware list for one device, in catalog order.
    fn firmwares(&self, identifier: &str) -> Result<Vec<Firmware>, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct DeviceInformation {
    #[serde(default)]
    firmwares: Vec<Firmware>,
}

/// Client for the ipsw.me v4 API.
#[derive(Debug, Clone)]
pub struct IpswClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl IpswClient {
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self::with_url(client, DEFAULT_CATALOG_URL)
    }

    pub fn with_url(client: reqwest::blocking::Client, url: impl Into<String>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, CatalogError> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().map_err(|source| CatalogError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response.json().map_err(|source| CatalogError::Decode { url, source })
    }
}

impl Catalog for IpswClient {
    fn devices(&self) -> Result<Vec<Device>, CatalogError> {
        self.get_json(format!("{}/devices", self.base_url))
    }

    fn firmwares(&self, identifier: &str) -> Result<Vec<Firmware>, CatalogError> {
        let info: DeviceInformation = self.get_json(format!("{}/device/{}?type=ipsw", self.base_url, identifier))?;
        Ok(info.firmwares)
    }
}
