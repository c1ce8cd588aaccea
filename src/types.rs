// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Canonical catalog types used across fwsync.
//!
//! Devices and firmwares are deserialized straight from the catalog JSON and
//! stay immutable for the rest of the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A hex-encoded content digest.
///
/// Catalog digests are normalised to lowercase on construction so that
/// comparisons against locally computed digests are exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct HexDigest(String);

impl HexDigest {
    pub fn new(hex: impl AsRef<str>) -> Self {
        Self(hex.as_ref().trim().to_ascii_lowercase())
    }

    /// Encode raw digest bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for HexDigest {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<HexDigest> for String {
    fn from(value: HexDigest) -> Self {
        value.0
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content hash algorithm shared by the catalog and the local hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// The catalog's `sha1sum` field.
    #[default]
    Sha1,
    /// The catalog's `sha256sum` field (not published for every firmware).
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!("unsupported checksum algorithm '{}' (expected sha1 or sha256)", other)),
        }
    }
}

/// A device advertised by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Stable key, e.g. `iPhone10,3`.
    pub identifier: String,
    /// Display name, e.g. `iPhone X (Global)`.
    pub name: String,
    #[serde(default, rename = "boardconfig")]
    pub board_config: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub cpid: Option<u64>,
    #[serde(default)]
    pub bdid: Option<u64>,
}

impl Device {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            board_config: None,
            platform: None,
            cpid: None,
            bdid: None,
        }
    }
}

/// A firmware image published for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firmware {
    /// Identifier of the owning device.
    pub identifier: String,
    pub version: String,
    #[serde(rename = "buildid")]
    pub build_id: String,
    #[serde(rename = "sha1sum")]
    pub sha1: HexDigest,
    #[serde(default, rename = "md5sum")]
    pub md5: Option<HexDigest>,
    #[serde(default, rename = "sha256sum")]
    pub sha256: Option<HexDigest>,
    #[serde(rename = "filesize")]
    pub file_size: u64,
    pub url: String,
    #[serde(default, rename = "releasedate")]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(rename = "uploaddate")]
    pub upload_date: DateTime<Utc>,
    pub signed: bool,
}

impl Firmware {
    /// Expected digest for the given algorithm, if the catalog publishes one.
    pub fn expected_digest(&self, algorithm: ChecksumAlgorithm) -> Option<&HexDigest> {
        let digest = match algorithm {
            ChecksumAlgorithm::Sha1 => Some(&self.sha1),
            ChecksumAlgorithm::Sha256 => self.sha256.as_ref(),
        };
        digest.filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_digest_is_lowercased() {
        let digest = HexDigest::new(" DEADBEEF ");
        assert_eq!(digest.as_str(), "deadbeef");
        assert_eq!(digest, HexDigest::from("deadbeef".to_string()));
    }

    #[test]
    fn test_checksum_algorithm_parse() {
        assert_eq!("sha1".parse::<ChecksumAlgorithm>(), Ok(ChecksumAlgorithm::Sha1));
        assert_eq!("SHA-256".parse::<ChecksumAlgorithm>(), Ok(ChecksumAlgorithm::Sha256));
        assert!("md5".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn test_firmware_from_catalog_json() {
        let json = r#"{
            "identifier": "iPhone10,3",
            "version": "16.7.2",
            "buildid": "20H115",
            "sha1sum": "ABCDEF0123",
            "md5sum": "00ff",
            "filesize": 6123456789,
            "url": "https://updates.cdn-apple.com/x/iPhone10,3_16.7.2_20H115_Restore.ipsw",
            "releasedate": null,
            "uploaddate": "2023-10-25T17:11:03Z",
            "signed": true
        }"#;

        let fw: Firmware = serde_json::from_str(json).unwrap();
        assert_eq!(fw.build_id, "20H115");
        assert_eq!(fw.sha1.as_str(), "abcdef0123");
        assert!(fw.release_date.is_none());
        assert!(fw.sha256.is_none());
        assert_eq!(fw.expected_digest(ChecksumAlgorithm::Sha1).map(|d| d.as_str()), Some("abcdef0123"));
        assert!(fw.expected_digest(ChecksumAlgorithm::Sha256).is_none());
    }

    #[test]
    fn test_device_optional_fields_default() {
        let device: Device = serde_json::from_str(r#"{"identifier":"iPad1,1","name":"iPad"}"#).unwrap();
        assert_eq!(device, Device::new("iPad1,1", "iPad"));
    }
}
