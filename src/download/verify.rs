// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Integrity checks for files already on disk.

use std::fs::File;
use std::io;
use std::path::Path;

use super::hasher::ContentHasher;
use super::types::VerifyError;
use crate::types::{ChecksumAlgorithm, HexDigest};

/// Hash the full contents of `path`.
pub fn digest_file(path: &Path, algorithm: ChecksumAlgorithm) -> Result<HexDigest, VerifyError> {
    let mut file = File::open(path).map_err(|source| VerifyError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = ContentHasher::new(algorithm);
    // The hasher never fails a write, so any copy error came from the file.
    io::copy(&mut file, &mut hasher).map_err(|source| VerifyError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(hasher.finalize())
}

/// Re-hash `path` and compare against `expected`.
///
/// `Ok(false)` means the digest was computed and differs; an error means no
/// digest could be computed. The file is never modified.
pub fn verify(path: &Path, expected: &HexDigest, algorithm: ChecksumAlgorithm) -> Result<bool, VerifyError> {
    let actual = digest_file(path, algorithm)?;
    if actual != *expected {
        tracing::debug!("{} hashed to {} (expected {})", path.display(), actual, expected);
    }
    Ok(actual == *expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_matching_file_verifies() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("fw.ipsw");
        fs::write(&path, b"hello world").unwrap();

        let expected = HexDigest::new("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert!(verify(&path, &expected, ChecksumAlgorithm::Sha1).unwrap());
    }

    #[test]
    fn test_uppercase_catalog_digest_still_verifies() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("fw.ipsw");
        fs::write(&path, b"hello world").unwrap();

        let expected = HexDigest::new("2AAE6C35C94FCFB415DBE95F408B9CE91EE846ED");
        assert!(verify(&path, &expected, ChecksumAlgorithm::Sha1).unwrap());
    }

    #[test]
    fn test_mismatching_file_is_not_ok() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("fw.ipsw");
        fs::write(&path, b"hello world!").unwrap();

        let expected = HexDigest::new("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert!(!verify(&path, &expected, ChecksumAlgorithm::Sha1).unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"hello world!");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("absent.ipsw");

        let err = verify(&path, &HexDigest::new("00"), ChecksumAlgorithm::Sha1).unwrap_err();
        assert!(matches!(err, VerifyError::Open { .. }));
    }

    #[test]
    fn test_directory_is_a_read_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");

        // Opening a directory succeeds on Unix; reading it does not.
        let result = verify(dir.path(), &HexDigest::new("00"), ChecksumAlgorithm::Sha1);
        assert!(result.is_err());
    }
}
