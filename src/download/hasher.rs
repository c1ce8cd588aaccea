// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Incremental content hashing.

use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::io;

use crate::types::{ChecksumAlgorithm, HexDigest};

/// Running digest for one of the supported algorithms.
///
/// Implements [`io::Write`] so it can sit behind `io::copy`; writes never fail.
#[derive(Clone)]
pub enum ContentHasher {
    Sha1(Sha1),
    Sha256(Sha256),
}

impl ContentHasher {
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            ChecksumAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> HexDigest {
        match self {
            Self::Sha1(h) => HexDigest::from_bytes(&h.finalize()),
            Self::Sha256(h) => HexDigest::from_bytes(&h.finalize()),
        }
    }

    /// One-shot digest of an in-memory buffer.
    pub fn digest(algorithm: ChecksumAlgorithm, data: &[u8]) -> HexDigest {
        let mut hasher = Self::new(algorithm);
        hasher.update(data);
        hasher.finalize()
    }
}

impl io::Write for ContentHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
