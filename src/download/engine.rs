// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Streaming download with on-the-fly hashing.
//!
//! Each chunk read from the transport goes to the destination file first, then
//! to the hash accumulator, then to the progress sink. Only the file write can
//! fail, so a failed write aborts before the digest has seen the chunk and the
//! two never diverge.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use super::hasher::ContentHasher;
use super::types::{FetchError, DEFAULT_CHUNK_SIZE};
use crate::types::{ChecksumAlgorithm, HexDigest};

/// Source of response bodies.
///
/// Implementations follow redirects the way their client does by default and
/// must map non-2xx responses to [`FetchError::Status`].
pub trait Transport {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, FetchError>;
}

/// Production transport backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        let response = self.client.get(url).send().map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Box::new(response))
    }
}

/// Downloads one URL to one path and returns the content digest.
#[derive(Debug, Clone)]
pub struct Fetcher<T> {
    transport: T,
    chunk_size: usize,
    algorithm: ChecksumAlgorithm,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            chunk_size: DEFAULT_CHUNK_SIZE,
            algorithm: ChecksumAlgorithm::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Stream `url` into `destination`, truncating any existing file.
    ///
    /// `progress` is called with the size of every chunk written. On error
    /// the partially written file is left in place.
    pub fn fetch<F>(&self, url: &str, destination: &Path, mut progress: F) -> Result<HexDigest, FetchError>
    where
        F: FnMut(u64),
    {
        let mut file = File::create(destination).map_err(|source| FetchError::Create {
            path: destination.to_path_buf(),
            source,
        })?;

        let mut body = self.transport.open(url)?;
        let mut hasher = ContentHasher::new(self.algorithm);
        let mut buf = vec![0u8; self.chunk_size];
        let mut written = 0u64;

        loop {
            let n = match body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FetchError::Read(e)),
            };

            file.write_all(&buf[..n]).map_err(|source| FetchError::Write {
                path: destination.to_path_buf(),
                source,
            })?;
            hasher.update(&buf[..n]);
            written += n as u64;
            progress(n as u64);
        }

        file.flush().map_err(|source| FetchError::Write {
            path: destination.to_path_buf(),
            source,
        })?;

        tracing::debug!("Fetched {} bytes from {} into {}", written, url, destination.display());
        Ok(hasher.finalize())
    }
}
