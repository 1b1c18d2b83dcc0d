//! Streaming sha512 hashing for package archives.
//!
//! The lock file records the base64 of sha512 over the full archive byte
//! sequence, never over the extracted contents.

use crate::error::{Result, StoreError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Incremental sha512 hasher fed while an archive streams in.
#[derive(Debug, Default)]
pub struct Sha512Hasher {
    inner: Sha512,
}

impl Sha512Hasher {
    /// Create a fresh hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finish and return the base64 digest.
    #[must_use]
    pub fn finalize_base64(self) -> String {
        BASE64.encode(self.inner.finalize())
    }
}

/// Hash a complete in-memory byte sequence.
#[must_use]
pub fn sha512_base64(bytes: &[u8]) -> String {
    let mut hasher = Sha512Hasher::new();
    hasher.update(bytes);
    hasher.finalize_base64()
}

/// Hash a file on disk by streaming it through the hasher.
///
/// # Errors
/// Returns error if the file cannot be read.
pub fn sha512_base64_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut hasher = Sha512Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| StoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_base64())
}
