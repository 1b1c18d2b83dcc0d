//! Atomic file replacement with crash-safe guarantees.
//!
//! Write path: acquire an exclusive lock on a `.lck` sibling, write the
//! bytes to a `.tmp` sibling, verify the written file hashes back to the
//! content, rename into place, and fsync the parent directory.

use crate::error::{LockfileError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const TEMP_SUFFIX: &str = "tmp";
const LOCK_SUFFIX: &str = "lck";

/// Advisory lock acquisition timeout.
const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Atomic file writer with exclusive locking.
#[derive(Debug)]
pub struct AtomicWriter {
    target: PathBuf,
    temp_path: PathBuf,
    /// Keeps the advisory lock alive for the writer's lifetime.
    _lock_file: File,
    content: Option<Vec<u8>>,
}

impl AtomicWriter {
    /// Create a writer for `path`, acquiring the exclusive lock.
    ///
    /// # Errors
    /// Returns error if the lock cannot be acquired within the timeout.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let target = path.as_ref().to_path_buf();
        let temp_path = sibling(&target, TEMP_SUFFIX);
        let lock_path = sibling(&target, LOCK_SUFFIX);
        let lock_file = acquire_lock(&lock_path)?;
        Ok(Self {
            target,
            temp_path,
            _lock_file: lock_file,
            content: None,
        })
    }

    /// Set the bytes to write.
    pub fn content(&mut self, content: impl Into<Vec<u8>>) -> &mut Self {
        self.content = Some(content.into());
        self
    }

    /// Execute the write: temp file, verify, rename.
    ///
    /// # Errors
    /// Returns error if any stage fails; the temp file is cleaned up.
    pub fn commit(mut self) -> Result<()> {
        let content = self.content.take().ok_or(LockfileError::NoContent)?;
        let expected = blake3::hash(&content);

        if let Some(parent) = self.target.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| LockfileError::io(parent, e))?;
        }

        {
            let mut temp = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.temp_path)
                .map_err(|e| LockfileError::io(&self.temp_path, e))?;
            temp.write_all(&content)
                .map_err(|e| LockfileError::io(&self.temp_path, e))?;
            temp.sync_all()
                .map_err(|e| LockfileError::io(&self.temp_path, e))?;
        }

        // Verify what landed on disk before renaming over the target.
        let written =
            fs::read(&self.temp_path).map_err(|e| LockfileError::io(&self.temp_path, e))?;
        let actual = blake3::hash(&written);
        if expected != actual {
            let _ = fs::remove_file(&self.temp_path);
            return Err(LockfileError::Integrity {
                expected: expected.to_hex().to_string(),
                actual: actual.to_hex().to_string(),
            });
        }

        fs::rename(&self.temp_path, &self.target)
            .map_err(|e| LockfileError::io(&self.target, e))?;

        #[cfg(unix)]
        if let Some(parent) = self.target.parent()
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }

        debug!(target = %self.target.display(), bytes = content.len(), "atomic write committed");
        Ok(())
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if self.temp_path.exists() {
            warn!(temp = %self.temp_path.display(), "cleaning up orphaned temp file");
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

fn sibling(target: &Path, suffix: &str) -> PathBuf {
    target.with_extension(
        target
            .extension()
            .map(|e| format!("{}.{suffix}", e.to_string_lossy()))
            .unwrap_or_else(|| suffix.to_string()),
    )
}

/// Acquire an exclusive advisory lock with a timeout.
fn acquire_lock(path: &Path) -> Result<File> {
    use std::io::ErrorKind;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| LockfileError::io(path, e))?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| LockfileError::io(path, e))?;

    let start = std::time::Instant::now();
    loop {
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => return Ok(file),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                if start.elapsed() > LOCK_TIMEOUT {
                    return Err(LockfileError::LockTimeout {
                        path: path.to_path_buf(),
                        timeout: LOCK_TIMEOUT,
                    });
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => return Err(LockfileError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_new_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.lock.json");

        let mut writer = AtomicWriter::new(&path).unwrap();
        writer.content(b"{}\n".to_vec());
        writer.commit().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
        assert!(!sibling(&path, TEMP_SUFFIX).exists());
    }

    #[test]
    fn overwrites_atomically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.lock.json");
        fs::write(&path, "old").unwrap();

        let mut writer = AtomicWriter::new(&path).unwrap();
        writer.content(b"new".to_vec());
        writer.commit().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn commit_without_content_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.lock.json");
        let writer = AtomicWriter::new(&path).unwrap();
        assert!(matches!(writer.commit(), Err(LockfileError::NoContent)));
    }
}
