//! Atomic package installation.
//!
//! The install pipeline: archive bytes arrive in memory, sha512 is computed
//! over the full sequence, the archive is written into
//! `<store>/<name>/<version>.tmp-<pid>/`, extracted there, and the temp
//! directory is renamed to the final location. Concurrent installs of the
//! same identity coordinate by first-writer-wins; losers observe the
//! completed directory and skip. A process-local lock per identity prevents
//! intra-process duplicate work.

use crate::archive::extract_zip;
use crate::checksum::{sha512_base64, sha512_base64_file};
use crate::error::{Result, StoreError};
use crate::layout::PackageStore;
use caravel_core::Library;
use dashmap::DashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of an install request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The package was written by this call.
    Installed {
        /// Base64 sha512 of the archive bytes.
        sha: String,
    },
    /// The package was already present (or another writer won the race).
    AlreadyInstalled {
        /// Base64 sha512 recomputed from the stored archive.
        sha: String,
    },
}

impl InstallOutcome {
    /// The archive sha regardless of who wrote it.
    #[must_use]
    pub fn sha(&self) -> &str {
        match self {
            Self::Installed { sha } | Self::AlreadyInstalled { sha } => sha,
        }
    }

    /// Whether this call performed the write.
    #[must_use]
    pub const fn freshly_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// Removes an abandoned temp directory on every exit path.
struct TempDirGuard(Option<PathBuf>);

impl TempDirGuard {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take()
            && path.exists()
        {
            warn!(path = %path.display(), "cleaning up abandoned install directory");
            let _ = fs::remove_dir_all(&path);
        }
    }
}

/// Installs packages into a [`PackageStore`].
#[derive(Debug)]
pub struct PackageInstaller {
    store: PackageStore,
    /// Process-local per-identity locks.
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl PackageInstaller {
    /// Create an installer over `store`.
    #[must_use]
    pub fn new(store: PackageStore) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &PackageStore {
        &self.store
    }

    /// Install `library` from in-memory archive bytes.
    ///
    /// When `expected_sha` is given (lock-file replay), both fresh bytes and
    /// an already-installed archive are verified against it.
    ///
    /// # Errors
    /// Returns [`StoreError::ShaMismatch`] on hash disagreement and IO or
    /// archive errors from the pipeline.
    pub async fn install(
        &self,
        library: &Library,
        bytes: Vec<u8>,
        expected_sha: Option<&str>,
    ) -> Result<InstallOutcome> {
        let key = library.key();
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if self.store.is_installed(&library.name, &library.version) {
            return self.verify_existing(library, expected_sha);
        }

        let sha = sha512_base64(&bytes);
        if let Some(expected) = expected_sha
            && expected != sha
        {
            return Err(StoreError::ShaMismatch {
                library: key,
                expected: expected.to_string(),
                actual: sha,
            });
        }

        let name_dir = self.store.root().join(&library.name);
        fs::create_dir_all(&name_dir).map_err(|e| StoreError::io(&name_dir, e))?;

        let tmp_dir = name_dir.join(format!(
            "{}.tmp-{}",
            library.version,
            std::process::id()
        ));
        let mut guard = TempDirGuard(Some(tmp_dir.clone()));
        fs::create_dir_all(&tmp_dir).map_err(|e| StoreError::io(&tmp_dir, e))?;

        let archive_path = tmp_dir.join(PackageStore::archive_name(&library.name, &library.version));
        fs::write(&archive_path, &bytes).map_err(|e| StoreError::io(&archive_path, e))?;

        let extract_from = archive_path.clone();
        let extract_to = tmp_dir.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_zip(&extract_from, &extract_to))
            .await
            .map_err(|e| StoreError::Archive(format!("extraction task failed: {e}")))??;

        let final_dir = self.store.package_dir(&library.name, &library.version);
        match fs::rename(&tmp_dir, &final_dir) {
            Ok(()) => {
                guard.disarm();
                info!(library = %key, files = extracted, "package installed");
                Ok(InstallOutcome::Installed { sha })
            }
            Err(_) if final_dir.is_dir() => {
                // Another writer finished first; the guard removes our tmp dir.
                debug!(library = %key, "install lost the race, keeping existing directory");
                drop(guard);
                self.verify_existing(library, expected_sha)
            }
            Err(e) => Err(StoreError::io(&final_dir, e)),
        }
    }

    /// Recompute the stored archive's sha and check it against `expected`.
    fn verify_existing(
        &self,
        library: &Library,
        expected_sha: Option<&str>,
    ) -> Result<InstallOutcome> {
        let dir = self.store.package_dir(&library.name, &library.version);
        let archive = dir.join(PackageStore::archive_name(&library.name, &library.version));
        let sha = sha512_base64_file(&archive)?;
        if let Some(expected) = expected_sha
            && expected != sha
        {
            return Err(StoreError::ShaMismatch {
                library: library.key(),
                expected: expected.to_string(),
                actual: sha,
            });
        }
        debug!(library = %library.key(), "package already installed");
        Ok(InstallOutcome::AlreadyInstalled { sha })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_core::Version;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn package_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buf);
            for (name, contents) in entries {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(contents.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    fn lib(name: &str, version: &str) -> Library {
        Library::new(name, Version::parse(version).unwrap())
    }

    #[tokio::test]
    async fn install_extracts_and_keeps_archive() {
        let tmp = TempDir::new().unwrap();
        let store = PackageStore::open(tmp.path()).unwrap();
        let installer = PackageInstaller::new(store.clone());

        let bytes = package_bytes(&[("package.json", "{}"), ("lib/A.dll", "x")]);
        let outcome = installer.install(&lib("A", "1.0"), bytes.clone(), None).await.unwrap();
        assert!(outcome.freshly_installed());
        assert_eq!(outcome.sha(), sha512_base64(&bytes));

        let dir = store.package_dir("A", &Version::parse("1.0").unwrap());
        assert!(dir.join("A.1.0.zip").is_file());
        assert!(dir.join("lib/A.dll").is_file());
    }

    #[tokio::test]
    async fn reinstall_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let installer = PackageInstaller::new(PackageStore::open(tmp.path()).unwrap());
        let bytes = package_bytes(&[("package.json", "{}")]);

        let first = installer.install(&lib("A", "1.0"), bytes.clone(), None).await.unwrap();
        let second = installer.install(&lib("A", "1.0"), bytes, None).await.unwrap();
        assert!(first.freshly_installed());
        assert!(!second.freshly_installed());
        assert_eq!(first.sha(), second.sha());
    }

    #[tokio::test]
    async fn sha_mismatch_fails_before_write() {
        let tmp = TempDir::new().unwrap();
        let store = PackageStore::open(tmp.path()).unwrap();
        let installer = PackageInstaller::new(store.clone());
        let bytes = package_bytes(&[("package.json", "{}")]);

        let err = installer
            .install(&lib("A", "1.0"), bytes, Some("bogus-sha"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ShaMismatch { .. }));
        assert!(!store.is_installed("A", &Version::parse("1.0").unwrap()));
    }

    #[tokio::test]
    async fn existing_install_is_verified_against_expected_sha() {
        let tmp = TempDir::new().unwrap();
        let store = PackageStore::open(tmp.path()).unwrap();
        let installer = PackageInstaller::new(store.clone());
        let bytes = package_bytes(&[("package.json", "{}")]);
        installer.install(&lib("A", "1.0"), bytes, None).await.unwrap();

        // Tamper with the stored archive.
        let dir = store.package_dir("A", &Version::parse("1.0").unwrap());
        std::fs::write(dir.join("A.1.0.zip"), b"tampered").unwrap();

        let err = installer
            .install(&lib("A", "1.0"), Vec::new(), Some("expected-sha"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ShaMismatch { .. }));
    }

    #[tokio::test]
    async fn concurrent_installs_agree() {
        let tmp = TempDir::new().unwrap();
        let store = PackageStore::open(tmp.path()).unwrap();
        let installer = Arc::new(PackageInstaller::new(store.clone()));
        let bytes = package_bytes(&[("package.json", "{}")]);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let installer = Arc::clone(&installer);
            let bytes = bytes.clone();
            handles.push(tokio::spawn(async move {
                installer.install(&lib("A", "1.0"), bytes, None).await
            }));
        }
        let mut fresh = 0;
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            if outcome.freshly_installed() {
                fresh += 1;
            }
        }
        assert_eq!(fresh, 1);
        assert!(store.is_installed("A", &Version::parse("1.0").unwrap()));
    }
}
