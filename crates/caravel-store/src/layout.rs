//! On-disk store layout and enumeration.

use crate::error::{Result, StoreError};
use crate::package::InstalledPackage;
use caravel_core::Version;
use std::fs;
use std::path::{Path, PathBuf};

/// Handle to a package store rooted at a directory.
///
/// Layout: `<root>/<name>/<version>/` holding the original archive and the
/// extracted tree. Version directories still carrying a `.tmp-` marker are
/// in-flight installs and invisible to enumeration.
#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    /// Open (and create if needed) a store at `root`.
    ///
    /// # Errors
    /// Returns error if the root cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Store root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final directory for a `(name, version)` pair.
    #[must_use]
    pub fn package_dir(&self, name: &str, version: &Version) -> PathBuf {
        self.root.join(name).join(version.to_string())
    }

    /// Archive file name for a `(name, version)` pair.
    #[must_use]
    pub fn archive_name(name: &str, version: &Version) -> String {
        format!("{name}.{version}.zip")
    }

    /// Whether a package is fully installed.
    #[must_use]
    pub fn is_installed(&self, name: &str, version: &Version) -> bool {
        self.package_dir(name, version).is_dir()
    }

    /// All installed versions of `name`, unsorted directories parsed and
    /// returned in ascending order.
    #[must_use]
    pub fn versions(&self, name: &str) -> Vec<Version> {
        let dir = self.root.join(name);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut versions: Vec<Version> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let file_name = e.file_name();
                let s = file_name.to_str()?;
                if s.contains(".tmp-") {
                    return None;
                }
                Version::parse(s).ok()
            })
            .collect();
        versions.sort();
        versions
    }

    /// Find the on-disk spelling of `name`, matching case-insensitively.
    /// Returns the directory's spelling, which may differ from the request.
    #[must_use]
    pub fn find_name_ignore_case(&self, name: &str) -> Option<String> {
        if self.root.join(name).is_dir() {
            return Some(name.to_string());
        }
        let entries = fs::read_dir(&self.root).ok()?;
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            if let Some(s) = file_name.to_str()
                && s.eq_ignore_ascii_case(name)
                && entry.path().is_dir()
            {
                return Some(s.to_string());
            }
        }
        None
    }

    /// Enumerate every installed `(name, version)` pair.
    #[must_use]
    pub fn enumerate(&self) -> Vec<(String, Version)> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !entry.path().is_dir() {
                continue;
            }
            for version in self.versions(name) {
                out.push((name.to_string(), version));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        out
    }

    /// Read the installed package for `(name, version)`.
    ///
    /// # Errors
    /// Returns error if the package directory or metadata is unreadable.
    pub fn read_package(&self, name: &str, version: &Version) -> Result<InstalledPackage> {
        let dir = self.package_dir(name, version);
        InstalledPackage::read(&dir, name, version.clone())
    }
}
