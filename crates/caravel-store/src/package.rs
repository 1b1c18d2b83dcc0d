//! Installed package metadata.

use crate::error::{Result, StoreError};
use caravel_core::{
    Dependency, FrameworkProfile, Library, LibraryRange, Version, VersionRange, from_json,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata file carried at the root of every package archive.
pub const PACKAGE_METADATA_FILE: &str = "package.json";

/// Raw `package.json` inside an archive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    /// Package name; must agree with the store directory.
    #[serde(default)]
    pub name: Option<String>,
    /// Package version.
    #[serde(default)]
    pub version: Option<String>,
    /// Dependency ranges keyed by framework profile; `"*"` applies to all
    /// frameworks.
    #[serde(default)]
    pub dependency_sets: BTreeMap<String, BTreeMap<String, String>>,
    /// Framework assemblies keyed by framework profile.
    #[serde(default)]
    pub framework_assemblies: BTreeMap<String, Vec<String>>,
    /// Assembly references keyed by framework profile.
    #[serde(default)]
    pub package_assembly_references: BTreeMap<String, Vec<String>>,
}

impl PackageMetadata {
    /// Parse the `package.json` entry out of in-memory archive bytes.
    ///
    /// Archives without a metadata entry yield the empty default.
    ///
    /// # Errors
    /// Returns error when the archive or the metadata entry is unreadable.
    pub fn from_archive_bytes(bytes: &[u8]) -> Result<Self> {
        use std::io::Read;

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| StoreError::Archive(e.to_string()))?;
        let mut entry = match archive.by_name(PACKAGE_METADATA_FILE) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(Self::default()),
            Err(e) => return Err(StoreError::Archive(e.to_string())),
        };
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| StoreError::Archive(e.to_string()))?;
        from_json(&text).map_err(|e| StoreError::InvalidMetadata {
            path: PathBuf::from(PACKAGE_METADATA_FILE),
            message: e.to_string(),
        })
    }

    /// The declared dependencies applicable to `framework`: the all-framework
    /// (`"*"`) set plus the nearest compatible framework-specific set.
    ///
    /// # Errors
    /// Returns error when a recorded range fails to parse.
    pub fn dependencies_for(
        &self,
        framework: &FrameworkProfile,
        compat: &caravel_core::CompatibilityTable,
    ) -> caravel_core::Result<Vec<Dependency>> {
        let mut out = Vec::new();
        if let Some(shared) = self.dependency_sets.get("*") {
            for (name, range) in shared {
                out.push(Dependency::new(LibraryRange::new(
                    name.clone(),
                    VersionRange::parse(range)?,
                )));
            }
        }

        // Highest compatible framework-specific set wins.
        let mut best: Option<(FrameworkProfile, &BTreeMap<String, String>)> = None;
        for (fx_name, set) in &self.dependency_sets {
            if fx_name == "*" {
                continue;
            }
            let Ok(profile) = FrameworkProfile::parse(fx_name) else {
                continue;
            };
            if !compat.compatible(framework, &profile) {
                continue;
            }
            let better = match &best {
                Some((current, _)) => profile.version() > current.version(),
                None => true,
            };
            if better {
                best = Some((profile, set));
            }
        }
        if let Some((_, set)) = best {
            for (name, range) in set {
                out.push(Dependency::new(LibraryRange::new(
                    name.clone(),
                    VersionRange::parse(range)?,
                )));
            }
        }
        Ok(out)
    }
}

/// A package materialised in the store.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    /// Identity.
    pub library: Library,
    /// Directory under the store root.
    pub dir: PathBuf,
    /// Files in the extracted tree, relative to `dir`.
    pub files: Vec<PathBuf>,
    /// Parsed metadata.
    pub metadata: PackageMetadata,
}

impl InstalledPackage {
    /// Read an installed package from its store directory.
    ///
    /// # Errors
    /// Returns error if the directory or its metadata cannot be read.
    pub fn read(dir: &Path, name: &str, version: Version) -> Result<Self> {
        let metadata_path = dir.join(PACKAGE_METADATA_FILE);
        let metadata = if metadata_path.is_file() {
            let text =
                fs::read_to_string(&metadata_path).map_err(|e| StoreError::io(&metadata_path, e))?;
            from_json(&text).map_err(|e| StoreError::InvalidMetadata {
                path: metadata_path.clone(),
                message: e.to_string(),
            })?
        } else {
            PackageMetadata::default()
        };

        let mut files = Vec::new();
        collect_files(dir, dir, &mut files)?;
        files.sort();

        Ok(Self {
            library: Library::new(name, version),
            dir: dir.to_path_buf(),
            files,
            metadata,
        })
    }

    /// The declared dependencies applicable to `framework`.
    ///
    /// # Errors
    /// Returns error when a recorded range fails to parse.
    pub fn dependencies_for(
        &self,
        framework: &FrameworkProfile,
        compat: &caravel_core::CompatibilityTable,
    ) -> caravel_core::Result<Vec<Dependency>> {
        self.metadata.dependencies_for(framework, compat)
    }

    /// Path of the original archive inside the package directory.
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.dir.join(format!(
            "{}.{}.zip",
            self.library.name, self.library.version
        ))
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.to_path_buf());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_core::CompatibilityTable;
    use tempfile::TempDir;

    fn fx(s: &str) -> FrameworkProfile {
        FrameworkProfile::parse(s).unwrap()
    }

    #[test]
    fn read_package_with_metadata() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(PACKAGE_METADATA_FILE),
            r#"{"dependencySets":{"*":{"B":"1.0"},"net45":{"C":"2.0"}}}"#,
        )
        .unwrap();

        let pkg =
            InstalledPackage::read(tmp.path(), "A", Version::parse("1.0").unwrap()).unwrap();
        assert_eq!(pkg.library.key(), "A/1.0");
        assert!(!pkg.files.is_empty());

        let compat = CompatibilityTable::new();
        let deps = pkg.dependencies_for(&fx("net45"), &compat).unwrap();
        assert_eq!(deps.len(), 2);

        // net1 is below net45, so only the shared set applies.
        let deps = pkg.dependencies_for(&fx("net1"), &compat).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].range.name, "B");
    }

    #[test]
    fn missing_metadata_yields_empty_sets() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("payload.bin"), "x").unwrap();
        let pkg =
            InstalledPackage::read(tmp.path(), "A", Version::parse("1.0").unwrap()).unwrap();
        assert!(pkg.metadata.dependency_sets.is_empty());
    }

    #[test]
    fn nearest_framework_set_wins() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(PACKAGE_METADATA_FILE),
            r#"{"dependencySets":{"net1":{"Old":"1.0"},"net4":{"New":"1.0"}}}"#,
        )
        .unwrap();
        let pkg =
            InstalledPackage::read(tmp.path(), "A", Version::parse("1.0").unwrap()).unwrap();
        let deps = pkg
            .dependencies_for(&fx("net45"), &CompatibilityTable::new())
            .unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].range.name, "New");
    }
}
