//! Lock file data structures.

use crate::atomic::AtomicWriter;
use crate::error::{LockfileError, Result};
use caravel_core::{Library, Version};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Lock file name next to the manifest.
pub const LOCK_FILE_NAME: &str = "project.lock.json";

/// Current lock format version.
pub const LOCK_FILE_VERSION: u32 = 1;

/// Complete `project.lock.json` structure.
///
/// The two maps preserve insertion order; [`LockFile::canonicalize`] puts
/// them into the canonical order before writing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    /// Whether restores must replay this file without the network.
    pub locked: bool,

    /// Format version.
    pub version: u32,

    /// Declared-dependency strings per group: `""` holds the shared set,
    /// the remaining keys are framework profiles in declaration order.
    #[serde(rename = "projectFileDependencyGroups")]
    pub framework_dependencies: IndexMap<String, Vec<String>>,

    /// Resolved libraries keyed `name/version`.
    pub libraries: IndexMap<String, LockedLibrary>,
}

impl LockFile {
    /// An empty, unlocked file of the current version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            locked: false,
            version: LOCK_FILE_VERSION,
            framework_dependencies: IndexMap::new(),
            libraries: IndexMap::new(),
        }
    }

    /// Add a resolved library.
    pub fn insert_library(&mut self, library: &Library, locked: LockedLibrary) {
        self.libraries.insert(library.key(), locked);
    }

    /// Parse a `name/version` library key.
    ///
    /// # Errors
    /// Returns error when the key has no separator or an unparseable
    /// version.
    pub fn parse_key(key: &str) -> Result<Library> {
        let (name, version) = key
            .rsplit_once('/')
            .ok_or_else(|| LockfileError::InvalidLibraryKey(key.to_string()))?;
        let version = Version::parse(version)
            .map_err(|_| LockfileError::InvalidLibraryKey(key.to_string()))?;
        Ok(Library::new(name, version))
    }

    /// Put both maps into canonical order: the `""` group first (group
    /// order is otherwise the builder's declaration order), libraries
    /// sorted by name then semantic version.
    pub fn canonicalize(&mut self) {
        if let Some(index) = self.framework_dependencies.get_index_of("") {
            self.framework_dependencies.move_index(index, 0);
        }
        for deps in self.framework_dependencies.values_mut() {
            deps.sort();
        }
        self.libraries.sort_by(|key_a, _, key_b, _| {
            let a = Self::parse_key(key_a);
            let b = Self::parse_key(key_b);
            match (a, b) {
                (Ok(a), Ok(b)) => a
                    .name
                    .cmp(&b.name)
                    .then_with(|| a.version.cmp(&b.version)),
                _ => key_a.cmp(key_b),
            }
        });
    }

    /// The canonical bytes: two-space indented JSON with a trailing
    /// newline. Callers must [`LockFile::canonicalize`] first; writing
    /// twice yields identical bytes.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_canonical_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Read a lock file.
    ///
    /// # Errors
    /// Returns error when the file is unreadable or not valid JSON.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LockfileError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Canonicalize and atomically replace the file at `path`.
    ///
    /// # Errors
    /// Returns error when the write or the pre-rename verification fails.
    pub fn write(&mut self, path: &Path) -> Result<()> {
        self.canonicalize();
        let text = self.to_canonical_json()?;
        let mut writer = AtomicWriter::new(path)?;
        writer.content(text.into_bytes());
        writer.commit()?;
        Ok(())
    }
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

/// One resolved library: the recorded archive sha plus the metadata a
/// replay needs, mirroring the installed package minus file contents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedLibrary {
    /// Base64 sha512 of the archive bytes; empty for project references
    /// and framework assemblies, which have no archive.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha: String,

    /// Dependency ranges keyed by framework (`"*"` for all frameworks).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependency_sets: BTreeMap<String, BTreeMap<String, String>>,

    /// Framework assemblies keyed by framework.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub framework_assemblies: BTreeMap<String, Vec<String>>,

    /// Assembly references keyed by framework.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub package_assembly_references: BTreeMap<String, Vec<String>>,

    /// Files in the package tree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> LockFile {
        let mut lock = LockFile::new();
        lock.framework_dependencies
            .insert("net1".to_string(), vec![]);
        lock.framework_dependencies
            .insert(String::new(), vec!["A >= 1.0".to_string()]);
        lock.insert_library(
            &Library::new("B", Version::parse("1.10").unwrap()),
            LockedLibrary::default(),
        );
        lock.insert_library(
            &Library::new("A", Version::parse("1.0").unwrap()),
            LockedLibrary {
                sha: "abc".to_string(),
                ..LockedLibrary::default()
            },
        );
        lock.insert_library(
            &Library::new("B", Version::parse("1.2").unwrap()),
            LockedLibrary::default(),
        );
        lock
    }

    #[test]
    fn canonical_order() {
        let mut lock = sample();
        lock.canonicalize();

        let groups: Vec<&String> = lock.framework_dependencies.keys().collect();
        assert_eq!(groups, vec!["", "net1"]);

        let libraries: Vec<&String> = lock.libraries.keys().collect();
        // 1.2 sorts below 1.10 semantically, not lexically.
        assert_eq!(libraries, vec!["A/1.0", "B/1.2", "B/1.10"]);
    }

    #[test]
    fn canonical_json_is_stable() {
        let mut lock = sample();
        lock.canonicalize();
        let first = lock.to_canonical_json().unwrap();
        let second = lock.to_canonical_json().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("{\n  \"locked\":"));
        assert!(first.ends_with('\n'));
    }

    #[test]
    fn roundtrip_through_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LOCK_FILE_NAME);

        let mut lock = sample();
        lock.write(&path).unwrap();
        let read_back = LockFile::read(&path).unwrap();
        assert_eq!(lock, read_back);

        // A second write is byte-identical.
        let bytes = fs::read(&path).unwrap();
        lock.write(&path).unwrap();
        assert_eq!(bytes, fs::read(&path).unwrap());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// read(write(L)) == L for generated lock files.
            #[test]
            fn prop_roundtrip(
                entries in proptest::collection::btree_map(
                    "[A-Z][a-z]{0,8}",
                    (0u64..20, 0u64..20, "[a-f0-9]{0,12}"),
                    0..8,
                ),
                locked in proptest::bool::ANY,
            ) {
                let mut lock = LockFile::new();
                lock.locked = locked;
                lock.framework_dependencies.insert(String::new(), vec![]);
                for (name, (major, minor, sha)) in entries {
                    lock.insert_library(
                        &Library::new(name, Version::new(major, minor, 0, 0)),
                        LockedLibrary { sha, ..LockedLibrary::default() },
                    );
                }
                lock.canonicalize();

                let json = lock.to_canonical_json().unwrap();
                let read_back: LockFile = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(&lock, &read_back);

                // And the canonical bytes are a fixpoint.
                let mut again = read_back;
                again.canonicalize();
                prop_assert_eq!(json, again.to_canonical_json().unwrap());
            }
        }
    }

    #[test]
    fn parse_key_forms() {
        let library = LockFile::parse_key("A/1.0").unwrap();
        assert_eq!(library.name, "A");
        assert!(LockFile::parse_key("no-separator").is_err());
        assert!(LockFile::parse_key("A/not-a-version").is_err());
    }
}
