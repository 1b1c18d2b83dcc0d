//! Lock file validation against a manifest.
//!
//! A lock file is valid for a project when (a) its dependency-group keys
//! form exactly the set `{""} ∪ project.frameworks`, and (b) for every
//! key, the set of declared-dependency strings equals the manifest's set —
//! the symmetric difference must be empty. Both sides canonicalise through
//! the one range formatter, so spelling differences in the manifest never
//! cause spurious invalidation.

use crate::types::{LOCK_FILE_VERSION, LockFile};
use caravel_manifest::Project;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// How the driver should treat the lock file it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockClassification {
    /// No lock file on disk.
    Absent,
    /// Valid and `locked: true`: replay without the network.
    ValidLocked,
    /// Valid and `locked: false`: a fresh walk may replace it.
    ValidUnlocked,
    /// Unreadable or mismatched: re-resolve with the network if allowed.
    Invalid,
}

/// Validation outcome.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Whether validation passed.
    pub valid: bool,
    /// Reasons it did not.
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// A passing result.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Record a failure.
    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }
}

/// Validation failure reasons.
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// The format version is not the supported one.
    UnsupportedVersion(u32),
    /// Group keys differ from `{""} ∪ project.frameworks`.
    GroupKeys {
        /// Keys only the lock file has.
        extra: Vec<String>,
        /// Keys only the manifest has.
        missing: Vec<String>,
    },
    /// A group's dependency strings differ from the manifest's.
    GroupDependencies {
        /// Group key.
        group: String,
        /// Strings only the lock file has.
        extra: Vec<String>,
        /// Strings only the manifest has.
        missing: Vec<String>,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion(v) => write!(f, "unsupported lock file version {v}"),
            Self::GroupKeys { extra, missing } => write!(
                f,
                "dependency groups differ (lock-only: [{}], manifest-only: [{}])",
                extra.join(", "),
                missing.join(", ")
            ),
            Self::GroupDependencies {
                group,
                extra,
                missing,
            } => write!(
                f,
                "group '{group}' differs (lock-only: [{}], manifest-only: [{}])",
                extra.join(", "),
                missing.join(", ")
            ),
        }
    }
}

/// Validate `lock` against `project`.
#[must_use]
pub fn validate(lock: &LockFile, project: &Project) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if lock.version != LOCK_FILE_VERSION {
        result.add_error(ValidationError::UnsupportedVersion(lock.version));
        return result;
    }

    let lock_keys: BTreeSet<String> = lock.framework_dependencies.keys().cloned().collect();
    let mut manifest_keys: BTreeSet<String> = BTreeSet::new();
    manifest_keys.insert(String::new());
    for framework in project.frameworks() {
        manifest_keys.insert(framework.to_string());
    }

    if lock_keys != manifest_keys {
        result.add_error(ValidationError::GroupKeys {
            extra: lock_keys.difference(&manifest_keys).cloned().collect(),
            missing: manifest_keys.difference(&lock_keys).cloned().collect(),
        });
        return result;
    }

    for (key, lock_deps) in &lock.framework_dependencies {
        let manifest_deps: BTreeSet<String> = if key.is_empty() {
            project
                .shared_dependencies
                .iter()
                .map(|dep| dep.range.to_lock_string())
                .collect()
        } else {
            project
                .per_framework
                .iter()
                .find(|(fx, _)| fx.to_string() == *key)
                .map(|(_, deps)| {
                    deps.iter()
                        .map(|dep| dep.range.to_lock_string())
                        .collect()
                })
                .unwrap_or_default()
        };
        let lock_set: BTreeSet<String> = lock_deps.iter().cloned().collect();

        if lock_set != manifest_deps {
            result.add_error(ValidationError::GroupDependencies {
                group: key.clone(),
                extra: lock_set.difference(&manifest_deps).cloned().collect(),
                missing: manifest_deps.difference(&lock_set).cloned().collect(),
            });
        }
    }

    if !result.valid {
        debug!(errors = result.errors.len(), "lock file failed validation");
    }
    result
}

/// Classify a read attempt for the driver.
#[must_use]
pub fn classify(lock: Option<&LockFile>, project: &Project) -> LockClassification {
    match lock {
        None => LockClassification::Absent,
        Some(lock) => {
            if !validate(lock, project).valid {
                LockClassification::Invalid
            } else if lock.locked {
                LockClassification::ValidLocked
            } else {
                LockClassification::ValidUnlocked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(manifest: &str) -> (TempDir, Project) {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("project.json"), manifest).unwrap();
        let project = Project::load(&dir).unwrap();
        (tmp, project)
    }

    fn matching_lock() -> LockFile {
        let mut lock = LockFile::new();
        lock.framework_dependencies
            .insert(String::new(), vec!["A >= 1.0".to_string()]);
        lock.framework_dependencies
            .insert("net1".to_string(), vec![]);
        lock
    }

    const MANIFEST: &str = r#"{"dependencies":{"A":"1.0"},"frameworks":{"net1":{}}}"#;

    #[test]
    fn fresh_lock_validates() {
        let (_tmp, project) = project(MANIFEST);
        assert!(validate(&matching_lock(), &project).valid);
    }

    #[test]
    fn mutated_dependency_string_invalidates() {
        let (_tmp, project) = project(MANIFEST);
        let mut lock = matching_lock();
        lock.framework_dependencies[""] = vec!["A >= 2.0".to_string()];
        let result = validate(&lock, &project);
        assert!(!result.valid);
        assert!(matches!(
            result.errors[0],
            ValidationError::GroupDependencies { .. }
        ));
    }

    #[test]
    fn missing_framework_group_invalidates() {
        let (_tmp, project) = project(MANIFEST);
        let mut lock = matching_lock();
        lock.framework_dependencies.shift_remove("net1");
        let result = validate(&lock, &project);
        assert!(!result.valid);
        assert!(matches!(result.errors[0], ValidationError::GroupKeys { .. }));
    }

    #[test]
    fn unsupported_version_invalidates() {
        let (_tmp, project) = project(MANIFEST);
        let mut lock = matching_lock();
        lock.version = 2;
        assert!(!validate(&lock, &project).valid);
    }

    #[test]
    fn classification_states() {
        let (_tmp, project) = project(MANIFEST);
        assert_eq!(classify(None, &project), LockClassification::Absent);

        let mut lock = matching_lock();
        assert_eq!(
            classify(Some(&lock), &project),
            LockClassification::ValidUnlocked
        );

        lock.locked = true;
        assert_eq!(
            classify(Some(&lock), &project),
            LockClassification::ValidLocked
        );

        lock.framework_dependencies.shift_remove("net1");
        assert_eq!(classify(Some(&lock), &project), LockClassification::Invalid);
    }
}
