//! Library identity: concrete libraries, ranges, and typed dependencies.

use crate::version::{Version, VersionRange};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete `(name, version)` pair.
///
/// Names compare case-sensitively; providers may *match* case-insensitively,
/// but a spelling difference between the request and the match is a
/// resolution error, never silent acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Library {
    /// Library name.
    pub name: String,
    /// Concrete version.
    pub version: Version,
}

impl Library {
    /// Create a library identity.
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// The `name/version` key used by the store and the lock file.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// A dependency constraint: a name plus either a version range or a
/// framework/GAC reference marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryRange {
    /// Requested name (case-sensitive).
    pub name: String,
    /// Version constraint; `None` only for framework/GAC references.
    pub range: Option<VersionRange>,
    /// Whether this names a framework reference assembly (or GAC entry),
    /// which bypasses version resolution.
    pub is_framework_reference: bool,
}

impl LibraryRange {
    /// A versioned dependency.
    #[must_use]
    pub fn new(name: impl Into<String>, range: VersionRange) -> Self {
        Self {
            name: name.into(),
            range: Some(range),
            is_framework_reference: false,
        }
    }

    /// A framework reference, resolved by name against the target
    /// framework's reference-assembly set.
    #[must_use]
    pub fn framework_reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: None,
            is_framework_reference: true,
        }
    }

    /// Whether `version` satisfies this range. Framework references accept
    /// any version.
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        self.range.as_ref().is_none_or(|r| r.satisfies(version))
    }

    /// The canonical string recorded in lock files and used for range
    /// equality. Framework references use the `fx/` prefix.
    #[must_use]
    pub fn to_lock_string(&self) -> String {
        if self.is_framework_reference {
            return format!("fx/{}", self.name);
        }
        match &self.range {
            Some(range) => format!("{} {range}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for LibraryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lock_string())
    }
}

/// How a dependency is consumed. The hint restricts inclusion at the
/// consumer's build time; it never changes resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Ordinary runtime dependency.
    #[default]
    Default,
    /// Build-time only.
    Build,
    /// Development-time only.
    Development,
}

impl DependencyKind {
    /// Parse the manifest `type` field; unknown values fall back to default.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "build" => Self::Build,
            "development" => Self::Development,
            _ => Self::Default,
        }
    }
}

/// A declared dependency: a range plus its consumption hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The constraint.
    pub range: LibraryRange,
    /// Consumption hint.
    pub kind: DependencyKind,
}

impl Dependency {
    /// An ordinary dependency on `range`.
    #[must_use]
    pub fn new(range: LibraryRange) -> Self {
        Self {
            range,
            kind: DependencyKind::Default,
        }
    }

    /// A dependency with an explicit kind.
    #[must_use]
    pub fn with_kind(range: LibraryRange, kind: DependencyKind) -> Self {
        Self { range, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_key() {
        let lib = Library::new("A", Version::parse("1.0").unwrap());
        assert_eq!(lib.key(), "A/1.0");
    }

    #[test]
    fn lock_string_forms() {
        let dep = LibraryRange::new("A", VersionRange::parse("1.0").unwrap());
        assert_eq!(dep.to_lock_string(), "A >= 1.0");

        let fx = LibraryRange::framework_reference("System.Data");
        assert_eq!(fx.to_lock_string(), "fx/System.Data");
    }

    #[test]
    fn framework_reference_accepts_any_version() {
        let fx = LibraryRange::framework_reference("System.Data");
        assert!(fx.satisfies(&Version::parse("0.0.1").unwrap()));
    }

    #[test]
    fn dependency_kind_parse() {
        assert_eq!(DependencyKind::parse("build"), DependencyKind::Build);
        assert_eq!(DependencyKind::parse("weird"), DependencyKind::Default);
    }
}
