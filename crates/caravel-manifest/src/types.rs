//! Raw serde-facing manifest types.

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;

/// `project.json` as written on disk. Field names mirror the manifest
/// grammar; unknown keys are ignored by serde's default behavior.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawManifest {
    /// Project version; defaults to `1.0.0` when absent.
    #[serde(default)]
    pub version: Option<String>,

    /// Entry point module name.
    #[serde(default)]
    pub entry_point: Option<String>,

    /// Named commands, expanded by the host before launch.
    #[serde(default)]
    pub commands: BTreeMap<String, String>,

    /// Dependencies applicable to every target framework.
    #[serde(default)]
    pub dependencies: IndexMap<String, RawDependency>,

    /// Per-framework sections, in declaration order.
    #[serde(default)]
    pub frameworks: IndexMap<String, RawFrameworkSection>,

    /// Source file patterns; defaults to `**/*.src`.
    #[serde(default)]
    pub code: Option<PatternList>,

    /// Shared source file patterns.
    #[serde(default)]
    pub shared: Option<PatternList>,

    /// Patterns excluded from `code`.
    #[serde(default)]
    pub exclude: Option<PatternList>,

    /// Preprocessor source patterns.
    #[serde(default)]
    pub preprocess: Option<PatternList>,

    /// Lifecycle hook scripts (`prerestore`, `postrestore`, `prepare`).
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,

    /// Compilation options passed through to the compiler backend.
    #[serde(default)]
    pub compilation_options: Option<sonic_rs::Value>,
}

/// A dependency value: either shorthand `"name": "1.0"` or the object form
/// `"name": {"version": "1.0", "type": "build"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDependency {
    /// Version range shorthand.
    Shorthand(String),
    /// Object form with optional type hint.
    Object {
        /// Version range.
        #[serde(default)]
        version: Option<String>,
        /// Dependency type hint.
        #[serde(rename = "type", default)]
        kind: Option<String>,
    },
}

impl RawDependency {
    /// The range string, if one was declared.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Shorthand(v) => Some(v),
            Self::Object { version, .. } => version.as_deref(),
        }
    }

    /// The type hint, if one was declared.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Shorthand(_) => None,
            Self::Object { kind, .. } => kind.as_deref(),
        }
    }
}

/// One `frameworks` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrameworkSection {
    /// Framework-specific dependencies.
    #[serde(default)]
    pub dependencies: IndexMap<String, RawDependency>,

    /// Reference assemblies resolved from the installed framework.
    #[serde(default)]
    pub framework_assemblies: IndexMap<String, RawDependency>,
}

/// A glob pattern field: a single pattern or a list of patterns.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PatternList {
    /// Single pattern.
    Single(String),
    /// Multiple patterns.
    Multiple(Vec<String>),
}

impl PatternList {
    /// Patterns as a slice-like vec.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Self::Single(p) => vec![p.as_str()],
            Self::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }
}
