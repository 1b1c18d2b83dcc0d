//! The parsed, immutable project model.

use crate::types::{RawDependency, RawManifest};
use caravel_core::{
    Dependency, DependencyKind, Error, FrameworkProfile, LibraryRange, Result, Version,
    VersionRange, from_json,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The manifest file name every project directory carries.
pub const MANIFEST_FILE_NAME: &str = "project.json";

/// Default source pattern when the manifest declares no `code` key.
const DEFAULT_CODE_PATTERN: &str = "**/*.src";

/// A parsed project: name, version, commands, and per-framework dependency
/// sets. Created by parsing the manifest; immutable per run.
#[derive(Debug, Clone)]
pub struct Project {
    /// Project (assembly) name — the directory name.
    pub name: String,
    /// Project version.
    pub version: Version,
    /// Entry point module, when declared.
    pub entry_point: Option<String>,
    /// Named commands.
    pub commands: BTreeMap<String, String>,
    /// Lifecycle hook scripts.
    pub scripts: BTreeMap<String, String>,
    /// Dependencies applicable to every framework.
    pub shared_dependencies: Vec<Dependency>,
    /// Per-framework dependencies, in declaration order.
    pub per_framework: Vec<(FrameworkProfile, Vec<Dependency>)>,
    /// Resolved source file paths.
    pub source_files: Vec<PathBuf>,
    /// Resolved shared source file paths.
    pub shared_files: Vec<PathBuf>,
    /// Resolved preprocessor source paths, compiled alongside `code`.
    pub preprocess_files: Vec<PathBuf>,
    /// Compilation options passed through to the compiler backend.
    pub compilation_options: Option<sonic_rs::Value>,
    /// Absolute path of the manifest file.
    pub project_file_path: PathBuf,
}

impl Project {
    /// Load the project rooted at `dir`.
    ///
    /// # Errors
    /// Returns [`Error::ManifestMissing`] when `dir` has no manifest, and
    /// [`Error::InvalidManifest`] on parse failures.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        if !manifest_path.is_file() {
            return Err(Error::ManifestMissing(manifest_path));
        }
        let text = fs::read_to_string(&manifest_path).map_err(|e| Error::io(&manifest_path, e))?;
        let raw: RawManifest = from_json(&text)
            .map_err(|e| Error::invalid_manifest(e.to_string(), Some(manifest_path.clone())))?;
        Self::from_raw(raw, dir, manifest_path)
    }

    /// Whether `dir` looks like a project directory.
    #[must_use]
    pub fn has_manifest(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE_NAME).is_file()
    }

    fn from_raw(raw: RawManifest, dir: &Path, manifest_path: PathBuf) -> Result<Self> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::invalid_manifest("project directory has no name", Some(manifest_path.clone()))
            })?;

        let version = match raw.version.as_deref() {
            Some(v) => Version::parse(v)?,
            None => Version::parse("1.0.0")?,
        };

        let shared_dependencies = parse_dependencies(&raw.dependencies, &manifest_path)?;

        let mut per_framework = Vec::with_capacity(raw.frameworks.len());
        for (fx_name, section) in &raw.frameworks {
            let profile = FrameworkProfile::parse(fx_name)?;
            let mut deps = parse_dependencies(&section.dependencies, &manifest_path)?;
            for (assembly, _) in &section.framework_assemblies {
                deps.push(Dependency::new(LibraryRange::framework_reference(assembly)));
            }
            per_framework.push((profile, deps));
        }

        let code_patterns: Vec<String> = raw.code.as_ref().map_or_else(
            || vec![DEFAULT_CODE_PATTERN.to_string()],
            |p| p.patterns().iter().map(ToString::to_string).collect(),
        );
        let exclude_patterns: Vec<String> = raw
            .exclude
            .as_ref()
            .map(|p| p.patterns().iter().map(ToString::to_string).collect())
            .unwrap_or_default();
        let shared_patterns: Vec<String> = raw
            .shared
            .as_ref()
            .map(|p| p.patterns().iter().map(ToString::to_string).collect())
            .unwrap_or_default();
        let preprocess_patterns: Vec<String> = raw
            .preprocess
            .as_ref()
            .map(|p| p.patterns().iter().map(ToString::to_string).collect())
            .unwrap_or_default();

        let source_files = resolve_patterns(dir, &code_patterns, &exclude_patterns);
        let shared_files = resolve_patterns(dir, &shared_patterns, &[]);
        let preprocess_files = resolve_patterns(dir, &preprocess_patterns, &[]);

        debug!(
            project = %name,
            version = %version,
            frameworks = per_framework.len(),
            sources = source_files.len(),
            "manifest parsed"
        );

        Ok(Self {
            name,
            version,
            entry_point: raw.entry_point,
            commands: raw.commands,
            scripts: raw.scripts,
            shared_dependencies,
            per_framework,
            source_files,
            shared_files,
            preprocess_files,
            compilation_options: raw.compilation_options,
            project_file_path: manifest_path,
        })
    }

    /// Declared framework profiles, in manifest order.
    #[must_use]
    pub fn frameworks(&self) -> Vec<&FrameworkProfile> {
        self.per_framework.iter().map(|(fx, _)| fx).collect()
    }

    /// The effective dependency set for `framework`: shared dependencies
    /// followed by the framework's own, in declaration order.
    #[must_use]
    pub fn effective_dependencies(&self, framework: &FrameworkProfile) -> Vec<Dependency> {
        let mut deps = self.shared_dependencies.clone();
        if let Some((_, fx_deps)) = self.per_framework.iter().find(|(fx, _)| fx == framework) {
            deps.extend(fx_deps.iter().cloned());
        }
        deps
    }

    /// The project directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.project_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
    }

    /// The entry point: the declared one, or the project name.
    #[must_use]
    pub fn entry_point_or_name(&self) -> &str {
        self.entry_point.as_deref().unwrap_or(&self.name)
    }
}

fn parse_dependencies(
    raw: &indexmap::IndexMap<String, RawDependency>,
    manifest_path: &Path,
) -> Result<Vec<Dependency>> {
    let mut out = Vec::with_capacity(raw.len());
    for (dep_name, value) in raw {
        let range = match value.version() {
            Some(v) => VersionRange::parse(v).map_err(|e| {
                Error::invalid_manifest(
                    format!("dependency '{dep_name}': {e}"),
                    Some(manifest_path.to_path_buf()),
                )
            })?,
            None => VersionRange::any(),
        };
        let kind = value
            .kind()
            .map_or(DependencyKind::Default, DependencyKind::parse);
        out.push(Dependency::with_kind(
            LibraryRange::new(dep_name.clone(), range),
            kind,
        ));
    }
    Ok(out)
}

fn resolve_patterns(dir: &Path, patterns: &[String], exclude: &[String]) -> Vec<PathBuf> {
    let excluded: Vec<glob::Pattern> = exclude
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();

    let mut files = Vec::new();
    for pattern in patterns {
        let full = dir.join(pattern);
        let Some(full_str) = full.to_str() else {
            continue;
        };
        let Ok(walk) = glob::glob(full_str) else {
            continue;
        };
        for entry in walk.flatten() {
            if !entry.is_file() {
                continue;
            }
            let relative = entry.strip_prefix(dir).unwrap_or(&entry);
            if excluded.iter().any(|p| p.matches_path(relative)) {
                continue;
            }
            files.push(entry);
        }
    }
    files.sort();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_project(dir: &Path, manifest: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE_NAME), manifest).unwrap();
    }

    #[test]
    fn load_minimal_manifest() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        write_project(&dir, r#"{"dependencies":{"A":"1.0"},"frameworks":{"net1":{}}}"#);

        let project = Project::load(&dir).unwrap();
        assert_eq!(project.name, "App");
        assert_eq!(project.version, Version::parse("1.0.0").unwrap());
        assert_eq!(project.shared_dependencies.len(), 1);
        assert_eq!(
            project.shared_dependencies[0].range.to_lock_string(),
            "A >= 1.0"
        );
        assert_eq!(project.frameworks().len(), 1);
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = Project::load(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::ManifestMissing(_)));
    }

    #[test]
    fn object_dependency_form() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        write_project(
            &dir,
            r#"{"dependencies":{"B":{"version":"[1.0,2.0)","type":"build"}}}"#,
        );

        let project = Project::load(&dir).unwrap();
        let dep = &project.shared_dependencies[0];
        assert_eq!(dep.kind, DependencyKind::Build);
        assert_eq!(dep.range.to_lock_string(), "B >= 1.0 < 2.0");
    }

    #[test]
    fn framework_assemblies_become_framework_references() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        write_project(
            &dir,
            r#"{"frameworks":{"net45":{"frameworkAssemblies":{"System.Data":""}}}}"#,
        );

        let project = Project::load(&dir).unwrap();
        let fx = FrameworkProfile::parse("net45").unwrap();
        let deps = project.effective_dependencies(&fx);
        assert_eq!(deps.len(), 1);
        assert!(deps[0].range.is_framework_reference);
        assert_eq!(deps[0].range.to_lock_string(), "fx/System.Data");
    }

    #[test]
    fn effective_set_is_shared_plus_framework() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        write_project(
            &dir,
            r#"{
                "dependencies": {"A": "1.0"},
                "frameworks": {
                    "net1": {"dependencies": {"B": "2.0"}},
                    "net45": {}
                }
            }"#,
        );

        let project = Project::load(&dir).unwrap();
        let net1 = FrameworkProfile::parse("net1").unwrap();
        let net45 = FrameworkProfile::parse("net45").unwrap();
        assert_eq!(project.effective_dependencies(&net1).len(), 2);
        assert_eq!(project.effective_dependencies(&net45).len(), 1);
    }

    #[test]
    fn code_patterns_resolve_and_exclude() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        write_project(&dir, r#"{"exclude":"skip/**"}"#);
        fs::write(dir.join("main.src"), "export Main { }").unwrap();
        fs::create_dir_all(dir.join("skip")).unwrap();
        fs::write(dir.join("skip").join("other.src"), "export Other { }").unwrap();

        let project = Project::load(&dir).unwrap();
        assert_eq!(project.source_files.len(), 1);
        assert!(project.source_files[0].ends_with("main.src"));
    }

    #[test]
    fn preprocess_patterns_resolve_separately() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        write_project(&dir, r#"{"code":"main.src","preprocess":"pre/*.src"}"#);
        fs::write(dir.join("main.src"), "export Main { }").unwrap();
        fs::create_dir_all(dir.join("pre")).unwrap();
        fs::write(dir.join("pre").join("gen.src"), "export Gen { }").unwrap();

        let project = Project::load(&dir).unwrap();
        assert_eq!(project.source_files.len(), 1);
        assert_eq!(project.preprocess_files.len(), 1);
        assert!(project.preprocess_files[0].ends_with("pre/gen.src"));
    }

    #[test]
    fn compilation_options_are_surfaced() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        write_project(&dir, r#"{"compilationOptions":{"define":["RELEASE"]}}"#);

        let project = Project::load(&dir).unwrap();
        assert!(project.compilation_options.is_some());

        write_project(&dir, r"{}");
        let project = Project::load(&dir).unwrap();
        assert!(project.compilation_options.is_none());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        write_project(&dir, r#"{"version":"2.1","unknownThing":[1,2,3]}"#);
        let project = Project::load(&dir).unwrap();
        assert_eq!(project.version, Version::parse("2.1").unwrap());
    }

    #[test]
    fn entry_point_defaults_to_name() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        write_project(&dir, r"{}");
        let project = Project::load(&dir).unwrap();
        assert_eq!(project.entry_point_or_name(), "App");
    }
}
