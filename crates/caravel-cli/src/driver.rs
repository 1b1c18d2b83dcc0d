//! The restore driver.
//!
//! Orchestrates the restore pipeline: manifest discovery, lifecycle hooks,
//! lock classification, per-framework parallel walks, de-duplication and
//! conflict warnings, parallel installs, and the atomic lock write. The
//! install-one-package mode shares the pipeline but synthesises its
//! project, writes no lock file, and returns the installed root instead.

use crate::hooks::{HookRunner, POSTRESTORE, PREPARE, PRERESTORE, ShellHookRunner};
use anyhow::{Context, bail};
use caravel_core::{
    CompatibilityTable, Error, FrameworkProfile, Library, LibraryRange, Version, VersionRange,
};
use caravel_feed::{FeedClient, FeedConfig};
use caravel_lockfile::{LOCK_FILE_NAME, LockClassification, LockFile, LockedLibrary, classify};
use caravel_manifest::Project;
use caravel_resolver::{
    CandidateToken, FrameworkReferenceProvider, GraphItem, GraphNode, ProjectProvider, Provider,
    ProviderGroup, ProviderSet, RemoteProvider, StoreProvider, WalkConfig, WalkContext,
    version_conflicts, walk_dependencies,
};
use caravel_store::{PackageInstaller, PackageStore, sha512_base64_file};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Framework used when a manifest declares none and for the synthesised
/// install-one-package project.
const DEFAULT_FRAMEWORK: &str = "net45";

/// Options for one restore command.
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Package store directory; defaults to `<root>/packages`.
    pub packages_dir: Option<PathBuf>,
    /// Primary feed URLs.
    pub sources: Vec<Url>,
    /// Fallback feed URLs.
    pub fallback_sources: Vec<Url>,
    /// Bypass feed response caches.
    pub no_cache: bool,
    /// Demote feed failures to warnings.
    pub ignore_failed_sources: bool,
    /// Write the new lock file with `locked: true`.
    pub lock: bool,
    /// Ignore an existing locked lock file and re-resolve.
    pub unlock: bool,
    /// Degrade walk and install to sequential execution.
    pub sequential: bool,
    /// Install a single package instead of restoring manifests.
    pub package_id: Option<(String, Option<Version>)>,
}

/// Process-level cancellation flag, observed between restore phases.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// A fresh, uncancelled flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn checkpoint(&self) -> anyhow::Result<()> {
        if self.is_cancelled() {
            bail!("restore cancelled");
        }
        Ok(())
    }
}

/// What a restore did.
#[derive(Debug)]
pub struct RestoreSummary {
    /// Projects restored.
    pub projects: usize,
    /// Packages installed by this run.
    pub installed: usize,
    /// Whether a lock file was written.
    pub lock_written: bool,
    /// Installed root path (install-one-package mode only).
    pub install_root: Option<PathBuf>,
    /// Wall-clock duration.
    pub duration: Duration,
}

/// One resolved library merged across frameworks.
struct ResolvedEntry {
    library: Library,
    group: ProviderGroup,
    token: CandidateToken,
    /// The context whose providers produced (and can materialise) it.
    ctx: Arc<WalkContext>,
    /// Declared dependencies per framework key.
    per_framework_deps: BTreeMap<String, Vec<LibraryRange>>,
}

/// Drives restore commands.
pub struct RestoreDriver {
    options: RestoreOptions,
    hooks: Arc<dyn HookRunner>,
    cancellation: CancellationFlag,
}

impl RestoreDriver {
    /// Create a driver with the default shell hook runner.
    #[must_use]
    pub fn new(options: RestoreOptions) -> Self {
        Self {
            options,
            hooks: Arc::new(ShellHookRunner),
            cancellation: CancellationFlag::new(),
        }
    }

    /// Replace the hook runner.
    #[must_use]
    pub fn with_hook_runner(mut self, hooks: Arc<dyn HookRunner>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Observe an external cancellation flag.
    #[must_use]
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    /// Restore the project(s) under `path`.
    ///
    /// # Errors
    /// Returns error on resolution, install, hook, or lock failures; no
    /// lock file is written on failure.
    pub async fn restore(&self, path: &Path) -> anyhow::Result<RestoreSummary> {
        let start = Instant::now();
        let root = normalise_path(path)?;

        let store_root = self
            .options
            .packages_dir
            .clone()
            .unwrap_or_else(|| root.join("packages"));
        let store = PackageStore::open(&store_root).map_err(Error::from)?;
        let installer = Arc::new(PackageInstaller::new(store.clone()));

        if let Some((id, version)) = self.options.package_id.clone() {
            let installed_root = self
                .install_one_package(&root, &store, &installer, &id, version)
                .await?;
            return Ok(RestoreSummary {
                projects: 0,
                installed: 1,
                lock_written: false,
                install_root: Some(installed_root),
                duration: start.elapsed(),
            });
        }

        let project_dirs = discover_projects(&root)?;
        let mut installed = 0;
        let mut lock_written = false;
        for dir in &project_dirs {
            let project = Project::load(dir).map_err(anyhow::Error::from)?;
            let (project_installed, wrote) =
                self.restore_project(&project, &store, &installer).await?;
            installed += project_installed;
            lock_written |= wrote;
        }

        let summary = RestoreSummary {
            projects: project_dirs.len(),
            installed,
            lock_written,
            install_root: None,
            duration: start.elapsed(),
        };
        info!(
            projects = summary.projects,
            installed = summary.installed,
            ms = summary.duration.as_millis(),
            "restore complete"
        );
        Ok(summary)
    }

    async fn restore_project(
        &self,
        project: &Project,
        store: &PackageStore,
        installer: &Arc<PackageInstaller>,
    ) -> anyhow::Result<(usize, bool)> {
        self.run_hook(project, store, PRERESTORE)?;

        let lock_path = project.dir().join(LOCK_FILE_NAME);
        let existing_lock = if lock_path.is_file() {
            LockFile::read(&lock_path).ok()
        } else {
            None
        };
        // An unreadable file is present-invalid, distinct from absent.
        let classification = if lock_path.is_file() && existing_lock.is_none() {
            LockClassification::Invalid
        } else {
            classify(existing_lock.as_ref(), project)
        };
        debug!(project = %project.name, ?classification, "lock file classified");

        let (installed, wrote) =
            if classification == LockClassification::ValidLocked && !self.options.unlock {
                let lock = existing_lock.clone().unwrap_or_default();
                self.locked_replay(project, store, &lock).await?;
                (0, false)
            } else {
                self.fresh_restore(project, store, installer, classification)
                    .await?
            };

        self.run_hook(project, store, POSTRESTORE)?;
        self.run_hook(project, store, PREPARE)?;
        Ok((installed, wrote))
    }

    /// Fresh resolution: walk each framework profile, install remote
    /// items, write the lock.
    async fn fresh_restore(
        &self,
        project: &Project,
        store: &PackageStore,
        installer: &Arc<PackageInstaller>,
        classification: LockClassification,
    ) -> anyhow::Result<(usize, bool)> {
        let frameworks = self.project_frameworks(project)?;
        let solution_root = project
            .dir()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project.dir().to_path_buf());

        // Walk every profile in parallel (sequential fallback inside the
        // contexts as well).
        let walks = frameworks.iter().map(|framework| {
            let ctx = Arc::new(WalkContext::new(
                framework.clone(),
                self.build_providers(store, Some(&solution_root))?,
                WalkConfig {
                    sequential: self.options.sequential,
                    ..WalkConfig::default()
                },
            ));
            let ranges: Vec<LibraryRange> = project
                .effective_dependencies(framework)
                .into_iter()
                .map(|dep| dep.range)
                .collect();
            Ok((framework.clone(), ctx, ranges))
        });
        let walks: Vec<(FrameworkProfile, Arc<WalkContext>, Vec<LibraryRange>)> =
            walks.collect::<anyhow::Result<_>>()?;

        let walk_futures = walks.iter().map(|(framework, ctx, ranges)| {
            let ctx = Arc::clone(ctx);
            let ranges = ranges.clone();
            async move {
                let nodes =
                    walk_dependencies(Arc::clone(&ctx), ranges, WalkContext::accept_all()).await?;
                Ok::<_, Error>((framework.clone(), ctx, nodes))
            }
        });
        let walked: Vec<(FrameworkProfile, Arc<WalkContext>, Vec<GraphNode>)> =
            if self.options.sequential {
                let mut walked = Vec::with_capacity(walks.len());
                for walk in walk_futures {
                    walked.push(walk.await?);
                }
                walked
            } else {
                futures::future::try_join_all(walk_futures).await?
            };
        self.cancellation.checkpoint()?;

        report_unresolved(&walked)?;

        let entries = merge_items(&walked);
        for (name, versions) in version_conflicts(&collect_all_items(&walked)) {
            let rendered: Vec<String> = versions.iter().map(ToString::to_string).collect();
            warn!(
                library = %name,
                versions = rendered.join(", "),
                "multiple versions selected by different paths"
            );
        }

        // Install the remote-originated set in parallel.
        let shas = self.install_entries(&entries, installer).await?;
        let installed = shas.len();
        self.cancellation.checkpoint()?;

        // A fresh resolution always replaces the lock file; only a locked
        // replay leaves it untouched.
        debug!(?classification, "writing lock after fresh resolution");
        let mut lock = build_lock_file(project, &frameworks, &entries, &shas, store);
        lock.locked = self.options.lock;
        lock.write(&project.dir().join(LOCK_FILE_NAME))
            .map_err(Error::from)?;
        Ok((installed, true))
    }

    /// Lock-pinned replay: every range, declared or transitive, is pinned
    /// to `[version, version]` from the lock; no remote calls; any range
    /// unsatisfiable locally is a hard error, and recorded shas are
    /// verified against the stored archives.
    async fn locked_replay(
        &self,
        project: &Project,
        store: &PackageStore,
        lock: &LockFile,
    ) -> anyhow::Result<()> {
        let frameworks = self.project_frameworks(project)?;
        let solution_root = project
            .dir()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project.dir().to_path_buf());

        let mut pins: caravel_core::AHashMap<String, Vec<Version>> =
            caravel_core::AHashMap::new();
        for key in lock.libraries.keys() {
            let library = LockFile::parse_key(key).map_err(Error::from)?;
            pins.entry(library.name).or_default().push(library.version);
        }

        for framework in &frameworks {
            let ctx = Arc::new(
                WalkContext::new(
                    framework.clone(),
                    self.build_providers(store, Some(&solution_root))?,
                    WalkConfig {
                        sequential: self.options.sequential,
                        ..WalkConfig::default()
                    },
                )
                .with_pins(pins.clone()),
            );
            let ranges: Vec<LibraryRange> = project
                .effective_dependencies(framework)
                .into_iter()
                .map(|dep| dep.range)
                .collect();
            let nodes = walk_dependencies(ctx, ranges, WalkContext::accept_none()).await?;
            for node in &nodes {
                for unresolved in node.collect_unresolved() {
                    bail!(Error::UnresolvedLibrary {
                        target: unresolved.range.to_lock_string(),
                    });
                }
            }
        }
        self.cancellation.checkpoint()?;

        for (key, locked) in &lock.libraries {
            if locked.sha.is_empty() {
                continue;
            }
            let library = LockFile::parse_key(key).map_err(Error::from)?;
            let archive = store
                .package_dir(&library.name, &library.version)
                .join(PackageStore::archive_name(&library.name, &library.version));
            if !archive.is_file() {
                bail!(Error::UnresolvedLibrary {
                    target: key.clone(),
                });
            }
            let actual = sha512_base64_file(&archive).map_err(Error::from)?;
            if actual != locked.sha {
                bail!(Error::ShaMismatch {
                    library: key.clone(),
                    expected: locked.sha.clone(),
                    actual,
                });
            }
        }
        info!(project = %project.name, "lock replay verified");
        Ok(())
    }

    /// Install-one-package mode: a synthesised project, no lock file, the
    /// installed root returned.
    async fn install_one_package(
        &self,
        _root: &Path,
        store: &PackageStore,
        installer: &Arc<PackageInstaller>,
        id: &str,
        version: Option<Version>,
    ) -> anyhow::Result<PathBuf> {
        let framework = FrameworkProfile::parse(DEFAULT_FRAMEWORK).map_err(anyhow::Error::from)?;
        let range = LibraryRange::new(
            id,
            version.map_or_else(VersionRange::any, VersionRange::exact),
        );

        let ctx = Arc::new(WalkContext::new(
            framework.clone(),
            self.build_providers(store, None)?,
            WalkConfig {
                sequential: self.options.sequential,
                ..WalkConfig::default()
            },
        ));
        let nodes = walk_dependencies(
            Arc::clone(&ctx),
            vec![range],
            WalkContext::accept_all(),
        )
        .await?;
        let walked = vec![(framework, ctx, nodes)];
        report_unresolved(&walked)?;

        let entries = merge_items(&walked);
        self.install_entries(&entries, installer).await?;

        let installed = entries
            .values()
            .find(|entry| entry.library.name == id)
            .with_context(|| format!("package '{id}' did not resolve"))?;
        Ok(store.package_dir(&installed.library.name, &installed.library.version))
    }

    /// Materialise and install every remote-originated entry, returning
    /// the recorded sha per library key.
    async fn install_entries(
        &self,
        entries: &BTreeMap<String, ResolvedEntry>,
        installer: &Arc<PackageInstaller>,
    ) -> anyhow::Result<BTreeMap<String, String>> {
        let remote: Vec<&ResolvedEntry> = entries
            .values()
            .filter(|entry| entry.group == ProviderGroup::Remote)
            .collect();
        if remote.is_empty() {
            return Ok(BTreeMap::new());
        }

        let concurrency = if self.options.sequential {
            1
        } else {
            WalkConfig::default().max_concurrency
        };
        let installs = remote.into_iter().map(|entry| {
            let installer = Arc::clone(installer);
            async move {
                let candidate = caravel_resolver::Candidate {
                    library: entry.library.clone(),
                    token: entry.token.clone(),
                };
                let provider = entry
                    .ctx
                    .providers
                    .remote
                    .first()
                    .ok_or_else(|| Error::feed("no remote provider for install", None))?;
                let bytes = provider
                    .materialise(&candidate)
                    .await?
                    .ok_or_else(|| Error::feed("remote candidate yielded no bytes", None))?;
                let outcome = installer
                    .install(&entry.library, bytes, None)
                    .await
                    .map_err(Error::from)?;
                Ok::<_, Error>((entry.library.key(), outcome.sha().to_string()))
            }
        });

        let results: Vec<Result<(String, String), Error>> = stream::iter(installs)
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        // A sha mismatch is fatal per package; other installs continue and
        // the overall restore fails afterwards.
        let mut shas = BTreeMap::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok((key, sha)) => {
                    shas.insert(key, sha);
                }
                Err(e) => failures.push(e.to_string()),
            }
        }
        if !failures.is_empty() {
            bail!("{}", failures.join("\n"));
        }
        Ok(shas)
    }

    fn build_providers(
        &self,
        store: &PackageStore,
        solution_root: Option<&Path>,
    ) -> anyhow::Result<ProviderSet> {
        let compat = Arc::new(CompatibilityTable::new());
        let mut set = ProviderSet::default();
        if let Some(root) = solution_root {
            set.project
                .push(Provider::Project(ProjectProvider::new(vec![
                    root.to_path_buf(),
                ])));
        }
        set.local.push(Provider::Store(StoreProvider::new(
            store.clone(),
            Arc::clone(&compat),
        )));
        set.local
            .push(Provider::Framework(FrameworkReferenceProvider::new()));
        let gac_roots = machine_assembly_roots();
        if !gac_roots.is_empty() {
            set.local
                .push(Provider::Gac(caravel_resolver::GacProvider::new(gac_roots)));
        }

        if !self.options.sources.is_empty() || !self.options.fallback_sources.is_empty() {
            let client = Arc::new(
                FeedClient::new(FeedConfig {
                    no_cache: self.options.no_cache,
                    ..FeedConfig::default()
                })
                .map_err(Error::from)?,
            );
            set.remote.push(Provider::Remote(RemoteProvider::new(
                client,
                self.options.sources.clone(),
                self.options.fallback_sources.clone(),
                self.options.ignore_failed_sources,
                compat,
            )));
        }
        Ok(set)
    }

    fn project_frameworks(&self, project: &Project) -> anyhow::Result<Vec<FrameworkProfile>> {
        let declared: Vec<FrameworkProfile> =
            project.frameworks().into_iter().cloned().collect();
        if declared.is_empty() {
            Ok(vec![
                FrameworkProfile::parse(DEFAULT_FRAMEWORK).map_err(anyhow::Error::from)?,
            ])
        } else {
            Ok(declared)
        }
    }

    fn run_hook(
        &self,
        project: &Project,
        store: &PackageStore,
        name: &str,
    ) -> anyhow::Result<()> {
        let Some(command) = project.scripts.get(name) else {
            return Ok(());
        };
        let env = vec![
            ("CARAVEL_PROJECT".to_string(), project.name.clone()),
            (
                "CARAVEL_PACKAGES".to_string(),
                store.root().display().to_string(),
            ),
        ];
        let output = self
            .hooks
            .run(name, command, project.dir(), &env)
            .with_context(|| format!("spawning {name} hook"))?;
        if !output.success() {
            bail!(Error::Hook {
                hook: name.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

/// Machine-wide assembly cache roots; only Windows hosts have any.
#[cfg(windows)]
fn machine_assembly_roots() -> Vec<PathBuf> {
    std::env::var_os("WINDIR")
        .map(PathBuf::from)
        .map(|windir| {
            vec![
                windir.join("assembly"),
                windir.join("Microsoft.NET").join("assembly"),
            ]
        })
        .unwrap_or_default()
}

#[cfg(not(windows))]
fn machine_assembly_roots() -> Vec<PathBuf> {
    Vec::new()
}

fn normalise_path(path: &Path) -> anyhow::Result<PathBuf> {
    if !path.exists() {
        bail!("restore path does not exist: {}", path.display());
    }
    if path.is_file() {
        Ok(path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    } else {
        Ok(path.to_path_buf())
    }
}

fn discover_projects(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if Project::has_manifest(root) {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| Error::io(root, e))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && Project::has_manifest(path))
        .collect();
    dirs.sort();
    if dirs.is_empty() {
        bail!(Error::ManifestMissing(root.join("project.json")));
    }
    Ok(dirs)
}

/// Surface every unresolved node as an accumulated failure.
fn report_unresolved(
    walked: &[(FrameworkProfile, Arc<WalkContext>, Vec<GraphNode>)],
) -> anyhow::Result<()> {
    let mut messages = Vec::new();
    for (_, _, nodes) in walked {
        for node in nodes {
            for unresolved in node.collect_unresolved() {
                let item = unresolved.item.as_ref();
                let error = match item.and_then(|i| i.matched.suggestion.clone()) {
                    Some(found) => Error::CaseMismatch {
                        requested: unresolved.range.to_lock_string(),
                        found,
                    },
                    None => Error::UnresolvedLibrary {
                        target: unresolved.range.to_lock_string(),
                    },
                };
                let message = error.to_string();
                if !messages.contains(&message) {
                    messages.push(message);
                }
            }
        }
    }
    if messages.is_empty() {
        Ok(())
    } else {
        bail!("{}", messages.join("\n"))
    }
}

fn collect_all_items(
    walked: &[(FrameworkProfile, Arc<WalkContext>, Vec<GraphNode>)],
) -> Vec<Arc<GraphItem>> {
    let mut seen = std::collections::BTreeSet::new();
    let mut items = Vec::new();
    for (_, _, nodes) in walked {
        for node in nodes {
            for item in node.collect_items() {
                if let Some(library) = &item.matched.library
                    && seen.insert(library.key())
                {
                    items.push(item);
                }
            }
        }
    }
    items
}

/// De-duplicate graph items by `(name, version)` across frameworks,
/// keeping per-framework dependency lists for the lock. Framework and GAC
/// matches stay out: they have no package identity to record.
fn merge_items(
    walked: &[(FrameworkProfile, Arc<WalkContext>, Vec<GraphNode>)],
) -> BTreeMap<String, ResolvedEntry> {
    let mut entries: BTreeMap<String, ResolvedEntry> = BTreeMap::new();
    for (framework, ctx, nodes) in walked {
        for node in nodes {
            for item in node.collect_items() {
                let Some(library) = &item.matched.library else {
                    continue;
                };
                if matches!(
                    item.matched.token,
                    CandidateToken::Framework | CandidateToken::Gac { .. }
                ) {
                    continue;
                }
                let entry = entries
                    .entry(library.key())
                    .or_insert_with(|| ResolvedEntry {
                        library: library.clone(),
                        group: item.matched.group,
                        token: item.matched.token.clone(),
                        ctx: Arc::clone(ctx),
                        per_framework_deps: BTreeMap::new(),
                    });
                entry
                    .per_framework_deps
                    .entry(framework.to_string())
                    .or_insert_with(|| item.dependencies.iter().cloned().collect());
            }
        }
    }
    entries
}

/// Assemble the lock file for a successful resolution.
fn build_lock_file(
    project: &Project,
    frameworks: &[FrameworkProfile],
    entries: &BTreeMap<String, ResolvedEntry>,
    shas: &BTreeMap<String, String>,
    store: &PackageStore,
) -> LockFile {
    let mut lock = LockFile::new();

    lock.framework_dependencies.insert(
        String::new(),
        project
            .shared_dependencies
            .iter()
            .map(|dep| dep.range.to_lock_string())
            .collect(),
    );
    for framework in frameworks {
        let deps = project
            .per_framework
            .iter()
            .find(|(fx, _)| fx == framework)
            .map(|(_, deps)| {
                deps.iter()
                    .map(|dep| dep.range.to_lock_string())
                    .collect()
            })
            .unwrap_or_default();
        lock.framework_dependencies
            .insert(framework.to_string(), deps);
    }

    for (key, entry) in entries {
        let sha = shas.get(key).cloned().unwrap_or_else(|| {
            let archive = store
                .package_dir(&entry.library.name, &entry.library.version)
                .join(PackageStore::archive_name(
                    &entry.library.name,
                    &entry.library.version,
                ));
            if archive.is_file() {
                sha512_base64_file(&archive).unwrap_or_default()
            } else {
                String::new()
            }
        });

        let mut dependency_sets = BTreeMap::new();
        for (fx, deps) in &entry.per_framework_deps {
            if deps.is_empty() {
                continue;
            }
            let set: BTreeMap<String, String> = deps
                .iter()
                .map(|range| {
                    (
                        range.name.clone(),
                        range
                            .range
                            .as_ref()
                            .map_or_else(|| "*".to_string(), ToString::to_string),
                    )
                })
                .collect();
            dependency_sets.insert(fx.clone(), set);
        }

        let files = store
            .read_package(&entry.library.name, &entry.library.version)
            .map(|package| {
                package
                    .files
                    .iter()
                    .map(|f| f.display().to_string())
                    .collect()
            })
            .unwrap_or_default();

        lock.insert_library(
            &entry.library,
            LockedLibrary {
                sha,
                dependency_sets,
                framework_assemblies: BTreeMap::new(),
                package_assembly_references: BTreeMap::new(),
                files,
            },
        );
    }

    lock
}
