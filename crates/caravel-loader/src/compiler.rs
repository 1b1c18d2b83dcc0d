//! The source-project compiler.
//!
//! Locates a manifest at `<solution>/<assembly-name>/`, registers file
//! watches, parses the project's sources, resolves reference images for
//! every declared dependency in parallel, and compiles through the backend.
//! Successful compilations are cached as `(module, reference image)` under
//! the assembly name: at most one loaded module per name within a
//! container's lifetime, and failed compilations never populate the cache.

use crate::backend::{CompileBackend, CompileUnit, Reference};
use crate::error::{LoaderError, Result};
use crate::source::{Diagnostic, SOURCE_EXTENSION, parse_source};
use crate::watch::FileWatcher;
use caravel_core::{AHashSet, FrameworkProfile, Version};
use caravel_manifest::Project;
use caravel_resolver::FrameworkReferenceProvider;
use caravel_store::PackageStore;
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The container key the source-project loader registers under.
pub const SOURCE_PROJECT_LOADER_KEY: &str = "source-project";

/// Exported metadata of a compiled module, used as a compilation reference
/// by dependents.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    /// Module name.
    pub name: String,
    /// Exported names.
    pub exports: Vec<String>,
}

/// A fully loaded binary module.
#[derive(Debug)]
pub struct LoadedModule {
    /// Assembly name.
    pub name: String,
    /// Assembly version.
    pub version: Version,
    /// The binary image.
    pub image: Vec<u8>,
    /// On-disk image location when compiling to disk.
    pub image_path: Option<PathBuf>,
    /// Debug-symbol location.
    pub symbols_path: Option<PathBuf>,
    /// Exported names.
    pub exports: Vec<String>,
}

/// Where compilation output lands.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// In-memory image; symbols written under `<solution>/.symbols/`.
    InMemory,
    /// `<out>/<name>.dll` and `<out>/<name>.pdb`, loaded by path.
    Disk {
        /// Output directory.
        out_dir: PathBuf,
    },
}

/// Asks the runtime for an already-loadable module's on-disk location.
pub trait RuntimeImageResolver: Send + Sync {
    /// The module's path, when the runtime can load it by name.
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Runtime resolver backed by the package store: the highest installed
/// version's `lib/<framework>/<name>.dll` (or `lib/<name>.dll`).
#[derive(Debug)]
pub struct StoreImageResolver {
    store: PackageStore,
    framework: FrameworkProfile,
}

impl StoreImageResolver {
    /// Create a resolver over `store` for `framework`.
    #[must_use]
    pub fn new(store: PackageStore, framework: FrameworkProfile) -> Self {
        Self { store, framework }
    }
}

impl RuntimeImageResolver for StoreImageResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let version = self.store.versions(name).into_iter().next_back()?;
        let dir = self.store.package_dir(name, &version);
        let by_framework = dir
            .join("lib")
            .join(self.framework.to_string())
            .join(format!("{name}.dll"));
        if by_framework.is_file() {
            return Some(by_framework);
        }
        let flat = dir.join("lib").join(format!("{name}.dll"));
        flat.is_file().then_some(flat)
    }
}

/// Compiler configuration.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Solution root containing the project directories.
    pub solution_root: PathBuf,
    /// Target framework.
    pub framework: FrameworkProfile,
    /// Output target.
    pub output: OutputTarget,
    /// Build configuration name.
    pub configuration: String,
}

struct CompiledEntry {
    module: Arc<LoadedModule>,
    reference_image: ReferenceImage,
}

/// The source-project loader.
pub struct ProjectCompiler {
    options: CompilerOptions,
    backend: Arc<dyn CompileBackend>,
    watcher: Arc<dyn FileWatcher>,
    runtime: Arc<dyn RuntimeImageResolver>,
    framework_refs: Arc<FrameworkReferenceProvider>,
    cache: DashMap<String, Arc<CompiledEntry>>,
}

impl ProjectCompiler {
    /// Create a compiler.
    #[must_use]
    pub fn new(
        options: CompilerOptions,
        backend: Arc<dyn CompileBackend>,
        watcher: Arc<dyn FileWatcher>,
        runtime: Arc<dyn RuntimeImageResolver>,
        framework_refs: Arc<FrameworkReferenceProvider>,
    ) -> Self {
        Self {
            options,
            backend,
            watcher,
            runtime,
            framework_refs,
            cache: DashMap::new(),
        }
    }

    /// Load `assembly_name`, compiling it on first reference. Returns
    /// `None` when no sibling project directory carries a manifest.
    ///
    /// # Errors
    /// Returns error when parsing, reference resolution, or compilation
    /// fails. Failures are not cached.
    pub fn load<'a>(
        &'a self,
        assembly_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Arc<LoadedModule>>>> {
        self.load_inner(assembly_name.to_string(), Vec::new())
    }

    /// Cycle detection follows the load chain: a name reappearing in its
    /// own ancestry is a cyclic project reference, while concurrent loads
    /// of a shared dependency are fine.
    fn load_inner(
        &self,
        assembly_name: String,
        chain: Vec<String>,
    ) -> BoxFuture<'_, Result<Option<Arc<LoadedModule>>>> {
        async move {
            let dir = self.options.solution_root.join(&assembly_name);
            if !Project::has_manifest(&dir) {
                return Ok(None);
            }

            if let Some(entry) = self.cache.get(&assembly_name) {
                return Ok(Some(Arc::clone(&entry.module)));
            }

            if chain.contains(&assembly_name) {
                return Err(LoaderError::Registry(format!(
                    "cyclic project reference '{assembly_name}'"
                )));
            }
            let mut chain = chain;
            chain.push(assembly_name.clone());

            self.compile_project(&assembly_name, dir, &chain)
                .await
                .map(Some)
        }
        .boxed()
    }

    async fn compile_project(
        &self,
        assembly_name: &str,
        dir: PathBuf,
        chain: &[String],
    ) -> Result<Arc<LoadedModule>> {
        let project = Project::load(&dir)?;
        self.register_watches(&project);

        // Parse every source file (code, shared, and preprocess sets, each
        // file once), accumulating diagnostics.
        let mut sources = Vec::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut seen: AHashSet<&std::path::Path> = AHashSet::new();
        for path in project
            .source_files
            .iter()
            .chain(&project.shared_files)
            .chain(&project.preprocess_files)
        {
            if !seen.insert(path.as_path()) {
                continue;
            }
            let text = fs::read_to_string(path).map_err(|e| LoaderError::io(path, e))?;
            let (parsed, mut file_diagnostics) = parse_source(path, &text);
            diagnostics.append(&mut file_diagnostics);
            sources.push(parsed);
        }
        if !diagnostics.is_empty() {
            return Err(LoaderError::Compile {
                assembly: assembly_name.to_string(),
                diagnostics,
            });
        }

        let references = self.resolve_references(&project, chain).await?;

        let options = match &project.compilation_options {
            Some(value) => Some(caravel_core::to_json(value)?),
            None => None,
        };
        let unit = CompileUnit {
            name: project.name.clone(),
            version: project.version.clone(),
            configuration: self.options.configuration.clone(),
            options,
            sources,
            references,
        };
        let output = self
            .backend
            .compile(&unit)
            .map_err(|diagnostics| LoaderError::Compile {
                assembly: assembly_name.to_string(),
                diagnostics,
            })?;

        let exports: Vec<String> = unit
            .sources
            .iter()
            .flat_map(|s| s.exports.iter().cloned())
            .collect();

        let (image_path, symbols_path) = self.emit(&project, &output.image, &output.symbols)?;

        let module = Arc::new(LoadedModule {
            name: project.name.clone(),
            version: project.version.clone(),
            image: output.image,
            image_path,
            symbols_path,
            exports: exports.clone(),
        });

        let entry = Arc::new(CompiledEntry {
            module: Arc::clone(&module),
            reference_image: ReferenceImage {
                name: project.name.clone(),
                exports,
            },
        });
        // If another task raced us here, the first entry wins.
        let winner = self
            .cache
            .entry(assembly_name.to_string())
            .or_insert(entry);
        info!(assembly = assembly_name, "module loaded");
        Ok(Arc::clone(&winner.module))
    }

    /// Resolve reference images for each declared dependency, in parallel:
    /// the compiled-module cache first, then a sibling project (compiled on
    /// demand), then the runtime's on-disk module, then a name-based
    /// framework reference.
    async fn resolve_references(
        &self,
        project: &Project,
        chain: &[String],
    ) -> Result<Vec<Reference>> {
        let deps = project.effective_dependencies(&self.options.framework);
        let lookups = deps.iter().map(|dep| {
            let name = dep.range.name.clone();
            let is_framework = dep.range.is_framework_reference;
            async move {
                if is_framework {
                    return self.framework_reference(&project.name, &name);
                }
                if let Some(entry) = self.cache.get(&name) {
                    return Ok(Reference::Image(entry.reference_image.clone()));
                }
                if let Some(module) = self.load_inner(name.clone(), chain.to_vec()).await? {
                    return Ok(Reference::Image(ReferenceImage {
                        name: module.name.clone(),
                        exports: module.exports.clone(),
                    }));
                }
                if let Some(path) = self.runtime.resolve(&name) {
                    return Ok(Reference::Path { name, path });
                }
                self.framework_reference(&project.name, &name)
            }
        });
        let mut references = futures::future::try_join_all(lookups).await?;

        // The framework's baseline reference set rounds out the unit.
        let referenced: AHashSet<String> =
            references.iter().map(|r| r.name().to_string()).collect();
        for library in self.framework_refs.baseline(&self.options.framework) {
            if !referenced.contains(&library.name) {
                references.push(Reference::Name {
                    name: library.name,
                    version: library.version,
                });
            }
        }
        Ok(references)
    }

    fn framework_reference(&self, assembly: &str, name: &str) -> Result<Reference> {
        self.framework_refs
            .resolve_name(name, &self.options.framework)
            .map(|library| Reference::Name {
                name: library.name,
                version: library.version,
            })
            .ok_or_else(|| LoaderError::UnresolvedReference {
                assembly: assembly.to_string(),
                reference: name.to_string(),
            })
    }

    fn register_watches(&self, project: &Project) {
        let dir = project.dir();
        if let Err(e) = self.watcher.watch_dir(dir, true, SOURCE_EXTENSION) {
            warn!(dir = %dir.display(), "file watch registration failed: {e}");
        }
        if let Err(e) = self.watcher.watch_file(&project.project_file_path) {
            warn!(
                path = %project.project_file_path.display(),
                "file watch registration failed: {e}"
            );
        }
    }

    /// Write compilation output per the configured target.
    fn emit(
        &self,
        project: &Project,
        image: &[u8],
        symbols: &[u8],
    ) -> Result<(Option<PathBuf>, Option<PathBuf>)> {
        match &self.options.output {
            OutputTarget::Disk { out_dir } => {
                fs::create_dir_all(out_dir).map_err(|e| LoaderError::io(out_dir, e))?;
                let image_path = out_dir.join(format!("{}.dll", project.name));
                let symbols_path = out_dir.join(format!("{}.pdb", project.name));
                fs::write(&image_path, image).map_err(|e| LoaderError::io(&image_path, e))?;
                fs::write(&symbols_path, symbols)
                    .map_err(|e| LoaderError::io(&symbols_path, e))?;
                debug!(path = %image_path.display(), "image written");
                Ok((Some(image_path), Some(symbols_path)))
            }
            OutputTarget::InMemory => {
                let symbols_dir = self.options.solution_root.join(".symbols");
                fs::create_dir_all(&symbols_dir)
                    .map_err(|e| LoaderError::io(&symbols_dir, e))?;
                let symbols_path = symbols_dir.join(format!("{}.pdb", project.name));
                fs::write(&symbols_path, symbols)
                    .map_err(|e| LoaderError::io(&symbols_path, e))?;
                Ok((None, Some(symbols_path)))
            }
        }
    }
}
