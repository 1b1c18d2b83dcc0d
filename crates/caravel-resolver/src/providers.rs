//! Candidate providers.
//!
//! Providers are a closed tagged variant with a shared operation table:
//! `find` lists candidate libraries for a range, `dependencies` reports a
//! candidate's declared ranges for a framework, and `materialise` produces
//! archive bytes for candidates that have any (only remote ones do). New
//! providers are added by extending the variant.

use crate::graph::{CandidateMatch, CandidateToken, GraphItem, ProviderGroup};
use caravel_core::{
    AHashMap, AHashSet, CompatibilityTable, Error, FrameworkProfile, Library, LibraryRange, Mutex,
    Result, Version,
};
use caravel_feed::FeedClient;
use caravel_manifest::Project;
use caravel_store::{PackageMetadata, PackageStore};
use dashmap::DashMap;
use smallvec::smallvec;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// A concrete `(name, version)` candidate with its provider token.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The candidate library. The name carries the provider's spelling,
    /// which the walker checks against the request.
    pub library: Library,
    /// Provider-specific handle.
    pub token: CandidateToken,
}

/// The provider variant. See the module docs for the operation table.
#[derive(Debug)]
pub enum Provider {
    /// Sibling source projects.
    Project(ProjectProvider),
    /// The local package store.
    Store(StoreProvider),
    /// Installed framework reference assemblies.
    Framework(FrameworkReferenceProvider),
    /// Machine-wide assembly caches.
    Gac(GacProvider),
    /// Remote package feeds.
    Remote(RemoteProvider),
    /// The always-matching unresolved sentinel.
    Unresolved(UnresolvedProvider),
}

impl Provider {
    /// List candidates satisfying `range` for `framework`.
    ///
    /// # Errors
    /// Propagates provider I/O failures; a feed failure is already demoted
    /// to a warning here when `ignore_failed_sources` is set.
    pub async fn find(
        &self,
        range: &LibraryRange,
        framework: &FrameworkProfile,
    ) -> Result<Vec<Candidate>> {
        match self {
            Self::Project(p) => p.find(range),
            Self::Store(p) => p.find(range),
            Self::Framework(p) => Ok(p.find(range, framework)),
            Self::Gac(p) => Ok(p.find(range, framework)),
            Self::Remote(p) => p.find(range).await,
            Self::Unresolved(_) => Ok(Vec::new()),
        }
    }

    /// The candidate's declared dependency ranges for `framework`.
    ///
    /// # Errors
    /// Propagates metadata read failures.
    pub async fn dependencies(
        &self,
        candidate: &Candidate,
        framework: &FrameworkProfile,
    ) -> Result<Vec<LibraryRange>> {
        match self {
            Self::Project(p) => p.dependencies(candidate, framework),
            Self::Store(p) => p.dependencies(candidate, framework),
            Self::Framework(_) | Self::Gac(_) | Self::Unresolved(_) => Ok(Vec::new()),
            Self::Remote(p) => p.dependencies(candidate, framework).await,
        }
    }

    /// Archive bytes for the candidate, when the provider has any to offer.
    /// Project, store, framework, and GAC candidates are already local.
    ///
    /// # Errors
    /// Propagates download failures.
    pub async fn materialise(&self, candidate: &Candidate) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Remote(p) => Ok(Some(p.fetch(candidate).await?)),
            _ => Ok(None),
        }
    }
}

/// Providers composed into the three ordered groups the walker consults.
#[derive(Debug, Default)]
pub struct ProviderSet {
    /// Project-source providers; consulted first, at most one match by name.
    pub project: Vec<Provider>,
    /// Local providers, queried in parallel.
    pub local: Vec<Provider>,
    /// Remote providers, queried in parallel and only when permitted.
    pub remote: Vec<Provider>,
}

// ---------------------------------------------------------------------------
// Project-source provider
// ---------------------------------------------------------------------------

/// Resolves ranges against sibling project directories. A project reference
/// trumps version constraints: the manifest's version is accepted whatever
/// the range says.
#[derive(Debug)]
pub struct ProjectProvider {
    solution_roots: Vec<PathBuf>,
    cache: Mutex<AHashMap<PathBuf, Arc<Project>>>,
}

impl ProjectProvider {
    /// Create a provider over one or more solution roots.
    #[must_use]
    pub fn new(solution_roots: Vec<PathBuf>) -> Self {
        Self {
            solution_roots,
            cache: Mutex::new(AHashMap::new()),
        }
    }

    fn load(&self, dir: &Path) -> Result<Arc<Project>> {
        if let Some(project) = self.cache.lock().get(dir) {
            return Ok(Arc::clone(project));
        }
        let project = Arc::new(Project::load(dir)?);
        self.cache
            .lock()
            .insert(dir.to_path_buf(), Arc::clone(&project));
        Ok(project)
    }

    fn find(&self, range: &LibraryRange) -> Result<Vec<Candidate>> {
        if range.is_framework_reference {
            return Ok(Vec::new());
        }
        for root in &self.solution_roots {
            let exact = root.join(&range.name);
            let dir = if Project::has_manifest(&exact) {
                Some(exact)
            } else {
                find_dir_ignore_case(root, &range.name).filter(|d| Project::has_manifest(d))
            };
            if let Some(dir) = dir {
                let project = self.load(&dir)?;
                debug!(project = %project.name, version = %project.version, "project reference found");
                return Ok(vec![Candidate {
                    library: Library::new(project.name.clone(), project.version.clone()),
                    token: CandidateToken::Project { dir },
                }]);
            }
        }
        Ok(Vec::new())
    }

    fn dependencies(
        &self,
        candidate: &Candidate,
        framework: &FrameworkProfile,
    ) -> Result<Vec<LibraryRange>> {
        let CandidateToken::Project { dir } = &candidate.token else {
            return Ok(Vec::new());
        };
        let project = self.load(dir)?;
        Ok(project
            .effective_dependencies(framework)
            .into_iter()
            .map(|dep| dep.range)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Local package store provider
// ---------------------------------------------------------------------------

/// Resolves ranges against the installed package store.
#[derive(Debug)]
pub struct StoreProvider {
    store: PackageStore,
    compat: Arc<CompatibilityTable>,
}

impl StoreProvider {
    /// Create a provider over `store`.
    #[must_use]
    pub fn new(store: PackageStore, compat: Arc<CompatibilityTable>) -> Self {
        Self { store, compat }
    }

    fn find(&self, range: &LibraryRange) -> Result<Vec<Candidate>> {
        if range.is_framework_reference {
            return Ok(Vec::new());
        }
        let Some(name_on_disk) = self.store.find_name_ignore_case(&range.name) else {
            return Ok(Vec::new());
        };
        let candidates = self
            .store
            .versions(&name_on_disk)
            .into_iter()
            .filter(|v| range.satisfies(v))
            .map(|version| {
                let dir = self.store.package_dir(&name_on_disk, &version);
                Candidate {
                    library: Library::new(name_on_disk.clone(), version),
                    token: CandidateToken::Store { dir },
                }
            })
            .collect();
        Ok(candidates)
    }

    fn dependencies(
        &self,
        candidate: &Candidate,
        framework: &FrameworkProfile,
    ) -> Result<Vec<LibraryRange>> {
        let package = self
            .store
            .read_package(&candidate.library.name, &candidate.library.version)?;
        Ok(package
            .dependencies_for(framework, &self.compat)?
            .into_iter()
            .map(|dep| dep.range)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Framework reference provider
// ---------------------------------------------------------------------------

/// Resolves framework references against an installed framework's
/// reference-assembly set, keyed by the consumer's target framework.
/// Version ranges are bypassed.
#[derive(Debug, Default)]
pub struct FrameworkReferenceProvider {
    assemblies: AHashMap<FrameworkProfile, AHashSet<String>>,
}

impl FrameworkReferenceProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the reference-assembly set for `framework`.
    pub fn register(
        &mut self,
        framework: FrameworkProfile,
        assemblies: impl IntoIterator<Item = String>,
    ) {
        self.assemblies
            .entry(framework)
            .or_default()
            .extend(assemblies);
    }

    /// The full baseline reference set for `framework`, used by the
    /// compiler to seed every compilation.
    #[must_use]
    pub fn baseline(&self, framework: &FrameworkProfile) -> Vec<Library> {
        let Some(set) = self.assemblies.get(framework) else {
            return Vec::new();
        };
        let mut names: Vec<&String> = set.iter().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| Library::new(name.clone(), framework.version().clone()))
            .collect()
    }

    /// Name-based lookup used by the compiler's reference fallback.
    #[must_use]
    pub fn resolve_name(&self, name: &str, framework: &FrameworkProfile) -> Option<Library> {
        let set = self.assemblies.get(framework)?;
        if set.contains(name) {
            return Some(Library::new(name, framework.version().clone()));
        }
        None
    }

    fn find(&self, range: &LibraryRange, framework: &FrameworkProfile) -> Vec<Candidate> {
        if !range.is_framework_reference {
            return Vec::new();
        }
        let Some(set) = self.assemblies.get(framework) else {
            return Vec::new();
        };
        let spelling = if set.contains(&range.name) {
            Some(range.name.clone())
        } else {
            set.iter()
                .find(|a| a.eq_ignore_ascii_case(&range.name))
                .cloned()
        };
        spelling
            .map(|name| {
                vec![Candidate {
                    library: Library::new(name, framework.version().clone()),
                    token: CandidateToken::Framework,
                }]
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// GAC provider
// ---------------------------------------------------------------------------

/// Probes machine-wide assembly caches. Mirrors the framework-reference
/// provider but walks versioned directories under each cache root.
#[derive(Debug, Default)]
pub struct GacProvider {
    roots: Vec<PathBuf>,
}

impl GacProvider {
    /// Create a provider over the given cache roots.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    fn find(&self, range: &LibraryRange, _framework: &FrameworkProfile) -> Vec<Candidate> {
        if !range.is_framework_reference {
            return Vec::new();
        }
        for root in &self.roots {
            let dir = root.join(&range.name);
            if !dir.is_dir() {
                continue;
            }
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            let mut best: Option<(Version, PathBuf)> = None;
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else {
                    continue;
                };
                let Ok(version) = Version::parse(name) else {
                    continue;
                };
                let assembly = entry.path().join(format!("{}.dll", range.name));
                if !assembly.is_file() {
                    continue;
                }
                if best.as_ref().is_none_or(|(v, _)| version > *v) {
                    best = Some((version, assembly));
                }
            }
            if let Some((version, path)) = best {
                return vec![Candidate {
                    library: Library::new(range.name.clone(), version),
                    token: CandidateToken::Gac { path },
                }];
            }
        }
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// Remote feed provider
// ---------------------------------------------------------------------------

/// Resolves ranges against HTTP feeds, with fallback feeds consulted only
/// when every primary yields nothing. Downloaded archives are cached for
/// the run so dependency inspection and materialisation share one fetch.
#[derive(Debug)]
pub struct RemoteProvider {
    client: Arc<FeedClient>,
    feeds: Vec<Url>,
    fallback_feeds: Vec<Url>,
    ignore_failed_sources: bool,
    compat: Arc<CompatibilityTable>,
    downloads: DashMap<String, Arc<Vec<u8>>>,
}

impl RemoteProvider {
    /// Create a provider over primary and fallback feeds.
    #[must_use]
    pub fn new(
        client: Arc<FeedClient>,
        feeds: Vec<Url>,
        fallback_feeds: Vec<Url>,
        ignore_failed_sources: bool,
        compat: Arc<CompatibilityTable>,
    ) -> Self {
        Self {
            client,
            feeds,
            fallback_feeds,
            ignore_failed_sources,
            compat,
            downloads: DashMap::new(),
        }
    }

    async fn find(&self, range: &LibraryRange) -> Result<Vec<Candidate>> {
        if range.is_framework_reference {
            return Ok(Vec::new());
        }
        let primary = self.probe_feeds(&self.feeds, range).await?;
        if !primary.is_empty() {
            return Ok(primary);
        }
        self.probe_feeds(&self.fallback_feeds, range).await
    }

    async fn probe_feeds(&self, feeds: &[Url], range: &LibraryRange) -> Result<Vec<Candidate>> {
        let probes = feeds.iter().map(|feed| {
            let feed = feed.clone();
            async move {
                let result = self.client.list_versions(&feed, &range.name).await;
                (feed, result)
            }
        });
        let mut candidates = Vec::new();
        for (feed, result) in futures::future::join_all(probes).await {
            match result {
                Ok(Some(versions)) => {
                    candidates.extend(
                        versions
                            .iter()
                            .filter(|v| range.satisfies(v))
                            .map(|version| Candidate {
                                library: Library::new(range.name.clone(), version.clone()),
                                token: CandidateToken::Remote { feed: feed.clone() },
                            }),
                    );
                }
                Ok(None) => {}
                Err(e) if self.ignore_failed_sources => {
                    warn!(feed = %feed, "ignoring failed source: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(candidates)
    }

    /// Download (or reuse) the candidate's archive bytes.
    async fn fetch(&self, candidate: &Candidate) -> Result<Vec<u8>> {
        let key = candidate.library.key();
        if let Some(bytes) = self.downloads.get(&key) {
            return Ok(bytes.as_ref().clone());
        }
        let CandidateToken::Remote { feed } = &candidate.token else {
            return Err(Error::feed(
                format!("candidate {key} has no remote token"),
                None,
            ));
        };
        let bytes = self.client.download(feed, &candidate.library).await?;
        let shared = Arc::new(bytes);
        self.downloads.insert(key, Arc::clone(&shared));
        Ok(shared.as_ref().clone())
    }

    async fn dependencies(
        &self,
        candidate: &Candidate,
        framework: &FrameworkProfile,
    ) -> Result<Vec<LibraryRange>> {
        let bytes = self.fetch(candidate).await?;
        let metadata = PackageMetadata::from_archive_bytes(&bytes)?;
        Ok(metadata
            .dependencies_for(framework, &self.compat)?
            .into_iter()
            .map(|dep| dep.range)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Unresolved sentinel
// ---------------------------------------------------------------------------

/// Always matches, emitting an item with no library. Its items signal
/// resolution failure downstream.
#[derive(Debug, Default)]
pub struct UnresolvedProvider;

impl UnresolvedProvider {
    /// The unresolved item for `range`.
    #[must_use]
    pub fn item(suggestion: Option<String>) -> GraphItem {
        GraphItem {
            matched: CandidateMatch {
                library: None,
                group: ProviderGroup::Unresolved,
                token: CandidateToken::None,
                suggestion,
            },
            dependencies: smallvec![],
        }
    }
}

fn find_dir_ignore_case(root: &Path, name: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(root).ok()?;
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        if let Some(s) = file_name.to_str()
            && s.eq_ignore_ascii_case(name)
            && entry.path().is_dir()
        {
            return Some(entry.path());
        }
    }
    None
}
