//! Graph node and item types.

use caravel_core::{AHashMap, Library, LibraryRange, Version};
use smallvec::SmallVec;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Which provider group produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderGroup {
    /// Project-source provider.
    Project,
    /// Local providers (package store, framework references, GAC).
    Local,
    /// Remote feed providers.
    Remote,
    /// The unresolved sentinel.
    Unresolved,
}

impl ProviderGroup {
    /// Display name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Unresolved => "unresolved",
        }
    }
}

/// Provider-specific handle needed to materialise or inspect a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateToken {
    /// A sibling source project.
    Project {
        /// Project directory.
        dir: PathBuf,
    },
    /// An installed package in the local store.
    Store {
        /// Package directory.
        dir: PathBuf,
    },
    /// A framework reference assembly.
    Framework,
    /// A machine-wide assembly cache entry.
    Gac {
        /// Assembly path.
        path: PathBuf,
    },
    /// A remote feed candidate.
    Remote {
        /// Feed base URL.
        feed: Url,
    },
    /// No backing artifact (unresolved sentinel).
    None,
}

/// A resolved match: the concrete library (absent for the unresolved
/// sentinel), the group that produced it, and its provider token.
#[derive(Debug, Clone)]
pub struct CandidateMatch {
    /// The matched library; `None` when unresolved.
    pub library: Option<Library>,
    /// Producing group.
    pub group: ProviderGroup,
    /// Provider-specific token.
    pub token: CandidateToken,
    /// For case-mismatched resolutions, the provider's spelling.
    pub suggestion: Option<String>,
}

/// A candidate paired with its declared dependency ranges for the walk's
/// target framework.
#[derive(Debug, Clone)]
pub struct GraphItem {
    /// The match.
    pub matched: CandidateMatch,
    /// Declared dependencies, in declaration order.
    pub dependencies: SmallVec<[LibraryRange; 4]>,
}

impl GraphItem {
    /// Whether this item carries a concrete library.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.matched.library.is_some()
    }
}

/// One node of the walked graph: the requested range, the resolved item
/// (`None` only while pending), and the child nodes in declaration order.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// Requested range.
    pub range: LibraryRange,
    /// Resolved item.
    pub item: Option<Arc<GraphItem>>,
    /// Children, one per declared dependency.
    pub deps: Vec<GraphNode>,
}

impl GraphNode {
    /// Depth-first traversal over every node.
    pub fn for_each<'a>(&'a self, f: &mut impl FnMut(&'a GraphNode)) {
        f(self);
        for dep in &self.deps {
            dep.for_each(f);
        }
    }

    /// Every distinct resolved item in this subtree, de-duplicated by
    /// `(name, version)` with first-seen order preserved.
    #[must_use]
    pub fn collect_items(&self) -> Vec<Arc<GraphItem>> {
        let mut seen: AHashMap<String, ()> = AHashMap::new();
        let mut items = Vec::new();
        self.for_each(&mut |node| {
            if let Some(item) = &node.item
                && let Some(library) = &item.matched.library
                && seen.insert(library.key(), ()).is_none()
            {
                items.push(Arc::clone(item));
            }
        });
        items
    }

    /// Every unresolved node in this subtree.
    #[must_use]
    pub fn collect_unresolved(&self) -> Vec<&GraphNode> {
        let mut out = Vec::new();
        self.for_each(&mut |node| {
            if node.item.as_ref().is_some_and(|item| !item.is_resolved()) {
                out.push(node);
            }
        });
        out
    }
}

/// Libraries for which distinct versions were selected by different paths.
/// The driver reports these as warnings, never errors.
#[must_use]
pub fn version_conflicts(items: &[Arc<GraphItem>]) -> Vec<(String, Vec<Version>)> {
    let mut by_name: AHashMap<&str, Vec<&Version>> = AHashMap::new();
    for item in items {
        if let Some(library) = &item.matched.library {
            by_name
                .entry(library.name.as_str())
                .or_default()
                .push(&library.version);
        }
    }
    let mut conflicts: Vec<(String, Vec<Version>)> = by_name
        .into_iter()
        .filter(|(_, versions)| versions.len() > 1)
        .map(|(name, versions)| {
            let mut versions: Vec<Version> = versions.into_iter().cloned().collect();
            versions.sort();
            (name.to_string(), versions)
        })
        .collect();
    conflicts.sort_by(|a, b| a.0.cmp(&b.0));
    conflicts
}
