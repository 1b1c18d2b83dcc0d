//! The parallel graph walker.

use crate::graph::{CandidateMatch, GraphItem, GraphNode, ProviderGroup};
use crate::providers::{Candidate, Provider, ProviderSet, UnresolvedProvider};
use caravel_core::{AHashMap, FrameworkProfile, LibraryRange, Mutex, Result, Version, VersionRange};
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, trace};

/// Predicate deciding whether a range may be resolved remotely.
pub type AcceptPredicate = Arc<dyn Fn(&LibraryRange) -> bool + Send + Sync>;

/// Walker configuration.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Sibling fan-out bound.
    pub max_concurrency: usize,
    /// Degrade to sequential expansion (hosts where parallel execution is
    /// known-unsafe).
    pub sequential: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_concurrency: std::thread::available_parallelism().map_or(4, usize::from),
            sequential: false,
        }
    }
}

/// Shared state for one walk: the target framework, the provider groups,
/// and the memoisation cache. The context is per-framework and the
/// resolving group is recorded on the item, so the memo key reduces to the
/// range's canonical form.
pub struct WalkContext {
    /// Target framework for this walk.
    pub framework: FrameworkProfile,
    /// Provider groups.
    pub providers: ProviderSet,
    config: WalkConfig,
    memo: Mutex<AHashMap<String, GraphNode>>,
    /// Lock-derived pins: every walked range whose name appears here is
    /// replaced by `[version, version]` before resolution.
    pins: AHashMap<String, Vec<Version>>,
}

impl WalkContext {
    /// Create a context.
    #[must_use]
    pub fn new(framework: FrameworkProfile, providers: ProviderSet, config: WalkConfig) -> Self {
        Self {
            framework,
            providers,
            config,
            memo: Mutex::new(AHashMap::new()),
            pins: AHashMap::new(),
        }
    }

    /// Pin ranges to locked versions (lock-file replay mode).
    #[must_use]
    pub fn with_pins(mut self, pins: AHashMap<String, Vec<Version>>) -> Self {
        self.pins = pins;
        self
    }

    /// Apply the pin table: prefer a pinned version the range accepts,
    /// falling back to the highest recorded one.
    fn apply_pin(&self, range: LibraryRange) -> LibraryRange {
        if range.is_framework_reference {
            return range;
        }
        let Some(versions) = self.pins.get(&range.name) else {
            return range;
        };
        let pinned = versions
            .iter()
            .find(|v| range.satisfies(v))
            .or_else(|| versions.iter().max())
            .cloned();
        match pinned {
            Some(version) => LibraryRange::new(range.name, VersionRange::exact(version)),
            None => range,
        }
    }

    /// An accept predicate permitting every range (fresh restore).
    #[must_use]
    pub fn accept_all() -> AcceptPredicate {
        Arc::new(|_| true)
    }

    /// An accept predicate permitting nothing (lock-pinned replay).
    #[must_use]
    pub fn accept_none() -> AcceptPredicate {
        Arc::new(|_| false)
    }
}

/// Walk every root range, returning one node per range in declaration
/// order.
///
/// # Errors
/// Propagates provider failures; unresolved ranges are recorded in the
/// returned nodes, not raised here.
pub async fn walk_dependencies(
    ctx: Arc<WalkContext>,
    ranges: Vec<LibraryRange>,
    accept: AcceptPredicate,
) -> Result<Vec<GraphNode>> {
    if ctx.config.sequential {
        let mut nodes = Vec::with_capacity(ranges.len());
        for range in ranges {
            nodes.push(create_graph_node(Arc::clone(&ctx), range, Arc::clone(&accept)).await?);
        }
        return Ok(nodes);
    }
    stream::iter(
        ranges
            .into_iter()
            .map(|range| create_graph_node(Arc::clone(&ctx), range, Arc::clone(&accept))),
    )
    .buffered(ctx.config.max_concurrency.max(1))
    .try_collect()
    .await
}

/// Expand one range into a graph node, recursing over the resolved item's
/// declared dependencies. Children are walked concurrently and their
/// results appended in declaration order; identical sub-ranges are walked
/// once via the context's memo.
pub fn create_graph_node(
    ctx: Arc<WalkContext>,
    range: LibraryRange,
    accept: AcceptPredicate,
) -> BoxFuture<'static, Result<GraphNode>> {
    async move {
        let range = ctx.apply_pin(range);
        let key = range.to_lock_string();
        if let Some(node) = ctx.memo.lock().get(&key) {
            trace!(range = %key, "memo hit");
            return Ok(node.clone());
        }

        let item = resolve_item(&ctx, &range, &accept).await?;
        let child_ranges: Vec<LibraryRange> = item.dependencies.iter().cloned().collect();

        let deps = if ctx.config.sequential {
            let mut deps = Vec::with_capacity(child_ranges.len());
            for child in child_ranges {
                deps.push(create_graph_node(Arc::clone(&ctx), child, Arc::clone(&accept)).await?);
            }
            deps
        } else {
            stream::iter(child_ranges.into_iter().map(|child| {
                create_graph_node(Arc::clone(&ctx), child, Arc::clone(&accept))
            }))
            .buffered(ctx.config.max_concurrency.max(1))
            .try_collect()
            .await?
        };

        let node = GraphNode {
            range,
            item: Some(item),
            deps,
        };
        ctx.memo.lock().insert(key, node.clone());
        Ok(node)
    }
    .boxed()
}

/// Resolve a range against the provider groups in order.
async fn resolve_item(
    ctx: &WalkContext,
    range: &LibraryRange,
    accept: &AcceptPredicate,
) -> Result<Arc<GraphItem>> {
    // 1. Project providers: at most one match by name, first provider wins.
    for provider in &ctx.providers.project {
        let found = provider.find(range, &ctx.framework).await?;
        if let Some(best) = pick_best(found, &range.name) {
            return finish(ctx, provider, best, range, ProviderGroup::Project).await;
        }
    }

    // 2. Local providers in parallel; highest satisfying version wins.
    if let Some((provider, best)) =
        query_group(&ctx.providers.local, range, &ctx.framework).await?
    {
        return finish(ctx, provider, best, range, ProviderGroup::Local).await;
    }

    // 3. Remote providers, only when the predicate allows.
    if accept(range)
        && let Some((provider, best)) =
            query_group(&ctx.providers.remote, range, &ctx.framework).await?
    {
        return finish(ctx, provider, best, range, ProviderGroup::Remote).await;
    }

    // 4. The unresolved sentinel.
    debug!(range = %range.to_lock_string(), "range unresolved");
    Ok(Arc::new(UnresolvedProvider::item(None)))
}

/// Query one group's providers in parallel and pick the overall best
/// candidate.
async fn query_group<'a>(
    providers: &'a [Provider],
    range: &LibraryRange,
    framework: &FrameworkProfile,
) -> Result<Option<(&'a Provider, Candidate)>> {
    let queries = providers
        .iter()
        .map(|provider| async move { provider.find(range, framework).await });
    let results = futures::future::join_all(queries).await;

    let mut best: Option<(&Provider, Candidate)> = None;
    for (provider, found) in providers.iter().zip(results) {
        if let Some(candidate) = pick_best(found?, &range.name) {
            let better = match &best {
                Some((_, current)) => candidate.library.version > current.library.version,
                None => true,
            };
            if better {
                best = Some((provider, candidate));
            }
        }
    }
    Ok(best)
}

/// Highest version among a provider's candidates, preferring exact-case
/// name matches so a correctly-spelled candidate always beats a
/// case-variant one of the same version.
fn pick_best(candidates: Vec<Candidate>, requested: &str) -> Option<Candidate> {
    candidates.into_iter().max_by(|a, b| {
        a.library
            .version
            .cmp(&b.library.version)
            .then_with(|| (a.library.name == requested).cmp(&(b.library.name == requested)))
    })
}

/// Build the graph item for a chosen candidate: enforce the case policy,
/// then obtain its dependencies for the walk's framework.
async fn finish(
    ctx: &WalkContext,
    provider: &Provider,
    candidate: Candidate,
    range: &LibraryRange,
    group: ProviderGroup,
) -> Result<Arc<GraphItem>> {
    // A name that differs only by case is an unresolved-with-suggestion
    // outcome carrying the provider's spelling.
    if candidate.library.name != range.name {
        debug!(
            requested = %range.name,
            found = %candidate.library.name,
            "case-mismatched resolution"
        );
        return Ok(Arc::new(UnresolvedProvider::item(Some(
            candidate.library.name.clone(),
        ))));
    }

    let dependencies = provider.dependencies(&candidate, &ctx.framework).await?;
    trace!(
        library = %candidate.library,
        group = group.as_str(),
        deps = dependencies.len(),
        "range resolved"
    );
    Ok(Arc::new(GraphItem {
        matched: CandidateMatch {
            library: Some(candidate.library),
            group,
            token: candidate.token,
            suggestion: None,
        },
        dependencies: dependencies.into_iter().collect(),
    }))
}
