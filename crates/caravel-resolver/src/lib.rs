//! Dependency graph construction for Caravel.
//!
//! The walker expands a project's declared dependency ranges into a full
//! transitive graph by querying providers in three ordered groups —
//! project, local, remote — preferring resolution at the earliest group
//! that yields a match and the highest satisfying version within a group.
//! Transitive version conflicts are not unified: each edge keeps its chosen
//! node, and de-duplication happens at install/lock time by exact
//! `(name, version)` equality.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod graph;
mod providers;
mod walker;

pub use graph::{CandidateMatch, CandidateToken, GraphItem, GraphNode, ProviderGroup, version_conflicts};
pub use providers::{
    Candidate, FrameworkReferenceProvider, GacProvider, ProjectProvider, Provider, ProviderSet,
    RemoteProvider, StoreProvider, UnresolvedProvider,
};
pub use walker::{AcceptPredicate, WalkConfig, WalkContext, create_graph_node, walk_dependencies};
