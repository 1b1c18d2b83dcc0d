//! Core types and utilities for the Caravel application host.
//!
//! This crate provides the vocabulary shared by every other Caravel crate:
//! - Semantic versions with a fourth revision component, and version ranges
//!   with float behaviors
//! - Target framework profiles and their compatibility relation
//! - Library identity (`Library`, `LibraryRange`, `Dependency`)
//! - High-performance JSON operations
//! - Error types

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
mod framework;
mod json;
mod library;
mod version;

pub use error::{Error, ErrorCode, Result};
pub use framework::{CompatibilityTable, FrameworkProfile};
pub use json::{from_json, from_json_slice, to_json, to_json_pretty};
pub use library::{Dependency, DependencyKind, Library, LibraryRange};
pub use version::{FloatBehavior, Version, VersionRange};

// Re-export commonly used types
pub use ahash::{AHashMap, AHashSet};
pub use parking_lot::{Mutex, RwLock};

/// Global allocator using mimalloc for high performance.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
