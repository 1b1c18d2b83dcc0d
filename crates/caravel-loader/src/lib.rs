//! Module loading for the Caravel host.
//!
//! The loader container dispenses loaders by key; the source-project loader
//! compiles projects from source on first reference, caches the resulting
//! module together with its exported metadata, and hands fully loaded
//! binary modules to the host. The keyed service registry dispenses typed
//! services with an explicit manifest-vs-internal flag.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod backend;
mod compiler;
mod container;
mod error;
mod registry;
mod source;
mod watch;

pub use backend::{CompileBackend, CompileUnit, CompiledOutput, ImageBackend, Reference};
pub use compiler::{
    CompilerOptions, LoadedModule, OutputTarget, ProjectCompiler, ReferenceImage,
    RuntimeImageResolver, SOURCE_PROJECT_LOADER_KEY, StoreImageResolver,
};
pub use container::{LoaderContainer, ModuleLoader};
pub use error::{LoaderError, Result};
pub use registry::ServiceRegistry;
pub use source::{Diagnostic, ParsedSource, SOURCE_EXTENSION, parse_source};
pub use watch::{FileWatcher, NullWatcher, RecordingWatcher};
