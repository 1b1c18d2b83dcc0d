//! Project manifest parsing for Caravel.
//!
//! A project is a directory containing a `project.json` manifest. The
//! manifest declares the project version, entry point, named commands,
//! shared and per-framework dependency lists, and source file patterns.
//! Unknown manifest keys are ignored. The parsed [`Project`] is immutable
//! for the duration of a command.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod project;
mod types;

pub use project::{MANIFEST_FILE_NAME, Project};
pub use types::{PatternList, RawDependency, RawFrameworkSection, RawManifest};
