//! The Caravel lock file (`project.lock.json`).
//!
//! A lock file is the canonical, byte-stable record of a resolved graph:
//! enough to replay a restore without contacting the network. Canonical
//! bytes use two-space indentation, the `""` dependency group first
//! followed by frameworks in manifest declaration order, and libraries
//! sorted by name then semantic version.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod atomic;
mod error;
mod types;
mod validation;

pub use atomic::AtomicWriter;
pub use error::{LockfileError, Result};
pub use types::{LOCK_FILE_NAME, LOCK_FILE_VERSION, LockFile, LockedLibrary};
pub use validation::{LockClassification, ValidationError, ValidationResult, classify, validate};
