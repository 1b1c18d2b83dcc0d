//! Library surface of the caravel CLI: the restore driver, command
//! expansion, lifecycle hooks, configuration, and logger setup.
//!
//! The binary in `main.rs` is a thin clap layer over these.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod driver;
pub mod expand;
pub mod hooks;
pub mod launch;
pub mod logging;

pub use driver::{CancellationFlag, RestoreDriver, RestoreOptions, RestoreSummary};
pub use expand::{CommandLine, expand_command, resolve_command};
pub use hooks::{HookOutput, HookRunner, ShellHookRunner};
pub use launch::{HostLauncher, LoggingLauncher};
