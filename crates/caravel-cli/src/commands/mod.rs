//! Command-line surface.

pub mod restore;
pub mod run;

use clap::{Parser, Subcommand};

/// The caravel application host.
#[derive(Debug, Parser)]
#[command(name = "caravel", version, about = "Modular application host")]
pub struct Cli {
    /// Subcommand.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Errors only.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve and materialise dependencies, writing the lock file.
    Restore(restore::RestoreArgs),

    /// Compile and launch an application or manifest command.
    Run(run::RunArgs),
}
