//! The caravel command-line host.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;

use caravel_cli::driver::CancellationFlag;
use caravel_cli::logging;
use clap::Parser;
use commands::{Cli, Commands};
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Cancellation is observed between restore phases.
    let cancellation = CancellationFlag::new();
    {
        let cancellation = cancellation.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancellation.cancel();
            }
        });
    }

    let result = runtime.block_on(async {
        match &cli.command {
            Commands::Restore(args) => commands::restore::run(args, cancellation).await,
            Commands::Run(args) => commands::run::run(args).await,
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
