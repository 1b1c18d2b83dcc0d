//! `caravel restore`.

use anyhow::Context;
use caravel_cli::config::CliConfig;
use caravel_cli::driver::{CancellationFlag, RestoreDriver, RestoreOptions};
use caravel_core::Version;
use clap::Args;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use url::Url;

/// Arguments for `restore`.
#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// `[<path>] [<id> [<version>]]`: a restore root, or a package id
    /// (with optional version) to install into the store.
    #[arg(value_name = "TARGET", num_args = 0..=3)]
    pub targets: Vec<String>,

    /// Package store directory.
    #[arg(long, value_name = "DIR")]
    pub packages: Option<PathBuf>,

    /// Primary feed URL (repeatable).
    #[arg(long = "source", value_name = "URL")]
    pub sources: Vec<String>,

    /// Fallback feed URL (repeatable).
    #[arg(long = "fallback-source", value_name = "URL")]
    pub fallback_sources: Vec<String>,

    /// Bypass feed response caches.
    #[arg(long)]
    pub no_cache: bool,

    /// Demote feed failures to warnings.
    #[arg(long)]
    pub ignore_failed_sources: bool,

    /// Write the lock file with `locked: true`.
    #[arg(long)]
    pub lock: bool,

    /// Ignore an existing locked lock file and re-resolve.
    #[arg(long, conflicts_with = "lock")]
    pub unlock: bool,

    /// Configuration file supplying sources and the store location.
    #[arg(long, value_name = "FILE")]
    pub configfile: Option<PathBuf>,
}

/// Run the restore command.
pub async fn run(args: &RestoreArgs, cancellation: CancellationFlag) -> anyhow::Result<ExitCode> {
    let (path, package_id) = split_targets(&args.targets)?;

    let config = match &args.configfile {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };

    // Flags append to / override config-file values.
    let mut sources = config.sources.clone();
    sources.extend(args.sources.iter().cloned());
    let mut fallback_sources = config.fallback_sources.clone();
    fallback_sources.extend(args.fallback_sources.iter().cloned());

    let options = RestoreOptions {
        packages_dir: args.packages.clone().or(config.packages),
        sources: parse_urls(&sources)?,
        fallback_sources: parse_urls(&fallback_sources)?,
        no_cache: args.no_cache,
        ignore_failed_sources: args.ignore_failed_sources,
        lock: args.lock,
        unlock: args.unlock,
        sequential: parallel_restore_unsafe(),
        package_id,
    };

    let driver = RestoreDriver::new(options).with_cancellation(cancellation);
    let summary = driver.restore(&path).await?;
    if let Some(root) = &summary.install_root {
        info!(root = %root.display(), "package installed");
    }
    Ok(ExitCode::SUCCESS)
}

/// Interpret positionals: an existing path is a restore root; anything
/// else is a package id with an optional version.
fn split_targets(
    targets: &[String],
) -> anyhow::Result<(PathBuf, Option<(String, Option<Version>)>)> {
    let mut rest = targets;
    let mut path = PathBuf::from(".");
    if let Some(first) = rest.first()
        && Path::new(first).exists()
    {
        path = PathBuf::from(first);
        rest = &rest[1..];
    }
    let package_id = match rest {
        [] => None,
        [id] => Some((id.clone(), None)),
        [id, version] => {
            let version = Version::parse(version)
                .with_context(|| format!("invalid version '{version}'"))?;
            Some((id.clone(), Some(version)))
        }
        _ => anyhow::bail!("too many arguments"),
    };
    Ok((path, package_id))
}

fn parse_urls(raw: &[String]) -> anyhow::Result<Vec<Url>> {
    raw.iter()
        .map(|s| Url::parse(s).with_context(|| format!("invalid source url '{s}'")))
        .collect()
}

/// Hosts where parallel restore is known-unsafe degrade to sequential
/// execution.
fn parallel_restore_unsafe() -> bool {
    std::env::var_os("CARAVEL_SEQUENTIAL").is_some_and(|v| v == "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bare_invocation_restores_cwd() {
        let (path, package_id) = split_targets(&[]).unwrap();
        assert_eq!(path, PathBuf::from("."));
        assert!(package_id.is_none());
    }

    #[test]
    fn existing_path_is_a_restore_root() {
        let tmp = TempDir::new().unwrap();
        let arg = tmp.path().display().to_string();
        let (path, package_id) = split_targets(&[arg.clone()]).unwrap();
        assert_eq!(path, PathBuf::from(arg));
        assert!(package_id.is_none());
    }

    #[test]
    fn non_path_is_a_package_id() {
        let (path, package_id) =
            split_targets(&["Some.Package".to_string(), "1.0".to_string()]).unwrap();
        assert_eq!(path, PathBuf::from("."));
        let (id, version) = package_id.unwrap();
        assert_eq!(id, "Some.Package");
        assert_eq!(version.unwrap().to_string(), "1.0");
    }

    #[test]
    fn bad_version_is_an_error() {
        assert!(split_targets(&["Pkg".to_string(), "not-a-version".to_string()]).is_err());
    }
}
