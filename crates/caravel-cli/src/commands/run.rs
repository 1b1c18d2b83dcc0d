//! `caravel run`.

use anyhow::{Context, bail};
use caravel_cli::expand::resolve_command;
use caravel_cli::launch::{HostLauncher, LoggingLauncher};
use caravel_core::FrameworkProfile;
use caravel_loader::{
    CompilerOptions, FileWatcher, ImageBackend, LoaderContainer, NullWatcher, OutputTarget,
    ProjectCompiler, RecordingWatcher, SOURCE_PROJECT_LOADER_KEY, StoreImageResolver,
};
use caravel_manifest::Project;
use caravel_resolver::FrameworkReferenceProvider;
use caravel_store::PackageStore;
use clap::Args;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

/// Arguments for `run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Register file watches for recompilation on change.
    #[arg(long)]
    pub watch: bool,

    /// Package store directory.
    #[arg(long, value_name = "DIR")]
    pub packages: Option<PathBuf>,

    /// Build configuration name.
    #[arg(long, value_name = "NAME", default_value = "Debug")]
    pub configuration: String,

    /// Compilation service port; defaults from `COMPILATION_SERVER_PORT`.
    #[arg(long, value_name = "N")]
    pub port: Option<u16>,

    /// `[<command|app> [args…]]`.
    #[arg(value_name = "ARGS", trailing_var_arg = true)]
    pub rest: Vec<String>,
}

/// Run the run command.
pub async fn run(args: &RunArgs) -> anyhow::Result<ExitCode> {
    let project_dir = std::env::current_dir().context("determining working directory")?;
    let project = Project::load(&project_dir).map_err(anyhow::Error::from)?;

    let port = args.port.or_else(default_port);
    debug!(?port, configuration = %args.configuration, "host starting");

    let (application, app_args) = resolve_application(&project, &args.rest);
    info!(application = %application, "launching");

    let solution_root = project_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_dir.clone());
    let framework = project
        .frameworks()
        .first()
        .map(|fx| (*fx).clone())
        .unwrap_or(FrameworkProfile::parse("net45").map_err(anyhow::Error::from)?);

    let store_root = args
        .packages
        .clone()
        .unwrap_or_else(|| default_store_root(&project_dir, &solution_root));
    let store = PackageStore::open(&store_root).map_err(caravel_core::Error::from)?;

    // With --watch every compiled project registers its directory and
    // manifest with the watcher; the host's file-watcher collaborator
    // drives recompilation from those registrations.
    let recording = args.watch.then(|| Arc::new(RecordingWatcher::default()));
    let watcher: Arc<dyn FileWatcher> = match &recording {
        Some(watcher) => Arc::clone(watcher) as Arc<dyn FileWatcher>,
        None => Arc::new(NullWatcher),
    };

    let compiler = ProjectCompiler::new(
        CompilerOptions {
            solution_root,
            framework: framework.clone(),
            output: OutputTarget::InMemory,
            configuration: args.configuration.clone(),
        },
        Arc::new(ImageBackend),
        watcher,
        Arc::new(StoreImageResolver::new(store, framework)),
        Arc::new(FrameworkReferenceProvider::new()),
    );

    let mut container = LoaderContainer::new();
    container.register_loader(SOURCE_PROJECT_LOADER_KEY, Arc::new(compiler));

    let Some(module) = container
        .load(&application)
        .await
        .map_err(caravel_core::Error::from)?
    else {
        bail!("unable to locate application '{application}'");
    };

    if let Some(recording) = &recording {
        info!(
            dirs = recording.dirs.lock().len(),
            files = recording.files.lock().len(),
            "file watches registered"
        );
    }

    let exit = LoggingLauncher.launch(&module, &app_args)?;
    Ok(if exit == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Pick the application and arguments: a matched manifest command is
/// expanded (its first token the application, its tokens prepended to the
/// user's); `run` or nothing falls back to the entry point.
fn resolve_application(project: &Project, rest: &[String]) -> (String, Vec<String>) {
    if let Some(first) = rest.first() {
        let user_args = &rest[1..];
        if let Some(line) = resolve_command(&project.commands, first, user_args, &|_| None) {
            return (line.application, line.args);
        }
        if first != "run" {
            return (first.clone(), user_args.to_vec());
        }
        return (project.entry_point_or_name().to_string(), user_args.to_vec());
    }
    (project.entry_point_or_name().to_string(), Vec::new())
}

fn default_port() -> Option<u16> {
    std::env::var("COMPILATION_SERVER_PORT")
        .ok()
        .and_then(|v| v.trim().parse().ok())
}

fn default_store_root(project_dir: &Path, solution_root: &Path) -> PathBuf {
    let local = project_dir.join("packages");
    if local.is_dir() {
        return local;
    }
    let shared = solution_root.join("packages");
    if shared.is_dir() { shared } else { local }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(manifest: &str) -> (TempDir, Project) {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("App");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("project.json"), manifest).unwrap();
        let project = Project::load(&dir).unwrap();
        (tmp, project)
    }

    #[test]
    fn bare_run_uses_entry_point() {
        let (_tmp, project) = project(r#"{"entryPoint":"App.Main"}"#);
        let (application, args) = resolve_application(&project, &[]);
        assert_eq!(application, "App.Main");
        assert!(args.is_empty());
    }

    #[test]
    fn run_keyword_uses_project_name() {
        let (_tmp, project) = project("{}");
        let (application, _) = resolve_application(&project, &["run".to_string()]);
        assert_eq!(application, "App");
    }

    #[test]
    fn matched_command_is_expanded() {
        let (_tmp, project) =
            project(r#"{"commands":{"web":"Microsoft.Host --server app.dll"}}"#);
        let (application, args) =
            resolve_application(&project, &["web".to_string(), "extra".to_string()]);
        assert_eq!(application, "Microsoft.Host");
        assert_eq!(args, vec!["--server", "app.dll", "extra"]);
    }

    #[test]
    fn unmatched_first_token_is_the_application() {
        let (_tmp, project) = project("{}");
        let (application, args) =
            resolve_application(&project, &["Other.App".to_string(), "--flag".to_string()]);
        assert_eq!(application, "Other.App");
        assert_eq!(args, vec!["--flag"]);
    }
}
