//! Lifecycle hook execution.
//!
//! Restores run the manifest's `prerestore`, `postrestore`, and `prepare`
//! scripts through an injected runner. Hooks run with the project
//! directory as cwd and inherit the process environment plus
//! `CARAVEL_PROJECT` and `CARAVEL_PACKAGES`; a non-zero exit aborts the
//! command with the hook's stderr.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Hook names, in lifecycle order.
pub const PRERESTORE: &str = "prerestore";
/// Runs after installs complete.
pub const POSTRESTORE: &str = "postrestore";
/// Runs after `postrestore`.
pub const PREPARE: &str = "prepare";

/// Captured result of one hook run.
#[derive(Debug)]
pub struct HookOutput {
    /// Process exit code (-1 when terminated by a signal).
    pub exit_code: i32,
    /// Captured stderr.
    pub stderr: String,
}

impl HookOutput {
    /// Whether the hook succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes named lifecycle scripts.
pub trait HookRunner: Send + Sync {
    /// Run `command` for the hook `name` in `project_dir` with `env`
    /// appended to the inherited environment.
    ///
    /// # Errors
    /// Returns error when the process cannot be spawned.
    fn run(
        &self,
        name: &str,
        command: &str,
        project_dir: &Path,
        env: &[(String, String)],
    ) -> io::Result<HookOutput>;
}

/// Runner spawning hooks through the platform shell.
#[derive(Debug, Default)]
pub struct ShellHookRunner;

impl HookRunner for ShellHookRunner {
    fn run(
        &self,
        name: &str,
        command: &str,
        project_dir: &Path,
        env: &[(String, String)],
    ) -> io::Result<HookOutput> {
        info!(hook = name, command, "running hook");

        #[cfg(unix)]
        let mut process = {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };
        #[cfg(windows)]
        let mut process = {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        };

        let output = process
            .current_dir(project_dir)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(hook = name, exit_code, "hook finished");
        Ok(HookOutput {
            exit_code,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    #[cfg(unix)]
    fn successful_hook() {
        let tmp = TempDir::new().unwrap();
        let out = ShellHookRunner
            .run(PRERESTORE, "true", tmp.path(), &[])
            .unwrap();
        assert!(out.success());
    }

    #[test]
    #[cfg(unix)]
    fn failing_hook_captures_stderr() {
        let tmp = TempDir::new().unwrap();
        let out = ShellHookRunner
            .run(PRERESTORE, "echo boom >&2; exit 3", tmp.path(), &[])
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert!(out.stderr.contains("boom"));
    }

    #[test]
    #[cfg(unix)]
    fn hook_sees_injected_environment() {
        let tmp = TempDir::new().unwrap();
        let out = ShellHookRunner
            .run(
                PREPARE,
                r#"test "$CARAVEL_PROJECT" = App"#,
                tmp.path(),
                &[("CARAVEL_PROJECT".to_string(), "App".to_string())],
            )
            .unwrap();
        assert!(out.success());
    }
}
