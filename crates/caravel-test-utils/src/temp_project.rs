//! Temporary solution/project trees for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary solution directory holding project directories, cleaned up
/// on drop.
#[derive(Debug)]
pub struct TempSolution {
    dir: TempDir,
}

impl TempSolution {
    /// Create an empty solution.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp solution"),
        }
    }

    /// Solution root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a project directory with the given manifest, returning its path.
    pub fn add_project(&self, name: &str, manifest: &str) -> PathBuf {
        let dir = self.dir.path().join(name);
        fs::create_dir_all(&dir).expect("create project dir");
        fs::write(dir.join("project.json"), manifest).expect("write manifest");
        dir
    }

    /// Add a source file to a project.
    pub fn add_source(&self, project: &str, file: &str, text: &str) {
        let path = self.dir.path().join(project).join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create source dir");
        }
        fs::write(path, text).expect("write source");
    }

    /// A directory under the solution for use as a package store.
    #[must_use]
    pub fn store_root(&self) -> PathBuf {
        self.dir.path().join("packages")
    }

    /// Path of a project's lock file.
    #[must_use]
    pub fn lock_path(&self, project: &str) -> PathBuf {
        self.dir.path().join(project).join("project.lock.json")
    }
}

impl Default for TempSolution {
    fn default() -> Self {
        Self::new()
    }
}
