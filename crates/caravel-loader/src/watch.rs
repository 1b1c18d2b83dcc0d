//! The file-watcher seam.
//!
//! The compiler only registers interest; reacting to change events is the
//! host's file-watcher collaborator's job. Registration failures are
//! warnings, never fatal.

use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};

/// External file-watcher collaborator.
pub trait FileWatcher: Send + Sync {
    /// Watch a directory, optionally recursive, filtered to one extension.
    ///
    /// # Errors
    /// Returns error when the watch cannot be registered.
    fn watch_dir(&self, path: &Path, recursive: bool, extension: &str) -> io::Result<()>;

    /// Watch a single file.
    ///
    /// # Errors
    /// Returns error when the watch cannot be registered.
    fn watch_file(&self, path: &Path) -> io::Result<()>;
}

/// Watcher that accepts every registration and does nothing.
#[derive(Debug, Default)]
pub struct NullWatcher;

impl FileWatcher for NullWatcher {
    fn watch_dir(&self, _path: &Path, _recursive: bool, _extension: &str) -> io::Result<()> {
        Ok(())
    }

    fn watch_file(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Watcher that records registrations; used by tests, and can be told to
/// fail to exercise the warn-and-continue path.
#[derive(Debug, Default)]
pub struct RecordingWatcher {
    /// Recorded directory watches as `(path, recursive, extension)`.
    pub dirs: Mutex<Vec<(PathBuf, bool, String)>>,
    /// Recorded file watches.
    pub files: Mutex<Vec<PathBuf>>,
    /// When set, every registration fails.
    pub fail: bool,
}

impl RecordingWatcher {
    /// A watcher that fails every registration.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl FileWatcher for RecordingWatcher {
    fn watch_dir(&self, path: &Path, recursive: bool, extension: &str) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::other("watch registration refused"));
        }
        self.dirs
            .lock()
            .push((path.to_path_buf(), recursive, extension.to_string()));
        Ok(())
    }

    fn watch_file(&self, path: &Path) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::other("watch registration refused"));
        }
        self.files.lock().push(path.to_path_buf());
        Ok(())
    }
}
