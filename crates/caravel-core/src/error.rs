//! Error types for Caravel operations.
//!
//! Each error carries a unique code (e.g. E0101) so failures can be searched
//! for and referenced precisely in logs and bug reports.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for Caravel errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Resolution errors (E01xx)
    /// Library could not be located by any provider
    E0101,
    /// Library resolved with a differently-cased name
    E0102,
    /// Invalid version string
    E0103,
    /// Invalid version range
    E0104,
    /// Invalid framework profile
    E0105,

    // Network errors (E02xx)
    /// Feed request failed
    E0201,
    /// Feed unreachable
    E0202,

    // Manifest errors (E03xx)
    /// Manifest file missing
    E0301,
    /// Manifest parse error
    E0302,

    // Store / IO errors (E04xx)
    /// IO failure
    E0401,
    /// Package hash mismatch
    E0402,
    /// Archive error
    E0403,

    // Lock file errors (E05xx)
    /// Lock file does not match the manifest
    E0501,
    /// Lock file unreadable or structurally invalid
    E0502,

    // Compilation / loading errors (E06xx)
    /// Compilation produced diagnostics
    E0601,
    /// Loader container error
    E0602,

    // Hook errors (E07xx)
    /// Lifecycle hook failed
    E0701,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0104 => "E0104",
            Self::E0105 => "E0105",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0401 => "E0401",
            Self::E0402 => "E0402",
            Self::E0403 => "E0403",
            Self::E0501 => "E0501",
            Self::E0502 => "E0502",
            Self::E0601 => "E0601",
            Self::E0602 => "E0602",
            Self::E0701 => "E0701",
        }
    }

    /// Get a brief title for this error code.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::E0101 => "Library not found",
            Self::E0102 => "Name case mismatch",
            Self::E0103 => "Invalid version",
            Self::E0104 => "Invalid version range",
            Self::E0105 => "Invalid framework profile",
            Self::E0201 => "Feed request failed",
            Self::E0202 => "Feed unreachable",
            Self::E0301 => "Manifest missing",
            Self::E0302 => "Manifest parse error",
            Self::E0401 => "IO error",
            Self::E0402 => "Hash mismatch",
            Self::E0403 => "Archive error",
            Self::E0501 => "Lock file stale",
            Self::E0502 => "Lock file invalid",
            Self::E0601 => "Compilation failed",
            Self::E0602 => "Loader error",
            Self::E0701 => "Hook failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for Caravel.
#[derive(Error, Debug)]
pub enum Error {
    /// No provider produced a satisfying candidate.
    #[error("[E0101] Unable to locate {target}")]
    UnresolvedLibrary {
        /// Canonical range that failed to resolve.
        target: String,
    },

    /// A provider's candidate differs from the request only by name casing.
    #[error("[E0102] Unable to locate {requested}; a library named '{found}' exists (name is case-sensitive)")]
    CaseMismatch {
        /// Canonical range that failed to resolve.
        requested: String,
        /// The provider's spelling of the name.
        found: String,
    },

    /// Version string could not be parsed.
    #[error("[E0103] invalid version '{input}': {reason}")]
    InvalidVersion {
        /// Offending input.
        input: String,
        /// What went wrong.
        reason: String,
    },

    /// Version range string could not be parsed.
    #[error("[E0104] invalid version range '{input}': {reason}")]
    InvalidRange {
        /// Offending input.
        input: String,
        /// What went wrong.
        reason: String,
    },

    /// Framework profile string could not be parsed.
    #[error("[E0105] invalid framework profile '{0}'")]
    InvalidFramework(String),

    /// Remote feed failure.
    #[error("[E0201] feed error: {message}")]
    Feed {
        /// Error message.
        message: String,
        /// Feed URL if known.
        url: Option<String>,
    },

    /// Manifest missing at the expected location.
    #[error("[E0301] no manifest found at {0}")]
    ManifestMissing(PathBuf),

    /// Manifest parse error.
    #[error("[E0302] invalid manifest{}: {message}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    InvalidManifest {
        /// Error message.
        message: String,
        /// File path if known.
        path: Option<PathBuf>,
    },

    /// JSON error.
    #[error("[E0302] json error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// IO error with path context.
    #[error("[E0401] io error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Recorded hash does not match the archive bytes.
    #[error("[E0402] sha mismatch for {library}: expected {expected}, got {actual}")]
    ShaMismatch {
        /// `name/version` of the package.
        library: String,
        /// Expected base64 sha512.
        expected: String,
        /// Actual base64 sha512.
        actual: String,
    },

    /// Archive read or extraction failure.
    #[error("[E0403] archive error: {0}")]
    Archive(String),

    /// Lock file does not describe the current manifest.
    #[error("[E0501] lock file is out of date: {0}")]
    LockStale(String),

    /// Lock file unreadable or structurally invalid.
    #[error("[E0502] lock file invalid: {0}")]
    LockInvalid(String),

    /// Compilation produced error diagnostics.
    #[error("[E0601] compilation of '{assembly}' failed:\n{diagnostics}")]
    Compile {
        /// Assembly being compiled.
        assembly: String,
        /// Joined diagnostic messages.
        diagnostics: String,
    },

    /// Loader container / service registry error.
    #[error("[E0602] loader error: {0}")]
    Loader(String),

    /// Lifecycle hook exited non-zero.
    #[error("[E0701] {hook} hook failed with exit code {exit_code}:\n{stderr}")]
    Hook {
        /// Hook name.
        hook: String,
        /// Exit code (-1 when terminated by signal).
        exit_code: i32,
        /// Captured stderr.
        stderr: String,
    },
}

impl Error {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnresolvedLibrary { .. } => ErrorCode::E0101,
            Self::CaseMismatch { .. } => ErrorCode::E0102,
            Self::InvalidVersion { .. } => ErrorCode::E0103,
            Self::InvalidRange { .. } => ErrorCode::E0104,
            Self::InvalidFramework(_) => ErrorCode::E0105,
            Self::Feed { .. } => ErrorCode::E0201,
            Self::ManifestMissing(_) => ErrorCode::E0301,
            Self::InvalidManifest { .. } | Self::Json(_) => ErrorCode::E0302,
            Self::Io { .. } => ErrorCode::E0401,
            Self::ShaMismatch { .. } => ErrorCode::E0402,
            Self::Archive(_) => ErrorCode::E0403,
            Self::LockStale(_) => ErrorCode::E0501,
            Self::LockInvalid(_) => ErrorCode::E0502,
            Self::Compile { .. } => ErrorCode::E0601,
            Self::Loader(_) => ErrorCode::E0602,
            Self::Hook { .. } => ErrorCode::E0701,
        }
    }

    /// Create an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a feed error.
    #[must_use]
    pub fn feed(message: impl Into<String>, url: Option<String>) -> Self {
        Self::Feed {
            message: message.into(),
            url,
        }
    }

    /// Create a manifest parse error.
    #[must_use]
    pub fn invalid_manifest(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::InvalidManifest {
            message: message.into(),
            path,
        }
    }
}

/// Result type for Caravel operations.
pub type Result<T> = std::result::Result<T, Error>;
