//! Error types for loading and compilation.

use crate::source::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the loader container and the project compiler.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Compilation produced error diagnostics.
    #[error("compilation of '{assembly}' failed:\n{}", join_diagnostics(diagnostics))]
    Compile {
        /// Assembly being compiled.
        assembly: String,
        /// Collected diagnostics.
        diagnostics: Vec<Diagnostic>,
    },

    /// A reference could not be resolved by any strategy.
    #[error("unable to resolve reference '{reference}' for '{assembly}'")]
    UnresolvedReference {
        /// Assembly being compiled.
        assembly: String,
        /// The missing reference.
        reference: String,
    },

    /// Service registry failure (missing tag or type mismatch).
    #[error("service registry: {0}")]
    Registry(String),

    /// IO failure with path context.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest problem bubbled out of project loading.
    #[error(transparent)]
    Manifest(#[from] caravel_core::Error),
}

impl LoaderError {
    /// Create an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<LoaderError> for caravel_core::Error {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::Compile {
                assembly,
                diagnostics,
            } => Self::Compile {
                assembly,
                diagnostics: join_diagnostics(&diagnostics),
            },
            LoaderError::Io { path, source } => Self::io(path, source),
            LoaderError::Manifest(inner) => inner,
            other => Self::Loader(other.to_string()),
        }
    }
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
