//! CLI configuration file (`caravel.json`).
//!
//! Supplies feed sources and a store location; command-line flags append
//! to or override file values.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Parsed `caravel.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Primary feed URLs.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Fallback feed URLs, consulted when no primary yields a candidate.
    #[serde(default)]
    pub fallback_sources: Vec<String>,

    /// Package store directory.
    #[serde(default)]
    pub packages: Option<PathBuf>,
}

impl CliConfig {
    /// Load a configuration file.
    ///
    /// # Errors
    /// Returns error when the file is unreadable or not valid JSON.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        caravel_core::from_json(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_sources_and_store() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("caravel.json");
        fs::write(
            &path,
            r#"{"sources":["https://feed.example/"],"fallbackSources":[],"packages":"pkgs"}"#,
        )
        .unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.sources, vec!["https://feed.example/"]);
        assert_eq!(config.packages.as_deref(), Some(Path::new("pkgs")));
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(CliConfig::load(&tmp.path().join("nope.json")).is_err());
    }
}
