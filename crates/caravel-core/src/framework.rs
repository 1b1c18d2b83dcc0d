//! Target framework profiles and their compatibility relation.

use crate::error::{Error, Result};
use crate::version::Version;
use ahash::AHashSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A versioned identifier describing the runtime an artifact targets.
///
/// Parsed from compact identifiers such as `net1`, `net45` or `core5.0`:
/// a leading alphabetic identifier followed by a version. A trailing run of
/// digits without dots is read digit-per-component (`45` → `4.5`).
#[derive(Debug, Clone)]
pub struct FrameworkProfile {
    identifier: Box<str>,
    version: Version,
    raw: Box<str>,
}

impl FrameworkProfile {
    /// Parse a compact framework identifier.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        let split = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphabetic())
            .map_or(s.len(), |(i, _)| i);
        let (identifier, version_part) = s.split_at(split);
        if identifier.is_empty() {
            return Err(Error::InvalidFramework(input.to_string()));
        }

        let version = if version_part.is_empty() {
            Version::new(0, 0, 0, 0)
        } else if version_part.contains('.') {
            Version::parse(version_part)
                .map_err(|_| Error::InvalidFramework(input.to_string()))?
        } else {
            // Digit-per-component: "45" → 4.5, "451" → 4.5.1.
            let mut parts = [0u64; 4];
            if version_part.len() > 4 || !version_part.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::InvalidFramework(input.to_string()));
            }
            for (i, c) in version_part.chars().enumerate() {
                parts[i] = u64::from(c as u8 - b'0');
            }
            Version::new(parts[0], parts[1], parts[2], parts[3])
        };

        Ok(Self {
            identifier: identifier.into(),
            version,
            raw: s.into(),
        })
    }

    /// The framework identifier (e.g. `net`).
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The framework version.
    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }
}

impl PartialEq for FrameworkProfile {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.version == other.version
    }
}

impl Eq for FrameworkProfile {}

impl Hash for FrameworkProfile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for FrameworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for FrameworkProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for FrameworkProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for FrameworkProfile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The compatibility relation between framework profiles.
///
/// The relation is an injected lookup, not recomputed per query: the default
/// rule accepts a candidate with the same identifier and a lower-or-equal
/// version, and hosts may add explicit cross-identifier entries.
#[derive(Debug, Default)]
pub struct CompatibilityTable {
    /// Extra (consumer, candidate) pairs beyond the default rule.
    entries: AHashSet<(FrameworkProfile, FrameworkProfile)>,
}

impl CompatibilityTable {
    /// Create a table with only the default same-identifier rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `candidate` is acceptable to a consumer targeting
    /// `consumer`.
    pub fn insert(&mut self, consumer: FrameworkProfile, candidate: FrameworkProfile) {
        self.entries.insert((consumer, candidate));
    }

    /// Whether a library targeting `candidate` is acceptable to a consumer
    /// targeting `consumer`.
    #[must_use]
    pub fn compatible(&self, consumer: &FrameworkProfile, candidate: &FrameworkProfile) -> bool {
        if consumer.identifier == candidate.identifier && candidate.version <= consumer.version {
            return true;
        }
        self.entries
            .contains(&(consumer.clone(), candidate.clone()))
    }
}
