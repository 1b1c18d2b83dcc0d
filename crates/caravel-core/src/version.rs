//! Semantic versions and version ranges.
//!
//! Versions carry four numeric components (major.minor.patch.revision) plus
//! an optional pre-release tag. A release version orders above any
//! pre-release of the same numeric components; pre-release tags compare
//! lexicographically. Display preserves the author's spelling (`1.0` stays
//! `1.0`), while equality and ordering use only the parsed components.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A semantic version with a fourth revision component.
#[derive(Debug, Clone)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    prerelease: Option<Box<str>>,
    /// Original spelling, preserved for display.
    raw: Box<str>,
}

impl Version {
    /// Create a release version from numeric components.
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64, revision: u64) -> Self {
        let raw = if revision > 0 {
            format!("{major}.{minor}.{patch}.{revision}")
        } else {
            format!("{major}.{minor}.{patch}")
        };
        Self {
            major,
            minor,
            patch,
            revision,
            prerelease: None,
            raw: raw.into_boxed_str(),
        }
    }

    /// Parse a version string: up to four dot-separated numeric components
    /// with an optional `-tag` pre-release suffix.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidVersion {
                input: input.to_string(),
                reason: "empty string".to_string(),
            });
        }

        let (numeric, prerelease) = match input.split_once('-') {
            Some((n, tag)) if !tag.is_empty() => (n, Some(tag)),
            Some((_, _)) => {
                return Err(Error::InvalidVersion {
                    input: input.to_string(),
                    reason: "empty pre-release tag".to_string(),
                });
            }
            None => (input, None),
        };

        let mut parts = [0u64; 4];
        let segments: Vec<&str> = numeric.split('.').collect();
        if segments.is_empty() || segments.len() > 4 {
            return Err(Error::InvalidVersion {
                input: input.to_string(),
                reason: format!("{} numeric components (expected 1-4)", segments.len()),
            });
        }
        for (i, seg) in segments.iter().enumerate() {
            parts[i] = seg.parse::<u64>().map_err(|_| Error::InvalidVersion {
                input: input.to_string(),
                reason: format!("component '{seg}' is not a number"),
            })?;
        }

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            revision: parts[3],
            prerelease: prerelease.map(Into::into),
            raw: input.into(),
        })
    }

    /// Major component.
    #[must_use]
    pub const fn major(&self) -> u64 {
        self.major
    }

    /// Minor component.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.minor
    }

    /// Patch component.
    #[must_use]
    pub const fn patch(&self) -> u64 {
        self.patch
    }

    /// Revision component.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Pre-release tag, if any.
    #[must_use]
    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    /// Whether this is a pre-release version.
    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Compare numeric components only, ignoring any pre-release tag.
    #[must_use]
    pub fn cmp_components(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision).cmp(&(
            other.major,
            other.minor,
            other.patch,
            other.revision,
        ))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_components(other).then_with(|| {
            match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                // Release sorts above any pre-release of the same components.
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.revision.hash(state);
        self.prerelease.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Float behavior of a version range: which component may drift upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FloatBehavior {
    /// No floating; the range bounds are final.
    #[default]
    None,
    /// Pre-release tag floats (`1.0-*`).
    Prerelease,
    /// Revision floats (`1.0.0.*`).
    Revision,
    /// Patch floats (`1.0.*`).
    Build,
    /// Minor floats (`1.*`).
    Minor,
    /// Major floats (`*`).
    Major,
    /// Anything, including pre-releases (`*-*`).
    AbsoluteLatest,
}

impl FloatBehavior {
    /// Whether the float admits pre-release versions.
    #[must_use]
    pub const fn allows_prerelease(self) -> bool {
        matches!(self, Self::Prerelease | Self::AbsoluteLatest)
    }
}

/// A constraint on acceptable library versions.
///
/// Ranges are `min ⋈ v ⋈ max` with per-bound inclusivity, plus a float
/// behavior. The canonical form produced by `Display` is the one the lock
/// file records and the one range equality is defined over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VersionRange {
    /// Lower bound.
    pub min: Option<Version>,
    /// Upper bound.
    pub max: Option<Version>,
    /// Whether `min` itself satisfies the range.
    pub include_min: bool,
    /// Whether `max` itself satisfies the range.
    pub include_max: bool,
    /// Float behavior.
    pub float: FloatBehavior,
    /// Exclusive upper bound implied by a bare version: `"1.0"` accepts
    /// 1.0.x but not 1.1. Never rendered in the canonical form.
    pub implied_max: Option<Version>,
}

impl VersionRange {
    /// Range accepting any release version.
    #[must_use]
    pub fn any() -> Self {
        Self {
            float: FloatBehavior::Major,
            ..Self::default()
        }
    }

    /// Exact pin `[v, v]`, used for lock-file replay.
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            max: Some(version),
            include_min: true,
            include_max: true,
            float: FloatBehavior::None,
            implied_max: None,
        }
    }

    /// Parse a range string.
    ///
    /// Accepted forms: bare `1.0` (min-inclusive, pinned at its specified
    /// precision), interval notation `[1.0,2.0)` / `(1.0,2.0]` / `[1.0]`,
    /// and floating forms `*`, `*-*`, `1.*`, `1.0.*`, `1.0.0.*`, `1.0-*`.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Ok(Self::any());
        }
        if s == "*" {
            return Ok(Self::any());
        }
        if s == "*-*" {
            return Ok(Self {
                float: FloatBehavior::AbsoluteLatest,
                ..Self::default()
            });
        }
        if s.starts_with('[') || s.starts_with('(') {
            return Self::parse_interval(s);
        }
        if let Some(prefix) = s.strip_suffix("-*") {
            let min = Version::parse(prefix)?;
            return Ok(Self {
                min: Some(min),
                max: None,
                include_min: true,
                include_max: false,
                float: FloatBehavior::Prerelease,
                implied_max: None,
            });
        }
        if let Some(prefix) = s.strip_suffix(".*") {
            let dots = prefix.chars().filter(|&c| c == '.').count();
            let float = match dots {
                0 => FloatBehavior::Minor,
                1 => FloatBehavior::Build,
                2 => FloatBehavior::Revision,
                _ => {
                    return Err(Error::InvalidRange {
                        input: input.to_string(),
                        reason: "too many components before '.*'".to_string(),
                    });
                }
            };
            let min = Version::parse(prefix)?;
            return Ok(Self {
                min: Some(min),
                max: None,
                include_min: true,
                include_max: false,
                float,
                implied_max: None,
            });
        }

        // Bare version: minimum-inclusive, pinned at its specified
        // precision. "1.0" accepts 1.0.x and rejects 1.1.
        let min = Version::parse(s)?;
        let specified = s.split('-').next().unwrap_or(s).split('.').count();
        let implied_max = match specified {
            1 => Version::new(min.major() + 1, 0, 0, 0),
            2 => Version::new(min.major(), min.minor() + 1, 0, 0),
            3 => Version::new(min.major(), min.minor(), min.patch() + 1, 0),
            _ => Version::new(min.major(), min.minor(), min.patch(), min.revision() + 1),
        };
        Ok(Self {
            min: Some(min),
            max: None,
            include_min: true,
            include_max: false,
            float: FloatBehavior::None,
            implied_max: Some(implied_max),
        })
    }

    fn parse_interval(s: &str) -> Result<Self> {
        let include_min = s.starts_with('[');
        let include_max = s.ends_with(']');
        if !s.ends_with(']') && !s.ends_with(')') {
            return Err(Error::InvalidRange {
                input: s.to_string(),
                reason: "unterminated interval".to_string(),
            });
        }
        let inner = &s[1..s.len() - 1];
        let (lo, hi) = match inner.split_once(',') {
            Some((lo, hi)) => (lo.trim(), hi.trim()),
            // "[1.0]" pins exactly.
            None => (inner.trim(), inner.trim()),
        };
        let min = if lo.is_empty() {
            None
        } else {
            Some(Version::parse(lo)?)
        };
        let max = if hi.is_empty() {
            None
        } else {
            Some(Version::parse(hi)?)
        };
        if min.is_none() && max.is_none() {
            return Err(Error::InvalidRange {
                input: s.to_string(),
                reason: "interval with no bounds".to_string(),
            });
        }
        Ok(Self {
            min,
            max,
            include_min,
            include_max,
            float: FloatBehavior::None,
            implied_max: None,
        })
    }

    /// Whether `version` satisfies this range.
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        // A pre-release only satisfies a range that floats into pre-releases
        // or whose minimum is itself a pre-release.
        if version.is_prerelease()
            && !self.float.allows_prerelease()
            && !self.min.as_ref().is_some_and(Version::is_prerelease)
        {
            return false;
        }

        if let Some(min) = &self.min {
            let ord = if self.float == FloatBehavior::Prerelease {
                version.cmp_components(min)
            } else {
                version.cmp(min)
            };
            match ord {
                Ordering::Less => return false,
                Ordering::Equal if !self.include_min && self.float == FloatBehavior::None => {
                    return false;
                }
                _ => {}
            }
        }

        if let Some(max) = &self.max {
            match version.cmp(max) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.include_max => return false,
                _ => {}
            }
        }

        if let Some(upper) = &self.implied_max
            && version.cmp_components(upper) != Ordering::Less
        {
            return false;
        }

        // Floating ranges imply an upper bound at the floated component.
        if let Some(min) = &self.min {
            let above = match self.float {
                FloatBehavior::Minor => Some(Version::new(min.major() + 1, 0, 0, 0)),
                FloatBehavior::Build => Some(Version::new(min.major(), min.minor() + 1, 0, 0)),
                FloatBehavior::Revision => {
                    Some(Version::new(min.major(), min.minor(), min.patch() + 1, 0))
                }
                _ => None,
            };
            if let Some(above) = above
                && version.cmp_components(&above) != Ordering::Less
            {
                return false;
            }
        }

        true
    }

    /// Whether this range pins a single version.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.include_min
            && self.include_max
            && matches!((&self.min, &self.max), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for VersionRange {
    /// The canonical formatter. Lock-file strings and range equality both go
    /// through this single implementation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.float {
            FloatBehavior::Major => return write!(f, "*"),
            FloatBehavior::AbsoluteLatest => return write!(f, "*-*"),
            FloatBehavior::Prerelease => {
                if let Some(min) = &self.min {
                    return write!(f, "{min}-*");
                }
            }
            FloatBehavior::Minor => {
                if let Some(min) = &self.min {
                    return write!(f, "{}.*", min.major());
                }
            }
            FloatBehavior::Build => {
                if let Some(min) = &self.min {
                    return write!(f, "{}.{}.*", min.major(), min.minor());
                }
            }
            FloatBehavior::Revision => {
                if let Some(min) = &self.min {
                    return write!(f, "{}.{}.{}.*", min.major(), min.minor(), min.patch());
                }
            }
            FloatBehavior::None => {}
        }

        if self.is_exact()
            && let Some(v) = &self.min
        {
            return write!(f, "= {v}");
        }
        let mut wrote = false;
        if let Some(min) = &self.min {
            write!(f, "{} {min}", if self.include_min { ">=" } else { ">" })?;
            wrote = true;
        }
        if let Some(max) = &self.max {
            if wrote {
                write!(f, " ")?;
            }
            write!(f, "{} {max}", if self.include_max { "<=" } else { "<" })?;
            wrote = true;
        }
        if !wrote {
            write!(f, "*")?;
        }
        Ok(())
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
