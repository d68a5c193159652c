//! CMake version parsing and the policy that decides which versions are usable.
//!
//! Versions reported by CMake come in a few shapes:
//! - `3.10.2` from `cmake --version`
//! - `3.6.0-rc2` from the Android fork's `--version`
//! - `3.6.4111459` from the SDK package's `source.properties`
//!
//! Only the numeric `major.minor.micro` core takes part in comparisons.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::GenerationError;

/// Version of the SDK-packaged CMake fork that emits build JSON directly.
pub const DEFAULT_CUSTOM_FORK_VERSION: &str = "3.6.4111459";

/// Oldest upstream CMake that speaks the server protocol.
pub const DEFAULT_MINIMUM_VERSION: &str = "3.7.0";

/// A detected tool version at micro precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolVersion(semver::Version);

impl ToolVersion {
    /// Create a version from its components.
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        ToolVersion(semver::Version::new(major, minor, micro))
    }

    /// Parse a raw version string.
    ///
    /// Accepts `major.minor` and `major.minor.micro`, ignoring any suffix that
    /// starts at the first character that is neither a digit nor a dot.
    pub fn parse(raw: &str) -> Result<Self, GenerationError> {
        let malformed = || GenerationError::MalformedVersion {
            raw: raw.to_string(),
        };

        let core = raw
            .trim()
            .split(|c: char| !c.is_ascii_digit() && c != '.')
            .next()
            .unwrap_or("")
            .trim_end_matches('.');

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(malformed());
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| malformed())?;
        }

        Ok(ToolVersion::new(numbers[0], numbers[1], numbers[2]))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn micro(&self) -> u64 {
        self.0.patch
    }

    /// Check `self >= min` comparing major, then minor, then micro.
    pub fn is_at_least(&self, min: &ToolVersion) -> bool {
        self >= min
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0.major, self.0.minor, self.0.patch)
    }
}

impl FromStr for ToolVersion {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolVersion::parse(s)
    }
}

impl Serialize for ToolVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ToolVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ToolVersion::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Thresholds used when choosing a generation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPolicy {
    /// Exact version of the fork that always gets the legacy strategy.
    pub custom_fork: ToolVersion,
    /// Oldest version accepted for the server strategy.
    pub minimum: ToolVersion,
}

impl VersionPolicy {
    pub fn new(custom_fork: ToolVersion, minimum: ToolVersion) -> Self {
        VersionPolicy {
            custom_fork,
            minimum,
        }
    }

    /// Check whether `version` is the pinned fork.
    pub fn is_custom_fork(&self, version: &ToolVersion) -> bool {
        *version == self.custom_fork
    }
}

impl Default for VersionPolicy {
    fn default() -> Self {
        VersionPolicy {
            custom_fork: ToolVersion::new(3, 6, 4111459),
            minimum: ToolVersion::new(3, 7, 0),
        }
    }
}
