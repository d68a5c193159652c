//! Configuration file support for jsongen.
//!
//! jsongen reads two configuration file locations:
//! - Global: `~/.jsongen/config.toml` - User-wide defaults
//! - Project: `.jsongen/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.
//!
//! ```toml
//! [cmake]
//! path = "/opt/android-sdk/cmake/3.10.2.4988404"
//! custom-fork-version = "3.6.4111459"
//! minimum-version = "3.7.0"
//!
//! [ndk]
//! path = "/opt/android-sdk/ndk/25.2.9519653"
//!
//! [output]
//! stats = "build/jsongen-stats.jsonl"
//! jobs = 4
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::version::{ToolVersion, VersionPolicy};

/// jsongen configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cmake: CMakeConfig,
    pub ndk: NdkConfig,
    pub output: OutputConfig,
}

/// CMake discovery and version policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CMakeConfig {
    /// CMake install directory (the folder containing `bin/cmake`)
    pub path: Option<PathBuf>,

    /// Version of the SDK CMake fork that writes JSON directly
    pub custom_fork_version: Option<String>,

    /// Oldest upstream CMake with a usable server mode
    pub minimum_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NdkConfig {
    /// NDK used when a build request does not name one
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append telemetry records to this JSON lines file
    pub stats: Option<PathBuf>,

    /// Default number of ABIs generated in parallel (None = auto-detect)
    pub jobs: Option<usize>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.cmake.path.is_some() {
            self.cmake.path = other.cmake.path;
        }
        if other.cmake.custom_fork_version.is_some() {
            self.cmake.custom_fork_version = other.cmake.custom_fork_version;
        }
        if other.cmake.minimum_version.is_some() {
            self.cmake.minimum_version = other.cmake.minimum_version;
        }

        if other.ndk.path.is_some() {
            self.ndk.path = other.ndk.path;
        }

        if other.output.stats.is_some() {
            self.output.stats = other.output.stats;
        }
        if other.output.jobs.is_some() {
            self.output.jobs = other.output.jobs;
        }
    }

    /// Version policy with configured overrides applied.
    pub fn version_policy(&self) -> Result<VersionPolicy> {
        let defaults = VersionPolicy::default();

        let custom_fork = match &self.cmake.custom_fork_version {
            Some(raw) => ToolVersion::parse(raw)
                .with_context(|| "invalid `[cmake] custom-fork-version`")?,
            None => defaults.custom_fork,
        };
        let minimum = match &self.cmake.minimum_version {
            Some(raw) => {
                ToolVersion::parse(raw).with_context(|| "invalid `[cmake] minimum-version`")?
            }
            None => defaults.minimum,
        };

        Ok(VersionPolicy::new(custom_fork, minimum))
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.jsongen/config.toml)
/// 2. Global config (~/.jsongen/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global jsongen config directory (~/.jsongen).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".jsongen"))
}

/// Get the global config path (~/.jsongen/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.jsongen/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".jsongen").join("config.toml")
}
