//! Choosing how build JSON gets generated for a CMake version.
//!
//! Two strategies exist:
//! - [`GenerationStrategy::LegacyDirect`]: the SDK CMake fork writes the JSON
//!   itself through its `Android Gradle - Ninja` generator.
//! - [`GenerationStrategy::InteractiveServer`]: upstream CMake 3.7+ is driven
//!   through its server protocol and the JSON is assembled from the codemodel.
//!
//! The fork check runs before the range check. The fork is pinned to a 3.6
//! version number, so testing the range first would reject it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::builder::stats::{StatsRecord, StatsRecorder};
use crate::core::errors::GenerationError;
use crate::core::version::{ToolVersion, VersionPolicy};

/// How the build description is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationStrategy {
    LegacyDirect,
    InteractiveServer,
}

impl GenerationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStrategy::LegacyDirect => "legacy-direct",
            GenerationStrategy::InteractiveServer => "interactive-server",
        }
    }
}

impl fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `version` under `policy`.
pub fn classify(
    version: &ToolVersion,
    policy: &VersionPolicy,
) -> Result<GenerationStrategy, GenerationError> {
    // Must stay ahead of the range check below.
    if policy.is_custom_fork(version) {
        return Ok(GenerationStrategy::LegacyDirect);
    }

    if !version.is_at_least(&policy.minimum) {
        return Err(GenerationError::UnsupportedVersion {
            version: version.to_string(),
            minimum: policy.minimum.to_string(),
        });
    }

    Ok(GenerationStrategy::InteractiveServer)
}

/// Record the detected version for `variant`, then classify it.
pub fn select_strategy(
    variant: &str,
    version: &ToolVersion,
    policy: &VersionPolicy,
    stats: &dyn StatsRecorder,
) -> Result<GenerationStrategy, GenerationError> {
    stats.record(StatsRecord::ToolVersion {
        variant: variant.to_string(),
        version: version.to_string(),
    });

    let strategy = classify(version, policy)?;

    tracing::debug!("CMake {} uses the {} strategy", version, strategy);
    stats.record(StatsRecord::StrategyChosen {
        variant: variant.to_string(),
        strategy,
    });

    Ok(strategy)
}
