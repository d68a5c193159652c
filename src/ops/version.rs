//! Implementation of `jsongen version`.

use std::path::Path;

use anyhow::Result;

use crate::builder::cmake::CMakeInstallation;
use crate::builder::strategy::{classify, GenerationStrategy};
use crate::core::errors::GenerationError;
use crate::core::version::ToolVersion;
use crate::ops::generate::locate_cmake;
use crate::util::config::Config;

/// A detected CMake and how it would be driven.
#[derive(Debug)]
pub struct VersionReport {
    pub cmake: CMakeInstallation,
    pub version: ToolVersion,
    /// `Err` when the version is below the supported minimum.
    pub strategy: Result<GenerationStrategy, GenerationError>,
}

/// Detect the CMake version and classify it under the configured policy.
///
/// An unparsable version is an error; an unsupported one is reported in
/// [`VersionReport::strategy`].
pub fn detect(explicit: Option<&Path>, config: &Config) -> Result<VersionReport> {
    let cmake = locate_cmake(explicit, config)?;
    let version = cmake.detect_version()?;
    let policy = config.version_policy()?;
    let strategy = classify(&version, &policy);

    Ok(VersionReport {
        cmake,
        version,
        strategy,
    })
}
