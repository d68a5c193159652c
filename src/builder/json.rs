//! The native build description consumed by downstream compile steps.
//!
//! The legacy CMake fork writes this file itself. In server mode it is
//! assembled from the codemodel (see [`crate::builder::server::model`]).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::GenerationError;

/// Contents of `android_gradle_build.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeBuildConfig {
    /// Files whose change invalidates this description.
    #[serde(default)]
    pub build_files: Vec<PathBuf>,
    #[serde(default)]
    pub clean_commands: Vec<String>,
    /// Builds several targets at once; `{LIST_OF_TARGETS_TO_BUILD}` is
    /// replaced by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_targets_command: Option<String>,
    #[serde(default)]
    pub libraries: BTreeMap<String, NativeLibrary>,
    #[serde(default)]
    pub toolchains: BTreeMap<String, NativeToolchain>,
    #[serde(default)]
    pub c_file_extensions: BTreeSet<String>,
    #[serde(default)]
    pub cpp_file_extensions: BTreeSet<String>,
}

/// One buildable artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeLibrary {
    pub abi: String,
    pub artifact_name: String,
    pub build_command: String,
    pub build_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Key into [`NativeBuildConfig::toolchains`].
    pub toolchain: String,
    #[serde(default)]
    pub files: Vec<NativeSourceFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeSourceFile {
    pub src: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeToolchain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_compiler_executable: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpp_compiler_executable: Option<PathBuf>,
}

impl NativeBuildConfig {
    /// Read a build description from disk.
    pub fn read(path: &Path) -> Result<Self, GenerationError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GenerationError::io(format!("failed to read {}", path.display()), e))?;
        serde_json::from_str(&contents).map_err(|e| {
            GenerationError::io(
                format!("invalid build description {}", path.display()),
                e.into(),
            )
        })
    }

    /// Write as pretty-printed JSON, creating the parent folder.
    pub fn write(&self, path: &Path) -> Result<(), GenerationError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            GenerationError::io(format!("failed to serialize {}", path.display()), e.into())
        })?;
        crate::util::fs::write_file(path, &json)
            .map_err(|e| GenerationError::io(format!("failed to write {}", path.display()), e))
    }

    /// Libraries built for `abi`.
    pub fn libraries_for_abi<'a>(
        &'a self,
        abi: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a NativeLibrary)> + 'a {
        self.libraries.iter().filter(move |(_, lib)| lib.abi == abi)
    }
}
