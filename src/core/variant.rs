//! Build variant configuration supplied by the orchestrator.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// CMake build type for a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildType {
    #[default]
    Debug,
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    /// Value passed as `CMAKE_BUILD_TYPE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::MinSizeRel => "MinSizeRel",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
            "minsizerel" => Ok(BuildType::MinSizeRel),
            _ => Err(format!(
                "invalid build type '{}'; expected Debug, Release, RelWithDebInfo or MinSizeRel",
                s
            )),
        }
    }
}

/// A named build configuration (e.g. `debug`) with one or more ABIs.
///
/// Owned by the caller; the generator only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConfiguration {
    /// Variant name, e.g. `debug` or `freeRelease`.
    pub name: String,
    /// CMake build type.
    pub build_type: BuildType,
    /// Path to the project's `CMakeLists.txt`.
    pub cmake_lists: PathBuf,
    /// Root folder of the NDK.
    pub ndk_dir: PathBuf,
    /// Root for per-ABI CMake build folders (`<root>/<abi>`).
    pub cxx_build_root: PathBuf,
    /// Root for per-ABI library outputs (`<root>/<abi>`).
    pub obj_root: PathBuf,
    /// Minimum Android API level.
    pub min_sdk: u32,
    /// Extra arguments passed to CMake verbatim, in order.
    pub arguments: Vec<String>,
    /// Extra C compiler flags.
    pub c_flags: Vec<String>,
    /// Extra C++ compiler flags.
    pub cxx_flags: Vec<String>,
}

impl VariantConfiguration {
    /// Create a variant with defaults for everything but the essentials.
    pub fn new(
        name: impl Into<String>,
        cmake_lists: impl Into<PathBuf>,
        ndk_dir: impl Into<PathBuf>,
        output_root: impl AsRef<Path>,
    ) -> Self {
        let name = name.into();
        let output_root = output_root.as_ref();
        VariantConfiguration {
            cxx_build_root: output_root.join("cxx").join(&name),
            obj_root: output_root.join("obj").join(&name),
            name,
            build_type: BuildType::Debug,
            cmake_lists: cmake_lists.into(),
            ndk_dir: ndk_dir.into(),
            min_sdk: 21,
            arguments: Vec::new(),
            c_flags: Vec::new(),
            cxx_flags: Vec::new(),
        }
    }

    /// Directory containing `CMakeLists.txt`.
    pub fn source_dir(&self) -> &Path {
        self.cmake_lists.parent().unwrap_or_else(|| Path::new("."))
    }

    /// The NDK's CMake toolchain file.
    pub fn ndk_toolchain_file(&self) -> PathBuf {
        self.ndk_dir
            .join("build")
            .join("cmake")
            .join("android.toolchain.cmake")
    }
}
