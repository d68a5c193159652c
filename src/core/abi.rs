//! Target ABIs and per-ABI build configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::variant::VariantConfiguration;

/// File name CMake writes the build description to.
pub const BUILD_JSON_NAME: &str = "android_gradle_build.json";

/// Host operating system the tools run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostPlatform {
    Windows,
    MacOs,
    Linux,
}

impl HostPlatform {
    /// Detect the host platform.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => HostPlatform::Windows,
            "macos" => HostPlatform::MacOs,
            _ => HostPlatform::Linux,
        }
    }

    /// Suffix appended to executable names on this host.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            HostPlatform::Windows => ".exe",
            HostPlatform::MacOs | HostPlatform::Linux => "",
        }
    }

    /// Append the host's executable suffix to `name`.
    pub fn executable(&self, name: &str) -> String {
        format!("{}{}", name, self.exe_suffix())
    }
}

/// A target instruction-set variant for native code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Abi {
    #[serde(rename = "armeabi")]
    Armeabi,
    #[serde(rename = "armeabi-v7a")]
    ArmeabiV7a,
    #[serde(rename = "arm64-v8a")]
    Arm64V8a,
    #[serde(rename = "x86")]
    X86,
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "mips")]
    Mips,
    #[serde(rename = "mips64")]
    Mips64,
}

impl Abi {
    pub const ALL: [Abi; 7] = [
        Abi::Armeabi,
        Abi::ArmeabiV7a,
        Abi::Arm64V8a,
        Abi::X86,
        Abi::X86_64,
        Abi::Mips,
        Abi::Mips64,
    ];

    /// Name used by the NDK and in `ANDROID_ABI`.
    pub fn name(&self) -> &'static str {
        match self {
            Abi::Armeabi => "armeabi",
            Abi::ArmeabiV7a => "armeabi-v7a",
            Abi::Arm64V8a => "arm64-v8a",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
            Abi::Mips => "mips",
            Abi::Mips64 => "mips64",
        }
    }

    pub fn is_64bit(&self) -> bool {
        matches!(self, Abi::Arm64V8a | Abi::X86_64 | Abi::Mips64)
    }

    /// Lowest platform level the NDK ships headers for with this ABI.
    pub fn min_platform(&self) -> u32 {
        if self.is_64bit() {
            21
        } else {
            16
        }
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Abi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Abi::ALL
            .iter()
            .copied()
            .find(|abi| abi.name() == s)
            .ok_or_else(|| format!("unknown ABI '{}'", s))
    }
}

/// Settings for generating the build description of one ABI.
///
/// Created once per configuration pass and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiConfiguration {
    pub abi: Abi,
    /// Platform API level passed as `ANDROID_PLATFORM`.
    pub platform: u32,
    /// CMake build folder; also where the JSON is written.
    pub json_folder: PathBuf,
    /// Expected path of the generated JSON.
    pub json_path: PathBuf,
    /// Folder for built shared libraries.
    pub obj_folder: PathBuf,
    /// CMake toolchain file.
    pub toolchain_file: PathBuf,
    pub c_flags: Vec<String>,
    pub cxx_flags: Vec<String>,
}

impl AbiConfiguration {
    /// Derive the configuration for `abi` from its variant.
    ///
    /// The platform is raised to the ABI's minimum when the variant asks
    /// for something older.
    pub fn for_variant(variant: &VariantConfiguration, abi: Abi) -> Self {
        let json_folder = variant.cxx_build_root.join(abi.name());
        AbiConfiguration {
            abi,
            platform: variant.min_sdk.max(abi.min_platform()),
            json_path: json_folder.join(BUILD_JSON_NAME),
            json_folder,
            obj_folder: variant.obj_root.join(abi.name()),
            toolchain_file: variant.ndk_toolchain_file(),
            c_flags: variant.c_flags.clone(),
            cxx_flags: variant.cxx_flags.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.abi.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_exe_suffix() {
        assert_eq!(HostPlatform::Windows.executable("ninja"), "ninja.exe");
        assert_eq!(HostPlatform::Linux.executable("ninja"), "ninja");
        assert_eq!(HostPlatform::MacOs.executable("cmake"), "cmake");
    }

    #[test]
    fn test_abi_round_trip_names() {
        for abi in Abi::ALL {
            assert_eq!(abi.name().parse::<Abi>().unwrap(), abi);
        }
        assert!("arm64".parse::<Abi>().is_err());
    }

    #[test]
    fn test_abi_serde_uses_ndk_names() {
        let json = serde_json::to_string(&Abi::Arm64V8a).unwrap();
        assert_eq!(json, "\"arm64-v8a\"");
    }

    #[test]
    fn test_for_variant_paths() {
        let variant = VariantConfiguration::new(
            "debug",
            "/proj/src/main/cpp/CMakeLists.txt",
            "/ndk",
            "/proj/build",
        );
        let config = AbiConfiguration::for_variant(&variant, Abi::Arm64V8a);

        assert_eq!(
            config.json_path,
            PathBuf::from("/proj/build/cxx/debug/arm64-v8a/android_gradle_build.json")
        );
        assert_eq!(config.obj_folder, PathBuf::from("/proj/build/obj/debug/arm64-v8a"));
        assert_eq!(
            config.toolchain_file,
            PathBuf::from("/ndk/build/cmake/android.toolchain.cmake")
        );
    }

    #[test]
    fn test_platform_raised_for_64bit() {
        let mut variant = VariantConfiguration::new("debug", "/p/CMakeLists.txt", "/ndk", "/out");
        variant.min_sdk = 16;

        assert_eq!(AbiConfiguration::for_variant(&variant, Abi::X86).platform, 16);
        assert_eq!(AbiConfiguration::for_variant(&variant, Abi::X86_64).platform, 21);
    }
}
