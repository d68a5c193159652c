//! CMake argument assembly.
//!
//! Arguments are rebuilt for every ABI on every call. Toolchain paths can
//! depend on the environment, so nothing here is cached.
//!
//! Order matters: CMake seeds its cache in argument order, and a stable
//! order keeps `cmake_build_command.txt` comparable between runs.

use std::path::Path;

use crate::builder::cmake::CMakeInstallation;
use crate::builder::strategy::GenerationStrategy;
use crate::core::abi::AbiConfiguration;
use crate::core::variant::VariantConfiguration;

/// Generator name understood by the SDK CMake fork.
pub const ANDROID_NINJA_GENERATOR: &str = "Android Gradle - Ninja";

/// Generator requested from upstream CMake in server mode.
pub const SERVER_GENERATOR: &str = "Ninja";

/// Arguments that start CMake in server mode.
pub const SERVER_LAUNCH_ARGS: [&str; 4] = ["-E", "server", "--experimental", "--debug"];

/// Builds CMake arguments for one variant under a fixed strategy.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentBuilder<'a> {
    variant: &'a VariantConfiguration,
    cmake: &'a CMakeInstallation,
    strategy: GenerationStrategy,
}

impl<'a> ArgumentBuilder<'a> {
    pub fn new(
        variant: &'a VariantConfiguration,
        cmake: &'a CMakeInstallation,
        strategy: GenerationStrategy,
    ) -> Self {
        ArgumentBuilder {
            variant,
            cmake,
            strategy,
        }
    }

    /// Cache variable definitions shared by every strategy.
    pub fn common_cache_arguments(&self, abi: &AbiConfiguration) -> Vec<String> {
        let mut args = vec![
            define("ANDROID_ABI", abi.name()),
            define("ANDROID_PLATFORM", format!("android-{}", abi.platform)),
            define("CMAKE_LIBRARY_OUTPUT_DIRECTORY", path_str(&abi.obj_folder)),
            define("CMAKE_BUILD_TYPE", self.variant.build_type.as_str()),
            define("ANDROID_NDK", path_str(&self.variant.ndk_dir)),
        ];

        if !abi.c_flags.is_empty() {
            args.push(define("CMAKE_C_FLAGS", abi.c_flags.join(" ")));
        }
        if !abi.cxx_flags.is_empty() {
            args.push(define("CMAKE_CXX_FLAGS", abi.cxx_flags.join(" ")));
        }

        args.extend(self.variant.arguments.iter().cloned());
        args
    }

    /// Cache arguments for the selected strategy.
    ///
    /// Both strategies point CMake at the NDK toolchain file and the ninja
    /// binary shipped with CMake.
    pub fn cache_arguments(&self, abi: &AbiConfiguration) -> Vec<String> {
        let mut args = self.common_cache_arguments(abi);
        args.push(define("CMAKE_TOOLCHAIN_FILE", path_str(&abi.toolchain_file)));
        args.push(define("CMAKE_MAKE_PROGRAM", path_str(&self.cmake.ninja_exe())));
        args
    }

    /// Full argument list for the CMake process, excluding the program.
    pub fn build_arguments(&self, abi: &AbiConfiguration) -> Vec<String> {
        match self.strategy {
            GenerationStrategy::LegacyDirect => {
                let mut args = vec![
                    format!("-H{}", path_str(self.variant.source_dir())),
                    format!("-B{}", path_str(&abi.json_folder)),
                ];
                args.extend(self.cache_arguments(abi));
                args.push(format!("-G{}", ANDROID_NINJA_GENERATOR));
                args
            }
            GenerationStrategy::InteractiveServer => {
                SERVER_LAUNCH_ARGS.iter().map(|s| s.to_string()).collect()
            }
        }
    }
}

fn define(name: &str, value: impl AsRef<str>) -> String {
    format!("-D{}={}", name, value.as_ref())
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::abi::{Abi, HostPlatform};

    fn variant() -> VariantConfiguration {
        let mut variant = VariantConfiguration::new(
            "debug",
            "/proj/src/main/cpp/CMakeLists.txt",
            "/sdk/ndk/25.2",
            "/proj/build",
        );
        variant.arguments = vec!["-DANDROID_STL=c++_shared".to_string()];
        variant.cxx_flags = vec!["-std=c++17".to_string(), "-frtti".to_string()];
        variant
    }

    #[test]
    fn test_common_arguments_order() {
        let variant = variant();
        let cmake = CMakeInstallation::new("/sdk/cmake/3.6.4111459", HostPlatform::Linux);
        let abi = AbiConfiguration::for_variant(&variant, Abi::Arm64V8a);
        let builder = ArgumentBuilder::new(&variant, &cmake, GenerationStrategy::LegacyDirect);

        assert_eq!(
            builder.common_cache_arguments(&abi),
            vec![
                "-DANDROID_ABI=arm64-v8a",
                "-DANDROID_PLATFORM=android-21",
                "-DCMAKE_LIBRARY_OUTPUT_DIRECTORY=/proj/build/obj/debug/arm64-v8a",
                "-DCMAKE_BUILD_TYPE=Debug",
                "-DANDROID_NDK=/sdk/ndk/25.2",
                "-DCMAKE_CXX_FLAGS=-std=c++17 -frtti",
                "-DANDROID_STL=c++_shared",
            ]
        );
    }

    #[test]
    fn test_legacy_arguments() {
        let variant = variant();
        let cmake = CMakeInstallation::new("/sdk/cmake/3.6.4111459", HostPlatform::Linux);
        let abi = AbiConfiguration::for_variant(&variant, Abi::Arm64V8a);
        let args = ArgumentBuilder::new(&variant, &cmake, GenerationStrategy::LegacyDirect)
            .build_arguments(&abi);

        assert_eq!(args[0], "-H/proj/src/main/cpp");
        assert_eq!(args[1], "-B/proj/build/cxx/debug/arm64-v8a");
        assert_eq!(args.last().unwrap(), "-GAndroid Gradle - Ninja");

        let n = args.len();
        assert_eq!(
            args[n - 3],
            "-DCMAKE_TOOLCHAIN_FILE=/sdk/ndk/25.2/build/cmake/android.toolchain.cmake"
        );
        assert_eq!(
            args[n - 2],
            "-DCMAKE_MAKE_PROGRAM=/sdk/cmake/3.6.4111459/bin/ninja"
        );
    }

    #[test]
    fn test_arguments_are_deterministic() {
        let variant = variant();
        let cmake = CMakeInstallation::new("/sdk/cmake/3.10.2", HostPlatform::Linux);
        let abi = AbiConfiguration::for_variant(&variant, Abi::X86);

        for strategy in [
            GenerationStrategy::LegacyDirect,
            GenerationStrategy::InteractiveServer,
        ] {
            let builder = ArgumentBuilder::new(&variant, &cmake, strategy);
            assert_eq!(builder.build_arguments(&abi), builder.build_arguments(&abi));
            assert_eq!(builder.cache_arguments(&abi), builder.cache_arguments(&abi));
        }
    }

    #[test]
    fn test_ninja_suffix_follows_host() {
        let variant = variant();
        let abi = AbiConfiguration::for_variant(&variant, Abi::ArmeabiV7a);

        let windows = CMakeInstallation::new("C:/sdk/cmake/3.6.4111459", HostPlatform::Windows);
        let args = ArgumentBuilder::new(&variant, &windows, GenerationStrategy::LegacyDirect)
            .build_arguments(&abi);
        let make = args
            .iter()
            .find(|a| a.starts_with("-DCMAKE_MAKE_PROGRAM="))
            .unwrap();
        assert!(make.ends_with("ninja.exe"));

        let linux = CMakeInstallation::new("/sdk/cmake/3.6.4111459", HostPlatform::Linux);
        let args = ArgumentBuilder::new(&variant, &linux, GenerationStrategy::LegacyDirect)
            .build_arguments(&abi);
        let make = args
            .iter()
            .find(|a| a.starts_with("-DCMAKE_MAKE_PROGRAM="))
            .unwrap();
        assert!(make.ends_with("/bin/ninja"));
        assert!(!make.ends_with(".exe"));
    }

    #[test]
    fn test_server_launch_arguments() {
        let variant = variant();
        let cmake = CMakeInstallation::new("/sdk/cmake/3.10.2", HostPlatform::Linux);
        let abi = AbiConfiguration::for_variant(&variant, Abi::X86_64);
        let builder = ArgumentBuilder::new(&variant, &cmake, GenerationStrategy::InteractiveServer);

        assert_eq!(
            builder.build_arguments(&abi),
            vec!["-E", "server", "--experimental", "--debug"]
        );
        let cache = builder.cache_arguments(&abi);
        assert!(cache.iter().all(|a| a.starts_with("-D")));
        assert!(!cache.iter().any(|a| a.starts_with("-G")));
    }
}
