//! Fake CMake installs and sample configurations.
//!
//! A fake install is a directory laid out like an SDK CMake package:
//! `source.properties` with a `Pkg.Revision`, and `bin/cmake` as a shell
//! script standing in for the real tool.

use std::path::{Path, PathBuf};

use crate::builder::cmake::{CMakeInstallation, SOURCE_PROPERTIES};
use crate::core::abi::HostPlatform;
use crate::core::variant::VariantConfiguration;

/// Package revision of the SDK CMake fork.
pub const FORK_REVISION: &str = "3.6.4111459";

/// Behaves like the SDK fork: writes the JSON into the `-B` folder.
pub const LEGACY_SCRIPT: &str = r#"#!/bin/sh
build=""
for arg in "$@"; do
  case "$arg" in
    -B*) build="${arg#-B}" ;;
  esac
done
echo "-- Configuring done"
echo "-- Build files have been written to: $build"
mkdir -p "$build"
printf '{"buildFiles":[],"cleanCommands":[],"libraries":{},"toolchains":{},"cFileExtensions":[],"cppFileExtensions":[]}\n' > "$build/android_gradle_build.json"
"#;

/// Exits 0 without writing anything.
pub const SILENT_SCRIPT: &str = r#"#!/bin/sh
echo "-- Configuring done"
exit 0
"#;

/// Like [`LEGACY_SCRIPT`] but fails for the x86 ABI.
pub const X86_FAILS_SCRIPT: &str = r#"#!/bin/sh
build=""
for arg in "$@"; do
  case "$arg" in
    -DANDROID_ABI=x86) echo "CMake Error: x86 is not supported" >&2; exit 1 ;;
    -B*) build="${arg#-B}" ;;
  esac
done
mkdir -p "$build"
echo '{}' > "$build/android_gradle_build.json"
"#;

/// Writes the JSON after printing a line that is not valid UTF-8.
pub const RAW_BYTES_SCRIPT: &str = r#"#!/bin/sh
build=""
for arg in "$@"; do
  case "$arg" in
    -B*) build="${arg#-B}" ;;
  esac
done
printf 'Found \377\376 toolchain\n'
mkdir -p "$build"
echo '{}' > "$build/android_gradle_build.json"
"#;

/// Answers a fixed server conversation, one reply per request frame.
pub const SERVER_SCRIPT: &str = r#"#!/bin/sh
frame() {
  printf '\n[== "CMake Server" ==[\n%s\n]== "CMake Server" ==]\n' "$1"
}
next_request() {
  while IFS= read -r line; do
    case "$line" in
      ']== "CMake Server" ==]') return 0 ;;
    esac
  done
  exit 0
}
frame '{"type":"hello","supportedProtocolVersions":[{"major":1,"minor":1}]}'
next_request
frame '{"type":"reply","inReplyTo":"handshake","cookie":"jsongen"}'
next_request
frame '{"type":"progress","inReplyTo":"configure","progressMessage":"Configuring","progressCurrent":1,"progressMaximum":1}'
frame '{"type":"message","inReplyTo":"configure","message":"-- Configuring done"}'
frame '{"type":"reply","inReplyTo":"configure"}'
next_request
frame '{"type":"reply","inReplyTo":"compute"}'
next_request
frame "{\"type\":\"reply\",\"inReplyTo\":\"codemodel\",\"configurations\":[{\"name\":\"Debug\",\"projects\":[{\"name\":\"app\",\"targets\":[{\"name\":\"native-lib\",\"type\":\"SHARED_LIBRARY\",\"artifacts\":[\"$PWD/libnative-lib.so\"],\"buildDirectory\":\"$PWD\",\"sourceDirectory\":\"/proj/src/main/cpp\",\"fileGroups\":[{\"language\":\"CXX\",\"compileFlags\":\"-O0\",\"sources\":[\"native-lib.cpp\"]}]}]}]}]}"
next_request
frame '{"type":"reply","inReplyTo":"cmakeInputs","sourceDirectory":"/proj/src/main/cpp","buildFiles":[{"isCMake":false,"isTemporary":false,"sources":["CMakeLists.txt"]}]}'
next_request
frame '{"type":"reply","inReplyTo":"cache","cache":[{"key":"CMAKE_CXX_COMPILER","value":"/ndk/clang++","type":"FILEPATH"}]}'
next_request
"#;

/// [`SERVER_SCRIPT`], but once stdin closes it reports a generate error
/// and exits with `code`.
pub fn failing_server_script(code: i32) -> String {
    SERVER_SCRIPT.replacen(
        "  done\n  exit 0\n",
        &format!("  done\n  echo \"CMake Error: generate step failed\" >&2\n  exit {code}\n"),
        1,
    )
}

/// A CMake install directory backed by a shell script.
#[derive(Debug, Clone)]
pub struct FakeCMake {
    root: PathBuf,
}

impl FakeCMake {
    /// Create an install at `root` reporting `revision`, running `script`.
    pub fn with_script(root: impl Into<PathBuf>, revision: &str, script: &str) -> Self {
        let root = root.into();
        let bin = root.join("bin");
        std::fs::create_dir_all(&bin).expect("failed to create fake cmake bin dir");
        std::fs::write(
            root.join(SOURCE_PROPERTIES),
            format!(
                "Pkg.Desc = CMake {revision}\nPkg.Revision = {revision}\nPkg.Path = cmake;{revision}\n"
            ),
        )
        .expect("failed to write source.properties");

        write_executable(&bin.join("cmake"), script);
        write_executable(&bin.join("ninja"), "#!/bin/sh\nexit 0\n");

        FakeCMake { root }
    }

    pub fn legacy(root: impl Into<PathBuf>, revision: &str) -> Self {
        Self::with_script(root, revision, LEGACY_SCRIPT)
    }

    pub fn server(root: impl Into<PathBuf>, revision: &str) -> Self {
        Self::with_script(root, revision, SERVER_SCRIPT)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn installation(&self) -> CMakeInstallation {
        CMakeInstallation::new(&self.root, HostPlatform::Linux)
    }
}

fn write_executable(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("failed to write fake executable");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to mark fake executable");
    }
}

/// The `debug` variant of a project rooted at `root`.
pub fn sample_variant(root: &Path) -> VariantConfiguration {
    let mut variant = VariantConfiguration::new(
        "debug",
        root.join("src/main/cpp/CMakeLists.txt"),
        root.join("ndk"),
        root.join("build"),
    );
    variant.arguments = vec!["-DANDROID_STL=c++_shared".to_string()];
    variant
}

/// A build request for [`sample_variant`]'s layout listing `abis`.
pub fn sample_request(abis: &[&str]) -> String {
    let abis = abis
        .iter()
        .map(|abi| format!("\"{}\"", abi))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"[variant]
name = "debug"
build-type = "Debug"
cmake-lists = "src/main/cpp/CMakeLists.txt"
ndk = "ndk"
output-dir = "build"
abis = [{abis}]
arguments = ["-DANDROID_STL=c++_shared"]
"#
    )
}
