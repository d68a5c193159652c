//! CMake installation discovery and version detection.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::abi::HostPlatform;
use crate::core::errors::GenerationError;
use crate::core::version::ToolVersion;
use crate::util::process::{find_cmake, ProcessBuilder};

/// Name of the SDK package metadata file in a CMake install.
pub const SOURCE_PROPERTIES: &str = "source.properties";

/// A CMake install directory (the folder containing `bin/cmake`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeInstallation {
    root: PathBuf,
    host: HostPlatform,
}

impl CMakeInstallation {
    /// Use the install rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, host: HostPlatform) -> Self {
        CMakeInstallation {
            root: root.into(),
            host,
        }
    }

    /// Find CMake from an explicit install dir, or on PATH.
    pub fn locate(configured: Option<&Path>, host: HostPlatform) -> Result<Self> {
        if let Some(root) = configured {
            if !root.is_dir() {
                bail!("configured CMake directory does not exist: {}", root.display());
            }
            return Ok(CMakeInstallation::new(root, host));
        }

        // cmake on PATH lives in <root>/bin/cmake
        let Some(exe) = find_cmake() else {
            bail!(
                "CMake not found\n\
                 \n\
                 Set `[cmake] path` in .jsongen/config.toml or pass --cmake,\n\
                 or install CMake and ensure it's in your PATH."
            );
        };
        let exe = exe.canonicalize().unwrap_or(exe);
        let root = exe
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(CMakeInstallation::new(root, host))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn host(&self) -> HostPlatform {
        self.host
    }

    /// Path to the `cmake` executable.
    pub fn cmake_exe(&self) -> PathBuf {
        self.root.join("bin").join(self.host.executable("cmake"))
    }

    /// Path to the `ninja` executable shipped next to CMake.
    pub fn ninja_exe(&self) -> PathBuf {
        self.root.join("bin").join(self.host.executable("ninja"))
    }

    /// Detect the installed version.
    ///
    /// The SDK package revision in `source.properties` wins over
    /// `cmake --version`, since the Android fork reports an upstream
    /// release candidate number there.
    pub fn detect_version(&self) -> Result<ToolVersion, GenerationError> {
        let properties = self.root.join(SOURCE_PROPERTIES);
        if properties.is_file() {
            let contents = std::fs::read_to_string(&properties).map_err(|e| {
                GenerationError::io(format!("failed to read {}", properties.display()), e)
            })?;
            if let Some(revision) = parse_package_revision(&contents) {
                tracing::debug!("CMake revision {} from {}", revision, properties.display());
                return ToolVersion::parse(revision);
            }
        }

        self.version_from_executable()
    }

    fn version_from_executable(&self) -> Result<ToolVersion, GenerationError> {
        let cmake = self.cmake_exe();
        let output = ProcessBuilder::new(&cmake).arg("--version").exec()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(GenerationError::ProcessExecution {
                command: format!("{} --version", cmake.display()),
                exit_code: output.status.code(),
                stderr_tail: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let raw = parse_version_output(&stdout).ok_or_else(|| GenerationError::MalformedVersion {
            raw: stdout.lines().next().unwrap_or_default().to_string(),
        })?;
        ToolVersion::parse(raw)
    }
}

/// Extract `Pkg.Revision` from a `source.properties` file.
pub fn parse_package_revision(contents: &str) -> Option<&str> {
    contents.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == "Pkg.Revision").then(|| value.trim())
    })
}

/// Extract the version from `cmake --version` output ("cmake version 3.10.2").
pub fn parse_version_output(stdout: &str) -> Option<&str> {
    stdout.lines().find_map(|line| {
        line.trim()
            .strip_prefix("cmake version ")
            .map(str::trim)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_executable_paths_follow_host() {
        let windows = CMakeInstallation::new("C:/sdk/cmake/3.10.2", HostPlatform::Windows);
        assert!(windows.ninja_exe().ends_with("bin/ninja.exe"));
        assert!(windows.cmake_exe().ends_with("bin/cmake.exe"));

        let linux = CMakeInstallation::new("/sdk/cmake/3.10.2", HostPlatform::Linux);
        assert_eq!(linux.ninja_exe(), PathBuf::from("/sdk/cmake/3.10.2/bin/ninja"));
    }

    #[test]
    fn test_parse_package_revision() {
        let props = "Pkg.Desc = CMake 3.6.4111459\nPkg.Revision = 3.6.4111459\nPkg.Path = cmake;3.6.4111459\n";
        assert_eq!(parse_package_revision(props), Some("3.6.4111459"));
        assert_eq!(parse_package_revision("Pkg.Revision=3.10.2"), Some("3.10.2"));
        assert_eq!(parse_package_revision("Pkg.Desc = CMake"), None);
    }

    #[test]
    fn test_parse_version_output() {
        let out = "cmake version 3.10.2\n\nCMake suite maintained and supported by Kitware (kitware.com/cmake).\n";
        assert_eq!(parse_version_output(out), Some("3.10.2"));
        assert_eq!(parse_version_output("ninja 1.8.2"), None);
    }

    #[test]
    fn test_detect_version_prefers_source_properties() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(SOURCE_PROPERTIES),
            "Pkg.Revision = 3.6.4111459\n",
        )
        .unwrap();

        let install = CMakeInstallation::new(tmp.path(), HostPlatform::Linux);
        assert_eq!(
            install.detect_version().unwrap(),
            ToolVersion::new(3, 6, 4111459)
        );
    }

    #[test]
    fn test_detect_version_without_cmake_fails_to_launch() {
        let tmp = TempDir::new().unwrap();
        let install = CMakeInstallation::new(tmp.path(), HostPlatform::Linux);

        assert!(matches!(
            install.detect_version(),
            Err(GenerationError::ProcessLaunch { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_version_from_executable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let cmake = bin.join("cmake");
        std::fs::write(&cmake, "#!/bin/sh\necho 'cmake version 3.18.1-g262b901'\n").unwrap();
        std::fs::set_permissions(&cmake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let install = CMakeInstallation::new(tmp.path(), HostPlatform::Linux);
        assert_eq!(install.detect_version().unwrap(), ToolVersion::new(3, 18, 1));
    }

    #[test]
    fn test_locate_rejects_missing_dir() {
        let err = CMakeInstallation::locate(
            Some(Path::new("/no/such/cmake/dir")),
            HostPlatform::Linux,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
