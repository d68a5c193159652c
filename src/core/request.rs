//! Build request files.
//!
//! A build request is the TOML document an orchestrator hands to `jsongen`
//! describing one variant, the ABIs to generate for, and the environment
//! the CMake process should see. Relative paths resolve against the
//! directory containing the request.
//!
//! ```toml
//! [variant]
//! name = "debug"
//! build-type = "Debug"
//! cmake-lists = "src/main/cpp/CMakeLists.txt"
//! output-dir = "build"
//! min-sdk = 21
//! abis = ["arm64-v8a", "x86_64"]
//! arguments = ["-DANDROID_STL=c++_shared"]
//!
//! [environment]
//! ANDROID_HOME = "/opt/android-sdk"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::core::abi::{Abi, AbiConfiguration};
use crate::core::variant::{BuildType, VariantConfiguration};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawRequest {
    variant: RawVariant,
    #[serde(default)]
    environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawVariant {
    name: String,
    #[serde(default)]
    build_type: Option<String>,
    cmake_lists: PathBuf,
    #[serde(default)]
    ndk: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,
    #[serde(default = "default_min_sdk")]
    min_sdk: u32,
    abis: Vec<String>,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    c_flags: Vec<String>,
    #[serde(default)]
    cxx_flags: Vec<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_min_sdk() -> u32 {
    21
}

/// A parsed build request.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub variant: VariantConfiguration,
    pub abis: Vec<AbiConfiguration>,
    /// Environment variables set on the CMake process.
    pub environment: BTreeMap<String, String>,
}

impl BuildRequest {
    /// Load a request from a file.
    ///
    /// `default_ndk` is used when the request does not name an NDK.
    pub fn load(path: &Path, default_ndk: Option<&Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read build request: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        Self::parse(&contents, base, default_ndk)
            .with_context(|| format!("failed to parse build request: {}", path.display()))
    }

    /// Parse a request from a string, resolving relative paths against `base`.
    pub fn parse(contents: &str, base: &Path, default_ndk: Option<&Path>) -> Result<Self> {
        let raw: RawRequest = toml::from_str(contents)?;
        let rv = raw.variant;

        if rv.abis.is_empty() {
            bail!("variant `{}` lists no ABIs", rv.name);
        }

        let ndk = match rv.ndk.or_else(|| default_ndk.map(Path::to_path_buf)) {
            Some(ndk) => base.join(ndk),
            None => bail!(
                "no NDK configured for variant `{}`; set `ndk` in the request or `[ndk] path` in config",
                rv.name
            ),
        };

        let mut variant = VariantConfiguration::new(
            rv.name,
            base.join(rv.cmake_lists),
            ndk,
            base.join(rv.output_dir),
        );
        if let Some(build_type) = rv.build_type {
            variant.build_type = build_type
                .parse::<BuildType>()
                .map_err(anyhow::Error::msg)?;
        }
        variant.min_sdk = rv.min_sdk;
        variant.arguments = rv.arguments;
        variant.c_flags = rv.c_flags;
        variant.cxx_flags = rv.cxx_flags;

        let mut abis = Vec::with_capacity(rv.abis.len());
        for name in &rv.abis {
            let abi: Abi = name.parse().map_err(anyhow::Error::msg)?;
            if abis.iter().any(|c: &AbiConfiguration| c.abi == abi) {
                bail!("ABI `{}` listed twice for variant `{}`", abi, variant.name);
            }
            abis.push(AbiConfiguration::for_variant(&variant, abi));
        }

        Ok(BuildRequest {
            variant,
            abis,
            environment: raw.environment,
        })
    }

    /// Keep only the ABIs named in `filter`. An empty filter keeps all.
    pub fn select_abis(&mut self, filter: &[String]) -> Result<()> {
        if filter.is_empty() {
            return Ok(());
        }

        for name in filter {
            if !self.abis.iter().any(|c| c.name() == name) {
                bail!(
                    "ABI `{}` is not part of variant `{}`",
                    name,
                    self.variant.name
                );
            }
        }

        self.abis.retain(|c| filter.iter().any(|f| f == c.name()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"
[variant]
name = "debug"
cmake-lists = "src/main/cpp/CMakeLists.txt"
ndk = "/sdk/ndk/25.2"
abis = ["arm64-v8a", "x86"]
arguments = ["-DANDROID_STL=c++_shared"]
cxx-flags = ["-std=c++17"]

[environment]
ANDROID_HOME = "/sdk"
"#;

    #[test]
    fn test_parse_request() {
        let req = BuildRequest::parse(REQUEST, Path::new("/proj/app"), None).unwrap();

        assert_eq!(req.variant.name, "debug");
        assert_eq!(req.variant.build_type, BuildType::Debug);
        assert_eq!(
            req.variant.cmake_lists,
            PathBuf::from("/proj/app/src/main/cpp/CMakeLists.txt")
        );
        assert_eq!(req.variant.arguments, vec!["-DANDROID_STL=c++_shared"]);
        assert_eq!(req.abis.len(), 2);
        assert_eq!(req.abis[0].abi, Abi::Arm64V8a);
        assert_eq!(req.abis[1].cxx_flags, vec!["-std=c++17"]);
        assert_eq!(req.environment.get("ANDROID_HOME").unwrap(), "/sdk");
    }

    #[test]
    fn test_default_ndk_used_when_missing() {
        let contents = REQUEST.replace("ndk = \"/sdk/ndk/25.2\"\n", "");
        let req =
            BuildRequest::parse(&contents, Path::new("/proj"), Some(Path::new("/opt/ndk"))).unwrap();
        assert_eq!(req.variant.ndk_dir, PathBuf::from("/opt/ndk"));

        let err = BuildRequest::parse(&contents, Path::new("/proj"), None).unwrap_err();
        assert!(err.to_string().contains("no NDK configured"));
    }

    #[test]
    fn test_unknown_and_duplicate_abis_rejected() {
        let unknown = REQUEST.replace("\"x86\"", "\"sparc\"");
        assert!(BuildRequest::parse(&unknown, Path::new("/p"), None).is_err());

        let duplicate = REQUEST.replace("\"x86\"", "\"arm64-v8a\"");
        let err = BuildRequest::parse(&duplicate, Path::new("/p"), None).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn test_select_abis() {
        let mut req = BuildRequest::parse(REQUEST, Path::new("/p"), None).unwrap();
        req.select_abis(&["x86".to_string()]).unwrap();
        assert_eq!(req.abis.len(), 1);
        assert_eq!(req.abis[0].abi, Abi::X86);

        assert!(req.select_abis(&["x86_64".to_string()]).is_err());
    }
}
