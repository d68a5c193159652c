//! Server replies and their conversion to a build description.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::builder::json::{NativeBuildConfig, NativeLibrary, NativeSourceFile, NativeToolchain};
use crate::util::hash::Fingerprint;

/// Placeholder the caller replaces with the targets it wants built.
pub const TARGETS_PLACEHOLDER: &str = "{LIST_OF_TARGETS_TO_BUILD}";

/// Target kinds that produce something worth listing.
const ARTIFACT_KINDS: [&str; 3] = ["SHARED_LIBRARY", "STATIC_LIBRARY", "EXECUTABLE"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeModel {
    #[serde(default)]
    pub configurations: Vec<ModelConfiguration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfiguration {
    pub name: String,
    #[serde(default)]
    pub projects: Vec<ModelProject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProject {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<ModelTarget>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTarget {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
    #[serde(default)]
    pub build_directory: PathBuf,
    #[serde(default)]
    pub source_directory: PathBuf,
    #[serde(default)]
    pub file_groups: Vec<FileGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileGroup {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub compile_flags: Option<String>,
    #[serde(default)]
    pub include_path: Vec<IncludePath>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludePath {
    pub path: PathBuf,
    #[serde(default)]
    pub is_system: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CMakeInputs {
    #[serde(default)]
    pub build_files: Vec<BuildFileGroup>,
    #[serde(default)]
    pub source_directory: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFileGroup {
    #[serde(default)]
    pub is_cmake: bool,
    #[serde(default)]
    pub is_temporary: bool,
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Per-ABI facts the server does not report.
#[derive(Debug, Clone)]
pub struct ModelContext {
    pub abi: String,
    pub build_dir: PathBuf,
    pub ninja: PathBuf,
}

impl ModelContext {
    /// Assemble the build description for this ABI.
    pub fn convert(
        &self,
        codemodel: &CodeModel,
        inputs: &CMakeInputs,
        cache: &[CacheEntry],
    ) -> NativeBuildConfig {
        let ninja = format!("{} -C {}", quote(&self.ninja), quote(&self.build_dir));

        let mut config = NativeBuildConfig {
            build_files: build_files(inputs),
            clean_commands: vec![format!("{} clean", ninja)],
            build_targets_command: Some(format!("{} {}", ninja, TARGETS_PLACEHOLDER)),
            ..NativeBuildConfig::default()
        };

        let toolchain = toolchain_from_cache(cache);
        let toolchain_key = toolchain_key(&toolchain);
        config.toolchains.insert(toolchain_key.clone(), toolchain);

        for configuration in &codemodel.configurations {
            for project in &configuration.projects {
                for target in &project.targets {
                    if !ARTIFACT_KINDS.contains(&target.kind.as_str()) {
                        continue;
                    }

                    let key = format!("{}-{}-{}", target.name, configuration.name, self.abi);
                    let library = NativeLibrary {
                        abi: self.abi.clone(),
                        artifact_name: target.name.clone(),
                        build_command: format!("{} {}", ninja, target.name),
                        build_type: configuration.name.to_lowercase(),
                        output: target.artifacts.first().cloned(),
                        toolchain: toolchain_key.clone(),
                        files: source_files(target, &mut config),
                    };
                    config.libraries.insert(key, library);
                }
            }
        }

        config
    }
}

/// User-owned CMake scripts; generated and CMake-internal files are dropped.
fn build_files(inputs: &CMakeInputs) -> Vec<PathBuf> {
    let mut files = BTreeSet::new();
    for group in inputs
        .build_files
        .iter()
        .filter(|g| !g.is_cmake && !g.is_temporary)
    {
        for source in &group.sources {
            files.insert(resolve(&inputs.source_directory, source));
        }
    }
    files.into_iter().collect()
}

fn source_files(target: &ModelTarget, config: &mut NativeBuildConfig) -> Vec<NativeSourceFile> {
    let mut files = Vec::new();

    for group in &target.file_groups {
        let extensions = match group.language.as_deref() {
            Some("C") => Some(&mut config.c_file_extensions),
            Some("CXX") => Some(&mut config.cpp_file_extensions),
            _ => None,
        };
        let Some(extensions) = extensions else {
            continue;
        };

        let flags = group_flags(group);
        for source in &group.sources {
            if let Some(ext) = source.extension() {
                extensions.insert(ext.to_string_lossy().into_owned());
            }
            files.push(NativeSourceFile {
                src: resolve(&target.source_directory, source),
                flags: (!flags.is_empty()).then(|| flags.clone()),
                working_directory: Some(target.build_directory.clone()),
            });
        }
    }

    files
}

fn group_flags(group: &FileGroup) -> String {
    let mut flags: Vec<String> = Vec::new();
    if let Some(compile) = group.compile_flags.as_deref().map(str::trim) {
        if !compile.is_empty() {
            flags.push(compile.to_string());
        }
    }
    for include in &group.include_path {
        let switch = if include.is_system { "-isystem " } else { "-I" };
        flags.push(format!("{}{}", switch, quote(&include.path)));
    }
    for define in &group.defines {
        flags.push(format!("-D{}", define));
    }
    flags.join(" ")
}

fn toolchain_from_cache(cache: &[CacheEntry]) -> NativeToolchain {
    let lookup = |key: &str| {
        cache
            .iter()
            .find(|entry| entry.key == key && !entry.value.is_empty())
            .map(|entry| PathBuf::from(&entry.value))
    };
    NativeToolchain {
        c_compiler_executable: lookup("CMAKE_C_COMPILER"),
        cpp_compiler_executable: lookup("CMAKE_CXX_COMPILER"),
    }
}

fn toolchain_key(toolchain: &NativeToolchain) -> String {
    let c = toolchain
        .c_compiler_executable
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());
    let cpp = toolchain
        .cpp_compiler_executable
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());

    let mut fp = Fingerprint::new();
    fp.update_opt(c.as_deref()).update_opt(cpp.as_deref());
    fp.finish_short()
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn quote(path: &Path) -> String {
    let text = path.to_string_lossy();
    if text.contains(' ') {
        format!("\"{}\"", text)
    } else {
        text.into_owned()
    }
}
