//! Per-ABI build description generation.
//!
//! [`JsonGenerator`] is created once per variant. The orchestrator calls
//! [`JsonGenerator::build`] once per ABI, from one thread or several, and
//! reads [`JsonGenerator::configuration_failures`] afterwards to decide
//! whether the overall build fails.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::builder::args::{ArgumentBuilder, SERVER_GENERATOR};
use crate::builder::cmake::CMakeInstallation;
use crate::builder::server::{self, model::ModelContext, ServerPlan};
use crate::builder::stats::{NoopStats, StatsRecord, StatsRecorder};
use crate::builder::strategy::{select_strategy, GenerationStrategy};
use crate::core::abi::AbiConfiguration;
use crate::core::errors::GenerationError;
use crate::core::variant::VariantConfiguration;
use crate::core::version::{ToolVersion, VersionPolicy};
use crate::util::fs::{ensure_dir, remove_file_if_exists, write_file};
use crate::util::hash::Fingerprint;
use crate::util::log::{BuildLogger, TracingLogger};
use crate::util::process::{execute_and_capture, ProcessBuilder};

/// Command line of the last invocation, next to the JSON.
pub const BUILD_COMMAND_FILE: &str = "cmake_build_command.txt";

/// Captured stdout of the last invocation, next to the JSON.
pub const BUILD_OUTPUT_FILE: &str = "cmake_build_output.txt";

/// Generates build descriptions for the ABIs of one variant.
pub struct JsonGenerator {
    variant: VariantConfiguration,
    cmake: CMakeInstallation,
    version: ToolVersion,
    policy: VersionPolicy,
    environment: BTreeMap<String, String>,
    stats: Arc<dyn StatsRecorder>,
    logger: Arc<dyn BuildLogger>,
    strategy: Mutex<Option<GenerationStrategy>>,
    failures: Mutex<BTreeSet<String>>,
}

/// Everything that determines the generated output for one ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationInputs {
    pub variant: String,
    pub abi: String,
    pub strategy: GenerationStrategy,
    pub cmake: PathBuf,
    pub version: String,
    pub arguments: Vec<String>,
    pub cache_arguments: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub json_path: PathBuf,
}

impl JsonGenerator {
    pub fn new(
        variant: VariantConfiguration,
        cmake: CMakeInstallation,
        version: ToolVersion,
    ) -> Self {
        JsonGenerator {
            variant,
            cmake,
            version,
            policy: VersionPolicy::default(),
            environment: BTreeMap::new(),
            stats: Arc::new(NoopStats),
            logger: Arc::new(TracingLogger),
            strategy: Mutex::new(None),
            failures: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Environment variables set on every CMake process.
    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_stats(mut self, stats: Arc<dyn StatsRecorder>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn BuildLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn variant(&self) -> &VariantConfiguration {
        &self.variant
    }

    pub fn cmake(&self) -> &CMakeInstallation {
        &self.cmake
    }

    pub fn version(&self) -> &ToolVersion {
        &self.version
    }

    /// The strategy for this variant, selected on first use.
    ///
    /// Once selected it never changes. A version error is not memoized, so
    /// every caller sees it.
    pub fn strategy(&self) -> Result<GenerationStrategy, GenerationError> {
        let mut slot = self.strategy.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(strategy) = *slot {
            return Ok(strategy);
        }

        let strategy = select_strategy(
            &self.variant.name,
            &self.version,
            &self.policy,
            self.stats.as_ref(),
        )?;
        *slot = Some(strategy);
        Ok(strategy)
    }

    /// Start a new invocation with an empty failure set.
    pub fn reset_failures(&self) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// ABIs that failed since the last reset.
    pub fn configuration_failures(&self) -> BTreeSet<String> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_failure(&self, abi: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(abi.to_string());
    }

    fn log_name(&self, abi: &AbiConfiguration) -> String {
        format!("{}-{}", self.variant.name, abi.name())
    }

    /// Generate the build description for `abi`, returning its path.
    pub fn build(&self, abi: &AbiConfiguration) -> Result<PathBuf, GenerationError> {
        self.build_timed(abi).0
    }

    fn build_timed(&self, abi: &AbiConfiguration) -> (Result<PathBuf, GenerationError>, u64) {
        let start = Instant::now();
        let result = self.generate(abi);
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = result.map_err(|cause| {
            self.record_failure(abi.name());
            let err = GenerationError::for_abi(abi.name(), cause);
            self.logger.error(&format!(
                "{}: {}",
                self.log_name(abi),
                err.root_cause()
            ));
            err
        });

        self.stats.record(StatsRecord::AbiOutcome {
            variant: self.variant.name.clone(),
            abi: abi.name().to_string(),
            success: result.is_ok(),
            duration_ms,
            error: result.as_ref().err().map(|e| e.root_cause().to_string()),
        });

        (result, duration_ms)
    }

    fn generate(&self, abi: &AbiConfiguration) -> Result<PathBuf, GenerationError> {
        let strategy = self.strategy()?;
        let args = ArgumentBuilder::new(&self.variant, &self.cmake, strategy);
        let log_name = self.log_name(abi);

        ensure_dir(&abi.json_folder).map_err(|e| {
            GenerationError::io(
                format!("failed to create {}", abi.json_folder.display()),
                e,
            )
        })?;
        if remove_file_if_exists(&abi.json_path)
            .map_err(|e| GenerationError::io(format!("failed to remove {}", abi.json_path.display()), e))?
        {
            tracing::debug!("removed stale {}", abi.json_path.display());
        }

        let program = self.cmake.cmake_exe();
        let arguments = args.build_arguments(abi);
        let process = ProcessBuilder::new(&program)
            .args(&arguments)
            .envs(&self.environment)
            .cwd(&abi.json_folder);

        self.write_artifact(
            abi,
            BUILD_COMMAND_FILE,
            command_record(&process, strategy, &args, abi).as_bytes(),
        )?;
        tracing::info!("{}: generating with {} ({})", log_name, self.version, strategy);

        let output = match strategy {
            GenerationStrategy::LegacyDirect => {
                let mut argv = vec![program.to_string_lossy().into_owned()];
                argv.extend(arguments);
                execute_and_capture(
                    &abi.json_folder,
                    &log_name,
                    &argv,
                    &self.environment,
                    self.logger.as_ref(),
                )?
            }
            GenerationStrategy::InteractiveServer => {
                let plan = ServerPlan {
                    source_dir: self.variant.source_dir().to_path_buf(),
                    build_dir: abi.json_folder.clone(),
                    generator: SERVER_GENERATOR.to_string(),
                    cache_arguments: args.cache_arguments(abi),
                    model: ModelContext {
                        abi: abi.name().to_string(),
                        build_dir: abi.json_folder.clone(),
                        ninja: self.cmake.ninja_exe(),
                    },
                    json_path: abi.json_path.clone(),
                };
                server::run(&process, &plan, &log_name, self.logger.as_ref())?
            }
        };

        self.write_artifact(abi, BUILD_OUTPUT_FILE, &output.stdout)?;

        if !abi.json_path.is_file() {
            return Err(GenerationError::GenerationIncomplete {
                abi: abi.name().to_string(),
                json_path: abi.json_path.clone(),
            });
        }

        Ok(abi.json_path.clone())
    }

    fn write_artifact(
        &self,
        abi: &AbiConfiguration,
        name: &str,
        contents: &[u8],
    ) -> Result<(), GenerationError> {
        let path = abi.json_folder.join(name);
        write_file(&path, contents)
            .map_err(|e| GenerationError::io(format!("failed to write {}", path.display()), e))
    }

    /// Snapshot of what determines the output for `abi`.
    pub fn inputs(&self, abi: &AbiConfiguration) -> Result<GenerationInputs, GenerationError> {
        let strategy = self.strategy()?;
        let args = ArgumentBuilder::new(&self.variant, &self.cmake, strategy);

        Ok(GenerationInputs {
            variant: self.variant.name.clone(),
            abi: abi.name().to_string(),
            strategy,
            cmake: self.cmake.cmake_exe(),
            version: self.version.to_string(),
            arguments: args.build_arguments(abi),
            cache_arguments: args.cache_arguments(abi),
            environment: self.environment.clone(),
            json_path: abi.json_path.clone(),
        })
    }

    /// SHA-256 over [`inputs`](Self::inputs). Equal fingerprints mean an
    /// identical invocation.
    pub fn configuration_fingerprint(
        &self,
        abi: &AbiConfiguration,
    ) -> Result<String, GenerationError> {
        let inputs = self.inputs(abi)?;
        let cmake = inputs.cmake.to_string_lossy();
        let json_path = inputs.json_path.to_string_lossy();

        let mut fp = Fingerprint::new();
        fp.update_str(&inputs.variant)
            .update_str(&inputs.abi)
            .update_str(inputs.strategy.as_str())
            .update_str(&cmake)
            .update_str(&inputs.version)
            .update_str(&json_path);
        fp.update_str("arguments")
            .update_strs(inputs.arguments.iter().map(String::as_str));
        fp.update_str("cache")
            .update_strs(inputs.cache_arguments.iter().map(String::as_str));
        fp.update_str("environment");
        for (key, value) in &inputs.environment {
            fp.update_str(key).update_str(value);
        }
        Ok(fp.finish())
    }

    /// Generate every ABI in parallel as one invocation.
    ///
    /// The failure set is reset first. A version error aborts all ABIs
    /// before any process starts.
    pub fn build_all(&self, abis: &[AbiConfiguration], jobs: Option<usize>) -> GenerationReport {
        self.build_all_with(abis, jobs, |_| {})
    }

    /// [`build_all`](Self::build_all), calling `on_done` as each ABI finishes.
    pub fn build_all_with<F>(
        &self,
        abis: &[AbiConfiguration],
        jobs: Option<usize>,
        on_done: F,
    ) -> GenerationReport
    where
        F: Fn(&AbiReport) + Sync,
    {
        self.reset_failures();

        let strategy = match self.strategy() {
            Ok(strategy) => strategy,
            Err(err) => {
                for abi in abis {
                    self.record_failure(abi.name());
                    self.stats.record(StatsRecord::AbiOutcome {
                        variant: self.variant.name.clone(),
                        abi: abi.name().to_string(),
                        success: false,
                        duration_ms: 0,
                        error: Some(err.to_string()),
                    });
                }
                return GenerationReport {
                    variant: self.variant.name.clone(),
                    strategy: None,
                    aborted: Some(err),
                    outcomes: Vec::new(),
                };
            }
        };

        let run = || -> Vec<AbiReport> {
            abis.par_iter()
                .map(|abi| {
                    let (result, duration_ms) = self.build_timed(abi);
                    let report = AbiReport {
                        abi: abi.name().to_string(),
                        duration_ms,
                        result,
                    };
                    on_done(&report);
                    report
                })
                .collect()
        };

        let pool = jobs.and_then(|j| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(j)
                .build()
                .ok()
        });
        let outcomes = match pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        GenerationReport {
            variant: self.variant.name.clone(),
            strategy: Some(strategy),
            aborted: None,
            outcomes,
        }
    }
}

fn command_record(
    process: &ProcessBuilder,
    strategy: GenerationStrategy,
    args: &ArgumentBuilder<'_>,
    abi: &AbiConfiguration,
) -> String {
    let mut record = format!(
        "Executable : {}\narguments : \n",
        process.get_program().display()
    );
    for arg in process.get_args() {
        record.push_str(arg);
        record.push('\n');
    }
    if strategy == GenerationStrategy::InteractiveServer {
        record.push_str("cacheArguments : \n");
        for arg in args.cache_arguments(abi) {
            record.push_str(&arg);
            record.push('\n');
        }
    }
    record
}

/// Outcome of one ABI inside [`GenerationReport`].
#[derive(Debug)]
pub struct AbiReport {
    pub abi: String,
    pub duration_ms: u64,
    pub result: Result<PathBuf, GenerationError>,
}

/// Result of [`JsonGenerator::build_all`].
#[derive(Debug)]
pub struct GenerationReport {
    pub variant: String,
    pub strategy: Option<GenerationStrategy>,
    /// Set when a variant-wide error stopped every ABI.
    pub aborted: Option<GenerationError>,
    pub outcomes: Vec<AbiReport>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &PathBuf)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|p| (o.abi.as_str(), p)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &GenerationError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.abi.as_str(), e)))
    }
}
