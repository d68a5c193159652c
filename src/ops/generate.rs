//! Implementation of `jsongen generate` and `jsongen args`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};

use crate::builder::cmake::CMakeInstallation;
use crate::builder::generator::{GenerationInputs, GenerationReport, JsonGenerator};
use crate::builder::stats::{JsonLinesStats, NoopStats, StatsRecorder};
use crate::core::abi::HostPlatform;
use crate::core::request::BuildRequest;
use crate::util::config::Config;
use crate::util::shell::{format_duration, Shell, Status};

/// Options for generating build descriptions.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Build request file describing the variant
    pub request: PathBuf,

    /// Only generate these ABIs (empty = every ABI in the request)
    pub abis: Vec<String>,

    /// Number of ABIs generated in parallel (None = auto-detect)
    pub jobs: Option<usize>,

    /// Append telemetry records to this JSON lines file
    pub stats: Option<PathBuf>,

    /// CMake install directory, overriding `[cmake] path`
    pub cmake: Option<PathBuf>,
}

/// A loaded request and the generator configured for it.
pub struct PreparedRequest {
    pub request: BuildRequest,
    pub generator: JsonGenerator,
}

/// Load the request, find CMake and configure a generator.
pub fn prepare(
    opts: &GenerateOptions,
    config: &Config,
    stats: Arc<dyn StatsRecorder>,
) -> Result<PreparedRequest> {
    let mut request = BuildRequest::load(&opts.request, config.ndk.path.as_deref())?;
    request.select_abis(&opts.abis)?;

    let cmake = locate_cmake(opts.cmake.as_deref(), config)?;
    let version = cmake.detect_version()?;
    let policy = config.version_policy()?;

    let generator = JsonGenerator::new(request.variant.clone(), cmake, version)
        .with_policy(policy)
        .with_environment(request.environment.clone())
        .with_stats(stats);

    Ok(PreparedRequest { request, generator })
}

/// Generate JSON for every selected ABI of a request.
///
/// Per-ABI failures are returned in the report rather than as an error, so
/// the caller sees every outcome.
pub fn generate(
    opts: &GenerateOptions,
    config: &Config,
    shell: &Arc<Shell>,
) -> Result<GenerationReport> {
    let stats = open_stats(opts.stats.as_ref().or(config.output.stats.as_ref()))?;
    let PreparedRequest { request, generator } = prepare(opts, config, stats)?;

    shell.status(
        Status::Detected,
        format!(
            "CMake {} at {}",
            generator.version(),
            generator.cmake().root().display()
        ),
    );
    if let Ok(strategy) = generator.strategy() {
        shell.status(
            Status::Selected,
            format!("{} strategy for `{}`", strategy, request.variant.name),
        );
    }

    let start = Instant::now();
    let progress = shell.progress(request.abis.len() as u64, "Generating");
    let report = generator.build_all_with(
        &request.abis,
        opts.jobs.or(config.output.jobs),
        |outcome| {
            match &outcome.result {
                Ok(path) => progress.status(
                    Status::Generated,
                    format!("{} ({})", outcome.abi, path.display()),
                ),
                Err(err) => progress.status(
                    Status::Failed,
                    format!("{}: {}", outcome.abi, err.root_cause()),
                ),
            }
            progress.inc();
        },
    );
    progress.finish();

    if report.is_success() {
        shell.status(
            Status::Finished,
            format!(
                "{} ABI(s) of `{}` in {}",
                report.outcomes.len(),
                report.variant,
                format_duration(start.elapsed())
            ),
        );
    }

    Ok(report)
}

/// What the chosen strategy would run for one ABI, without running it.
pub fn describe(opts: &GenerateOptions, config: &Config, abi: &str) -> Result<GenerationInputs> {
    let prepared = prepare(opts, config, Arc::new(NoopStats))?;
    let Some(abi_config) = prepared.request.abis.iter().find(|c| c.name() == abi) else {
        bail!(
            "ABI `{}` is not part of variant `{}`",
            abi,
            prepared.request.variant.name
        );
    };

    Ok(prepared.generator.inputs(abi_config)?)
}

/// Find CMake: an explicit directory, then `[cmake] path`, then PATH.
pub fn locate_cmake(explicit: Option<&Path>, config: &Config) -> Result<CMakeInstallation> {
    let configured = explicit.or(config.cmake.path.as_deref());
    CMakeInstallation::locate(configured, HostPlatform::current())
}

fn open_stats(path: Option<&PathBuf>) -> Result<Arc<dyn StatsRecorder>> {
    match path {
        Some(path) => {
            let stats = JsonLinesStats::open(path)
                .with_context(|| format!("failed to open stats file {}", path.display()))?;
            Ok(Arc::new(stats))
        }
        None => Ok(Arc::new(NoopStats)),
    }
}
