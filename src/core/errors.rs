//! Error taxonomy for JSON generation.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error raised while generating a native build description.
///
/// Version errors apply to a whole variant; everything else is scoped to a
/// single ABI and is wrapped in [`GenerationError::JsonGenerationFailed`]
/// by the generator.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum GenerationError {
    #[error("malformed CMake version `{raw}`")]
    #[diagnostic(
        code(jsongen::version::malformed),
        help("expected a version such as `3.10.2`")
    )]
    MalformedVersion { raw: String },

    #[error("unsupported CMake version {version}; {minimum} or later is required")]
    #[diagnostic(code(jsongen::version::unsupported))]
    UnsupportedVersion { version: String, minimum: String },

    #[error("failed to launch `{program}`")]
    #[diagnostic(code(jsongen::process::launch))]
    ProcessLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with exit code {}", display_code(*.exit_code))]
    #[diagnostic(code(jsongen::process::execution))]
    ProcessExecution {
        command: String,
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("CMake finished but did not produce {}", .json_path.display())]
    #[diagnostic(code(jsongen::generate::incomplete))]
    GenerationIncomplete { abi: String, json_path: PathBuf },

    #[error("CMake server protocol error: {message}")]
    #[diagnostic(code(jsongen::server::protocol))]
    ServerProtocol { message: String },

    #[error("{context}")]
    #[diagnostic(code(jsongen::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON generation failed for ABI `{abi}`")]
    #[diagnostic(code(jsongen::generate::failed))]
    JsonGenerationFailed {
        abi: String,
        #[source]
        cause: Box<GenerationError>,
    },
}

fn display_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

impl GenerationError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        GenerationError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        GenerationError::ServerProtocol {
            message: message.into(),
        }
    }

    /// Wrap a per-ABI cause into the umbrella failure.
    pub fn for_abi(abi: impl Into<String>, cause: GenerationError) -> Self {
        match cause {
            already @ GenerationError::JsonGenerationFailed { .. } => already,
            cause => GenerationError::JsonGenerationFailed {
                abi: abi.into(),
                cause: Box::new(cause),
            },
        }
    }

    /// The innermost cause, looking through `JsonGenerationFailed`.
    pub fn root_cause(&self) -> &GenerationError {
        match self {
            GenerationError::JsonGenerationFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Version errors stop generation for every ABI of a variant.
    pub fn is_variant_wide(&self) -> bool {
        matches!(
            self.root_cause(),
            GenerationError::MalformedVersion { .. } | GenerationError::UnsupportedVersion { .. }
        )
    }

    /// ABI the failure belongs to, if any.
    pub fn abi(&self) -> Option<&str> {
        match self {
            GenerationError::JsonGenerationFailed { abi, .. }
            | GenerationError::GenerationIncomplete { abi, .. } => Some(abi),
            _ => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GenerationError::MalformedVersion { raw } => {
                Diagnostic::error(format!("could not parse CMake version `{}`", raw))
                    .with_suggestion(suggestions::CHECK_CMAKE_INSTALL)
            }

            GenerationError::UnsupportedVersion { version, minimum } => Diagnostic::error(
                format!("CMake {} is not supported for native JSON generation", version),
            )
            .with_context("CMake 3.6 and earlier lack the server protocol")
            .with_suggestion(format!("Install CMake {} or later", minimum))
            .with_suggestion(suggestions::USE_SDK_CMAKE),

            GenerationError::ProcessLaunch { program, source } => {
                Diagnostic::error(format!("could not start `{}`", program.display()))
                    .with_context(source.to_string())
                    .with_suggestion(suggestions::CHECK_CMAKE_INSTALL)
            }

            GenerationError::ProcessExecution {
                command,
                exit_code,
                stderr_tail,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "CMake exited with code {}",
                    display_code(*exit_code)
                ))
                .with_context(format!("command: {}", command));

                for line in stderr_tail.lines() {
                    diag = diag.with_context(line.to_string());
                }

                diag.with_suggestion(suggestions::READ_BUILD_OUTPUT)
            }

            GenerationError::GenerationIncomplete { abi, json_path } => Diagnostic::error(
                format!("CMake exited successfully but wrote no JSON for `{}`", abi),
            )
            .with_location(json_path)
            .with_suggestion(suggestions::READ_BUILD_OUTPUT),

            GenerationError::ServerProtocol { message } => {
                Diagnostic::error("CMake server session failed")
                    .with_context(message.clone())
                    .with_suggestion(suggestions::READ_BUILD_OUTPUT)
            }

            GenerationError::Io { context, source } => {
                Diagnostic::error(context.clone()).with_context(source.to_string())
            }

            GenerationError::JsonGenerationFailed { abi, cause } => {
                cause.to_diagnostic().tagged(abi)
            }
        }
    }
}
