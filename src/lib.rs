//! jsongen - native build descriptions for Android ABIs
//!
//! This crate provides the library functionality behind the `jsongen`
//! binary: CMake version detection, strategy selection, argument building,
//! process invocation and the per-ABI generator facade.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for jsongen unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides fake CMake installs and sample requests.
#[cfg(test)]
pub mod test_support;

pub use builder::{GenerationReport, GenerationStrategy, JsonGenerator};
pub use core::{AbiConfiguration, BuildRequest, GenerationError, ToolVersion, VariantConfiguration};
pub use util::config::Config;
