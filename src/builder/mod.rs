//! Build description generation.
//!
//! This module turns a variant configuration into per-ABI
//! `android_gradle_build.json` files by driving CMake.

pub mod args;
pub mod cmake;
pub mod generator;
pub mod json;
pub mod server;
pub mod stats;
pub mod strategy;

pub use args::ArgumentBuilder;
pub use cmake::CMakeInstallation;
pub use generator::{AbiReport, GenerationInputs, GenerationReport, JsonGenerator};
pub use json::NativeBuildConfig;
pub use stats::{JsonLinesStats, MemoryStats, NoopStats, StatsRecord, StatsRecorder};
pub use strategy::{classify, select_strategy, GenerationStrategy};
