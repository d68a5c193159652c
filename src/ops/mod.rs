//! High-level operations.
//!
//! This module contains the implementation of jsongen commands.

pub mod generate;
pub mod version;

pub use generate::{describe, generate, locate_cmake, prepare, GenerateOptions, PreparedRequest};
pub use version::{detect, VersionReport};
