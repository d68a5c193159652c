//! Core data structures.
//!
//! - Tool versions and the policy that classifies them
//! - Variant and per-ABI configuration supplied by the orchestrator
//! - Build request files
//! - The generation error taxonomy

pub mod abi;
pub mod errors;
pub mod request;
pub mod variant;
pub mod version;

pub use abi::{Abi, AbiConfiguration, HostPlatform, BUILD_JSON_NAME};
pub use errors::GenerationError;
pub use request::BuildRequest;
pub use variant::{BuildType, VariantConfiguration};
pub use version::{ToolVersion, VersionPolicy};
