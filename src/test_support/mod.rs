//! Test utilities for jsongen unit tests.
//!
//! Most generator tests need a CMake that behaves in a known way. The
//! fixtures here build throwaway installs whose `bin/cmake` is a shell
//! script, so they only run on unix.
//!
//! # Example
//!
//! ```rust,ignore
//! use jsongen::test_support::{FakeCMake, sample_variant, FORK_REVISION};
//!
//! #[test]
//! fn test_example() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     let cmake = FakeCMake::legacy(tmp.path().join("cmake"), FORK_REVISION);
//!     let variant = sample_variant(tmp.path());
//!     // Build a JsonGenerator from these...
//! }
//! ```

pub mod fixtures;

pub use fixtures::*;

/// Assertion helpers for testing.
pub mod assertions {
    use std::path::Path;

    /// Assert that a file on disk contains `content`.
    pub fn assert_file_contains(path: impl AsRef<Path>, content: &str) {
        let path = path.as_ref();
        let actual = std::fs::read_to_string(path)
            .unwrap_or_else(|_| panic!("file not found: {}", path.display()));
        assert!(
            actual.contains(content),
            "file {} does not contain '{}'\nactual content:\n{}",
            path.display(),
            content,
            actual
        );
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::*;
    use super::*;
    use crate::core::request::BuildRequest;
    use tempfile::TempDir;

    #[test]
    fn test_fake_cmake_layout() {
        let tmp = TempDir::new().unwrap();
        let cmake = FakeCMake::legacy(tmp.path().join("cmake"), FORK_REVISION);

        assert!(cmake.installation().cmake_exe().is_file());
        assert!(cmake.installation().ninja_exe().is_file());
        assert_file_contains(
            cmake.root().join("source.properties"),
            "Pkg.Revision = 3.6.4111459",
        );
    }

    #[test]
    fn test_sample_request_parses() {
        let tmp = TempDir::new().unwrap();
        let request =
            BuildRequest::parse(&sample_request(&["arm64-v8a", "x86"]), tmp.path(), None).unwrap();

        assert_eq!(request.variant, sample_variant(tmp.path()));
        assert_eq!(request.abis.len(), 2);
    }
}
