//! User-facing error reports.
//!
//! Every reported failure carries its root cause, any context that helps
//! locate the problem (command line, stderr tail, file), and a concrete fix.
//!
//! ```text
//! error: CMake exited with code 1
//!   --> /proj/build/x86/cmake_build_output.txt
//!   | command: cmake -H/proj/src/main/cpp ...
//!   | CMake Error: ...
//!
//! help: consider:
//!   1. See cmake_build_output.txt in the ABI's build folder ...
//! ```

use std::fmt::{self, Write as _};
use std::path::PathBuf;

/// Fixes offered by more than one error.
pub mod suggestions {
    pub const CHECK_CMAKE_INSTALL: &str =
        "Check that `[cmake] path` in .jsongen/config.toml points at a CMake install";

    pub const USE_SDK_CMAKE: &str =
        "Or point `[cmake] path` at the SDK-packaged CMake 3.6.4111459";

    pub const READ_BUILD_OUTPUT: &str =
        "See cmake_build_output.txt in the ABI's build folder for the full CMake output";
}

const RED: &str = "\x1b[1;31m";
const GREEN: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

/// An error report with context lines and numbered suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<PathBuf>,
    pub context: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, line: impl Into<String>) -> Self {
        self.context.push(line.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Prefix the message with `[tag] `.
    pub fn tagged(mut self, tag: &str) -> Self {
        self.message = format!("[{}] {}", tag, self.message);
        self
    }

    /// Render for a terminal, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let paint = |code: &str, text: &str| {
            if color {
                format!("{}{}{}", code, text, RESET)
            } else {
                text.to_string()
            }
        };

        let mut out = String::new();
        let _ = writeln!(out, "{}: {}", paint(RED, "error"), self.message);

        if let Some(path) = &self.location {
            let _ = writeln!(out, "  --> {}", path.display());
        }
        for line in &self.context {
            let _ = writeln!(out, "  | {}", line);
        }

        if !self.suggestions.is_empty() {
            let _ = writeln!(out, "\n{}: consider:", paint(GREEN, "help"));
            for (n, suggestion) in self.suggestions.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", n + 1, suggestion);
            }
        }

        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
