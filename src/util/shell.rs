//! Terminal output for the CLI.
//!
//! Status lines look like `   Generated arm64-v8a (build/arm64-v8a/...)`:
//! a right-aligned, colored verb followed by a message. Everything goes to
//! stderr so stdout stays clean for `jsongen args`.
//!
//! While several ABIs generate in parallel an `indicatif` bar tracks them;
//! [`Progress::status`] prints above it without tearing.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    #[default]
    Normal,
    /// No progress bar, debug logging
    Verbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Color when stderr is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

/// Verb printed at the start of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Detected,
    Selected,
    Generated,
    Finished,
    Info,
    Failed,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Detected => "Detected",
            Status::Selected => "Selected",
            Status::Generated => "Generated",
            Status::Finished => "Finished",
            Status::Info => "Info",
            Status::Failed => "Failed",
        }
    }

    fn ansi(self) -> &'static str {
        match self {
            Status::Detected | Status::Selected => "\x1b[1;36m",
            Status::Generated | Status::Finished => "\x1b[1;32m",
            Status::Info => "\x1b[1;34m",
            Status::Failed => "\x1b[1;31m",
        }
    }

    fn always_shown(self) -> bool {
        self == Status::Failed
    }
}

const LABEL_WIDTH: usize = 12;

/// Status line printer shared by every command.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    color: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let color = match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stderr().is_terminal(),
        };
        Shell { verbosity, color }
    }

    /// `--quiet` wins over `--verbose`.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        };
        Shell::new(verbosity, color)
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn use_color(&self) -> bool {
        self.color
    }

    /// Print `{status:>12} {msg}`. Quiet mode keeps only failures.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && !status.always_shown() {
            return;
        }
        eprintln!("{} {}", self.label(status), msg);
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    fn label(&self, status: Status) -> String {
        let padded = format!("{:>width$}", status.label(), width = LABEL_WIDTH);
        if self.color {
            format!("{}{}\x1b[0m", status.ansi(), padded)
        } else {
            padded
        }
    }

    /// A progress tracker over `total` items.
    ///
    /// The bar is only drawn in normal mode with more than one item.
    pub fn progress(self: &Arc<Self>, total: u64, msg: impl Display) -> Progress {
        let bar = (self.verbosity == Verbosity::Normal && total > 1).then(|| {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar.set_message(msg.to_string());
            bar
        });

        Progress {
            shell: Arc::clone(self),
            bar,
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// Progress across ABIs. Safe to advance from several threads.
pub struct Progress {
    shell: Arc<Shell>,
    bar: Option<ProgressBar>,
}

impl Progress {
    pub fn inc(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Print a status line above the bar.
    pub fn status(&self, status: Status, msg: impl Display) {
        match &self.bar {
            Some(bar) => bar.suspend(|| self.shell.status(status, msg)),
            None => self.shell.status(status, msg),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// `0.42s` under a minute, `1.5m` above.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
