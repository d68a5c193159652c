//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;

use crate::core::errors::GenerationError;
use crate::util::log::BuildLogger;

/// Number of trailing stderr lines kept for error reports.
pub const STDERR_TAIL_LINES: usize = 20;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Everything written to stdout, byte for byte.
    pub stdout: Vec<u8>,
    /// Stderr, decoded lossily for reports.
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The last [`STDERR_TAIL_LINES`] lines of stderr.
    pub fn stderr_tail(&self) -> String {
        tail_lines(&self.stderr, STDERR_TAIL_LINES)
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set several environment variables.
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    fn launch_error(&self, source: io::Error) -> GenerationError {
        GenerationError::ProcessLaunch {
            program: self.program.clone(),
            source,
        }
    }

    /// Execute the command and wait for completion, capturing output.
    pub fn exec(&self) -> Result<Output, GenerationError> {
        self.build_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.launch_error(e))
    }

    /// Execute while streaming output lines to `logger`.
    ///
    /// Each stdout and stderr line is logged at info level as it arrives,
    /// prefixed with `log_name`. Stdout is also buffered verbatim and
    /// returned. A non-zero exit fails with
    /// [`GenerationError::ProcessExecution`] carrying the stderr tail.
    pub fn exec_streaming(
        &self,
        log_name: &str,
        logger: &dyn BuildLogger,
    ) -> Result<ProcessOutput, GenerationError> {
        tracing::debug!("running {}", self.display_command());

        let mut child = self
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout, stderr) = thread::scope(|s| {
            let stderr_reader = s.spawn(|| pump_lines(stderr, log_name, logger));
            let stdout = pump_lines(stdout, log_name, logger);
            let stderr = stderr_reader
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stderr reader panicked")));
            (stdout, stderr)
        });

        let status = child.wait().map_err(|e| {
            GenerationError::io(format!("failed to wait for `{}`", self.program.display()), e)
        })?;

        let read_error = |e: io::Error| {
            GenerationError::io(
                format!("failed to read output of `{}`", self.program.display()),
                e,
            )
        };
        let output = ProcessOutput {
            exit_code: status.code(),
            stdout: stdout.map_err(read_error)?,
            stderr: String::from_utf8_lossy(&stderr.map_err(read_error)?).into_owned(),
        };

        if !output.success() {
            return Err(GenerationError::ProcessExecution {
                command: self.display_command(),
                exit_code: output.exit_code,
                stderr_tail: output.stderr_tail(),
            });
        }

        Ok(output)
    }

    /// Spawn with stdin, stdout and stderr all piped, for interactive use.
    pub fn spawn_interactive(&self) -> Result<Child, GenerationError> {
        tracing::debug!("starting {}", self.display_command());

        self.build_command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| quote_arg(a)));
        parts.join(" ")
    }
}

/// Run `argv` in `working_dir`, streaming output to `logger` under `log_name`.
///
/// `argv[0]` is the program. The environment is inherited, then `env` is
/// applied on top.
pub fn execute_and_capture(
    working_dir: &Path,
    log_name: &str,
    argv: &[String],
    env: &BTreeMap<String, String>,
    logger: &dyn BuildLogger,
) -> Result<ProcessOutput, GenerationError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(GenerationError::ProcessLaunch {
            program: PathBuf::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
        });
    };

    ProcessBuilder::new(program)
        .args(args)
        .envs(env)
        .cwd(working_dir)
        .exec_streaming(log_name, logger)
}

/// Read `reader` line by line, logging each line and returning every byte read.
pub(crate) fn pump_lines<R: Read>(
    reader: Option<R>,
    log_name: &str,
    logger: &dyn BuildLogger,
) -> io::Result<Vec<u8>> {
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };

    let mut reader = BufReader::new(reader);
    let mut captured = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        captured.extend_from_slice(&line);

        let text = String::from_utf8_lossy(&line);
        logger.info(&format!(
            "{}: {}",
            log_name,
            text.trim_end_matches(['\r', '\n'])
        ));
    }

    Ok(captured)
}

/// Keep the last `n` lines of `text`.
pub fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

fn quote_arg(arg: &str) -> String {
    if arg.contains(' ') {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find CMake on PATH.
pub fn find_cmake() -> Option<PathBuf> {
    find_executable("cmake")
}
