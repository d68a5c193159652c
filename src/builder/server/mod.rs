//! CMake server protocol (CMake 3.7 and later).
//!
//! CMake started with `-E server --experimental --debug` talks JSON over
//! stdin/stdout. Every message in either direction is framed as:
//!
//! ```text
//! [== "CMake Server" ==[
//! {"type":"handshake", ...}
//! ]== "CMake Server" ==]
//! ```
//!
//! [`session::ServerSession`] drives one conversation, [`model`] turns the
//! replies into a [`NativeBuildConfig`](crate::builder::json::NativeBuildConfig),
//! and [`run`] ties both to a live process.

pub mod model;
pub mod session;

use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::thread;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::errors::GenerationError;
use crate::util::log::BuildLogger;
use crate::util::process::{pump_lines, ProcessBuilder, ProcessOutput};

pub use model::{CacheEntry, CMakeInputs, CodeModel};
pub use session::ServerSession;

/// Opens a message frame.
pub const FRAME_START: &str = "[== \"CMake Server\" ==[";
/// Closes a message frame.
pub const FRAME_END: &str = "]== \"CMake Server\" ==]";

/// Protocol major version this client speaks.
pub const PROTOCOL_MAJOR: u64 = 1;

/// Frame a JSON value for writing to the server.
pub fn encode_frame(value: &Value) -> String {
    format!("\n{}\n{}\n{}\n", FRAME_START, value, FRAME_END)
}

/// Reads framed messages from a server's stdout.
///
/// Lines outside a frame are ignored. Every line read is appended to the
/// transcript, so the whole conversation can be saved afterwards.
pub struct FrameReader<R> {
    reader: R,
    transcript: String,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        FrameReader {
            reader,
            transcript: String::new(),
        }
    }

    /// Next frame body, or `None` at end of stream.
    ///
    /// End of stream inside a frame is an error.
    pub fn read_frame(&mut self) -> io::Result<Option<String>> {
        let mut body: Option<String> = None;
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return match body {
                    None => Ok(None),
                    Some(_) => Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream ended inside a CMake server frame",
                    )),
                };
            }
            self.transcript.push_str(&line);

            let trimmed = line.trim_end_matches(['\r', '\n']);
            match body.as_mut() {
                None if trimmed == FRAME_START => body = Some(String::new()),
                None => {}
                Some(text) if trimmed == FRAME_END => return Ok(Some(std::mem::take(text))),
                Some(text) => {
                    text.push_str(trimmed);
                    text.push('\n');
                }
            }
        }
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn into_transcript(self) -> String {
        self.transcript
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProtocolVersion {
    pub major: u64,
    #[serde(default)]
    pub minor: u64,
}

/// A message received from the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Hello {
        #[serde(default)]
        supported_protocol_versions: Vec<ProtocolVersion>,
    },

    #[serde(rename_all = "camelCase")]
    Reply {
        in_reply_to: String,
        #[serde(flatten)]
        body: Map<String, Value>,
    },

    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(default)]
        in_reply_to: String,
        error_message: String,
    },

    #[serde(rename_all = "camelCase")]
    Message {
        #[serde(default)]
        in_reply_to: String,
        message: String,
        #[serde(default)]
        title: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    Progress {
        #[serde(default)]
        in_reply_to: String,
        #[serde(default)]
        progress_message: String,
        #[serde(default)]
        progress_current: i64,
        #[serde(default)]
        progress_maximum: i64,
    },

    Signal {
        name: String,
    },

    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn parse(body: &str) -> Result<Self, GenerationError> {
        serde_json::from_str(body).map_err(|e| {
            GenerationError::protocol(format!("unreadable server message ({}): {}", e, body.trim()))
        })
    }
}

/// What one server-mode generation needs to know.
#[derive(Debug, Clone)]
pub struct ServerPlan {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub generator: String,
    pub cache_arguments: Vec<String>,
    pub model: model::ModelContext,
    pub json_path: PathBuf,
}

/// Drive a CMake server process through one configure-and-query session,
/// then write the build description to `plan.json_path`.
///
/// Stderr is streamed to `logger` while the session runs. The returned
/// stdout is the full framed conversation.
pub fn run(
    process: &ProcessBuilder,
    plan: &ServerPlan,
    log_name: &str,
    logger: &dyn BuildLogger,
) -> Result<ProcessOutput, GenerationError> {
    let mut child = process.spawn_interactive()?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (session_result, stderr) = thread::scope(|s| {
        let stderr_reader = s.spawn(|| pump_lines(stderr, log_name, logger));

        let session_result = match (stdout, stdin) {
            (Some(stdout), Some(stdin)) => {
                let mut session =
                    ServerSession::new(BufReader::new(stdout), stdin, log_name, logger);
                let result = converse(&mut session, plan);
                // Closing stdin ends the server.
                let (transcript, _) = session.finish();
                result.map(|()| transcript)
            }
            _ => Err(GenerationError::protocol("CMake server pipes were not opened")),
        };

        if session_result.is_err() {
            let _ = child.kill();
        }

        let stderr = stderr_reader
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stderr reader panicked")));
        (session_result, stderr)
    });

    let status = child.wait().map_err(|e| {
        GenerationError::io(
            format!("failed to wait for `{}`", process.get_program().display()),
            e,
        )
    })?;
    let transcript = session_result?;
    let stderr = stderr.map_err(|e| GenerationError::io("failed to read CMake server stderr", e))?;

    let output = ProcessOutput {
        exit_code: status.code(),
        stdout: transcript.into_bytes(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    };

    // A completed conversation still fails if the server exits non-zero.
    if !output.success() {
        return Err(GenerationError::ProcessExecution {
            command: process.display_command(),
            exit_code: output.exit_code,
            stderr_tail: output.stderr_tail(),
        });
    }

    Ok(output)
}

/// The request sequence of one generation.
pub fn converse<R: BufRead, W: Write>(
    session: &mut ServerSession<'_, R, W>,
    plan: &ServerPlan,
) -> Result<(), GenerationError> {
    session.handshake(&plan.source_dir, &plan.build_dir, &plan.generator)?;
    session.configure(&plan.cache_arguments)?;
    session.compute()?;

    let codemodel = session.codemodel()?;
    let inputs = session.cmake_inputs()?;
    let cache = session.cache()?;

    let config = plan.model.convert(&codemodel, &inputs, &cache);
    tracing::debug!(
        "server codemodel produced {} libraries for {}",
        config.libraries.len(),
        plan.model.abi
    );
    config.write(&plan.json_path)
}
