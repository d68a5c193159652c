//! One request/reply conversation with a CMake server.

use std::io::{BufRead, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use super::model::{CacheEntry, CMakeInputs, CodeModel};
use super::{encode_frame, FrameReader, ServerMessage, PROTOCOL_MAJOR};
use crate::core::errors::GenerationError;
use crate::util::log::BuildLogger;

/// Cookie sent with the handshake and echoed back in its reply.
pub const HANDSHAKE_COOKIE: &str = "jsongen";

/// A client session over any reader/writer pair.
///
/// The reader carries the server's stdout and the writer its stdin. Only
/// one request is in flight at a time; messages that are not the awaited
/// reply are logged and skipped.
pub struct ServerSession<'a, R, W> {
    frames: FrameReader<R>,
    writer: W,
    log_name: &'a str,
    logger: &'a dyn BuildLogger,
    greeted: bool,
}

impl<'a, R: BufRead, W: Write> ServerSession<'a, R, W> {
    pub fn new(reader: R, writer: W, log_name: &'a str, logger: &'a dyn BuildLogger) -> Self {
        ServerSession {
            frames: FrameReader::new(reader),
            writer,
            log_name,
            logger,
            greeted: false,
        }
    }

    /// End the session, returning the transcript and the writer.
    pub fn finish(self) -> (String, W) {
        (self.frames.into_transcript(), self.writer)
    }

    fn receive(&mut self) -> Result<ServerMessage, GenerationError> {
        let frame = self
            .frames
            .read_frame()
            .map_err(|e| GenerationError::io("failed to read from CMake server", e))?;

        match frame {
            Some(body) => ServerMessage::parse(&body),
            None => Err(GenerationError::protocol(
                "CMake server closed the connection",
            )),
        }
    }

    fn send(&mut self, request: &Value) -> Result<(), GenerationError> {
        self.writer
            .write_all(encode_frame(request).as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(|e| GenerationError::io("failed to write to CMake server", e))
    }

    /// Wait for the server's `hello` and check it speaks our protocol.
    pub fn wait_for_hello(&mut self) -> Result<(), GenerationError> {
        if self.greeted {
            return Ok(());
        }

        loop {
            match self.receive()? {
                ServerMessage::Hello {
                    supported_protocol_versions,
                } => {
                    if !supported_protocol_versions
                        .iter()
                        .any(|v| v.major == PROTOCOL_MAJOR)
                    {
                        return Err(GenerationError::protocol(format!(
                            "server does not support protocol version {}",
                            PROTOCOL_MAJOR
                        )));
                    }
                    self.greeted = true;
                    return Ok(());
                }
                other => self.log_unsolicited(&other),
            }
        }
    }

    /// Send `request` and return the body of its reply.
    pub fn request(&mut self, request: Value) -> Result<Map<String, Value>, GenerationError> {
        self.wait_for_hello()?;

        let kind = request
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.send(&request)?;

        loop {
            match self.receive()? {
                ServerMessage::Reply { in_reply_to, body } if in_reply_to == kind => {
                    return Ok(body);
                }
                ServerMessage::Error {
                    in_reply_to,
                    error_message,
                } if in_reply_to == kind || in_reply_to.is_empty() => {
                    return Err(GenerationError::protocol(format!(
                        "`{}` failed: {}",
                        kind, error_message
                    )));
                }
                other => self.log_unsolicited(&other),
            }
        }
    }

    fn log_unsolicited(&self, message: &ServerMessage) {
        match message {
            ServerMessage::Message { message, .. } => {
                for line in message.lines() {
                    self.logger.info(&format!("{}: {}", self.log_name, line));
                }
            }
            ServerMessage::Progress {
                progress_message,
                progress_current,
                progress_maximum,
                ..
            } => {
                tracing::debug!(
                    "{}: {} ({}/{})",
                    self.log_name,
                    progress_message,
                    progress_current,
                    progress_maximum
                );
            }
            ServerMessage::Signal { name } => {
                tracing::debug!("{}: signal `{}`", self.log_name, name);
            }
            ServerMessage::Error {
                in_reply_to,
                error_message,
            } => {
                self.logger.error(&format!(
                    "{}: error for `{}`: {}",
                    self.log_name, in_reply_to, error_message
                ));
            }
            other => {
                tracing::debug!("{}: ignoring {:?}", self.log_name, other);
            }
        }
    }

    fn request_typed<T: DeserializeOwned>(
        &mut self,
        request: Value,
    ) -> Result<T, GenerationError> {
        let body = self.request(request)?;
        serde_json::from_value(Value::Object(body))
            .map_err(|e| GenerationError::protocol(format!("unexpected reply shape: {}", e)))
    }

    pub fn handshake(
        &mut self,
        source_dir: &Path,
        build_dir: &Path,
        generator: &str,
    ) -> Result<(), GenerationError> {
        self.request(json!({
            "type": "handshake",
            "cookie": HANDSHAKE_COOKIE,
            "protocolVersion": { "major": PROTOCOL_MAJOR },
            "sourceDirectory": source_dir,
            "buildDirectory": build_dir,
            "generator": generator,
        }))?;
        Ok(())
    }

    pub fn configure(&mut self, cache_arguments: &[String]) -> Result<(), GenerationError> {
        self.request(json!({
            "type": "configure",
            "cacheArguments": cache_arguments,
        }))?;
        Ok(())
    }

    pub fn compute(&mut self) -> Result<(), GenerationError> {
        self.request(json!({ "type": "compute" }))?;
        Ok(())
    }

    pub fn codemodel(&mut self) -> Result<CodeModel, GenerationError> {
        self.request_typed(json!({ "type": "codemodel" }))
    }

    pub fn cmake_inputs(&mut self) -> Result<CMakeInputs, GenerationError> {
        self.request_typed(json!({ "type": "cmakeInputs" }))
    }

    pub fn cache(&mut self) -> Result<Vec<CacheEntry>, GenerationError> {
        #[derive(serde::Deserialize)]
        struct CacheReply {
            #[serde(default)]
            cache: Vec<CacheEntry>,
        }

        let reply: CacheReply = self.request_typed(json!({ "type": "cache" }))?;
        Ok(reply.cache)
    }
}
