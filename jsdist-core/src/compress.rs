//! Concrete [`Compressor`] implementations.
//!
//! - [`ServiceCompressor`] posts the source to a Closure-Compiler-compatible
//!   HTTP service and reads back the JSON result.
//! - [`CommandCompressor`] pipes the source through a local minifier process.

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::{CommandSpec, CompressorConfig};
use crate::contract::{Compressor, ToolError, Unconfigured};

/// Builds the compressor described by the config, or [`Unconfigured`] when
/// the config declares none.
pub fn from_config(config: Option<&CompressorConfig>) -> Result<Box<dyn Compressor>, ToolError> {
    match config {
        Some(CompressorConfig::Service {
            url,
            compilation_level,
            timeout_secs,
        }) => Ok(Box::new(ServiceCompressor::new(
            url.clone(),
            compilation_level.clone(),
            Duration::from_secs(*timeout_secs),
        )?)),
        Some(CompressorConfig::Command(spec)) => Ok(Box::new(CommandCompressor::new(spec.clone()))),
        None => Ok(Box::new(Unconfigured)),
    }
}

pub struct ServiceCompressor {
    client: reqwest::Client,
    url: String,
    compilation_level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompileResponse {
    #[serde(default)]
    compiled_code: Option<String>,
    #[serde(default)]
    errors: Vec<CompileMessage>,
    #[serde(default)]
    server_errors: Vec<CompileMessage>,
}

#[derive(Debug, Deserialize)]
struct CompileMessage {
    error: String,
    #[serde(default)]
    lineno: Option<u64>,
}

impl CompileMessage {
    fn describe(&self) -> String {
        match self.lineno {
            Some(line) => format!("line {line}: {}", self.error),
            None => self.error.clone(),
        }
    }
}

impl ServiceCompressor {
    pub fn new(url: String, compilation_level: String, timeout: Duration) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ToolError::Http {
                url: url.clone(),
                source,
            })?;
        Ok(Self {
            client,
            url,
            compilation_level,
        })
    }

    fn http_error(&self) -> impl FnOnce(reqwest::Error) -> ToolError + '_ {
        move |source| ToolError::Http {
            url: self.url.clone(),
            source,
        }
    }
}

#[async_trait]
impl Compressor for ServiceCompressor {
    async fn compress(&self, source: &str) -> Result<String, ToolError> {
        info!(url = %self.url, level = %self.compilation_level, bytes = source.len(), "Submitting source to compiler service");
        let params = [
            ("js_code", source),
            ("compilation_level", self.compilation_level.as_str()),
            ("output_format", "json"),
            ("output_info", "compiled_code"),
            ("output_info", "errors"),
        ];
        let response = self
            .client
            .post(&self.url)
            .form(&params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(self.http_error())?;
        let result: CompileResponse = response.json().await.map_err(self.http_error())?;

        let problems: Vec<String> = result
            .server_errors
            .iter()
            .chain(result.errors.iter())
            .map(CompileMessage::describe)
            .collect();
        if !problems.is_empty() {
            error!(url = %self.url, ?problems, "Compiler service reported errors");
            return Err(ToolError::Rejected {
                service: self.url.clone(),
                message: problems.join("; "),
            });
        }

        match result.compiled_code {
            Some(code) if !code.trim().is_empty() => {
                info!(bytes = code.len(), "Compiler service returned compressed source");
                Ok(code)
            }
            _ => Err(ToolError::EmptyOutput),
        }
    }
}

pub struct CommandCompressor {
    command: CommandSpec,
}

impl CommandCompressor {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Compressor for CommandCompressor {
    async fn compress(&self, source: &str) -> Result<String, ToolError> {
        let program = self.command.program.clone();
        info!(program = %program, bytes = source.len(), "Piping source through compressor command");

        let mut child = self
            .command
            .command(&[])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Launch {
                program: program.clone(),
                source,
            })?;

        // Feed stdin from its own thread so a tool that streams output while
        // reading cannot deadlock on a full pipe.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            ToolError::Io(std::io::Error::other("child stdin was not captured"))
        })?;
        let input = source.to_owned();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        let written = writer
            .join()
            .map_err(|_| ToolError::Io(std::io::Error::other("stdin writer thread panicked")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(program = %program, status = %output.status, stderr = %stderr, "Compressor command failed");
            return Err(ToolError::Failed {
                program,
                status: output.status,
                stderr,
            });
        }
        written?;

        let compressed = String::from_utf8(output.stdout)
            .map_err(|e| ToolError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        if compressed.trim().is_empty() {
            return Err(ToolError::EmptyOutput);
        }
        debug!(program = %program, bytes = compressed.len(), "Compressor command finished");
        Ok(compressed)
    }
}
