//! # contract: interfaces to the external build collaborators
//!
//! The release pipeline never minifies JavaScript or renders documentation
//! itself. Both jobs belong to external tools (a compiler service, a local
//! minifier binary, a docs builder) that are reached through the two traits in
//! this module:
//!
//! - [`Compressor`]: full source text in, compressed source text out.
//! - [`DocGenerator`]: docs source directory in, static HTML tree out.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so tests can substitute
//!   deterministic fakes (`MockCompressor`, `MockDocGenerator`) instead of
//!   calling a network service or spawning a process.
//!
//! ## Errors
//! - Implementations report every failure as a [`ToolError`]. The pipeline
//!   wraps it with the step and file it was working on.

use std::path::Path;
use std::process::ExitStatus;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} rejected the input: {message}")]
    Rejected { service: String, message: String },

    #[error("no output returned")]
    EmptyOutput,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Turns the full text of an assembled variant into functionally equivalent,
/// smaller text. The output is trusted and not parsed.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Compress `source` as one unit.
    async fn compress(&self, source: &str) -> Result<String, ToolError>;
}

/// Renders a documentation source directory into a static HTML tree.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocGenerator: Send + Sync {
    /// Generate HTML from `source_dir` into `output_dir`.
    ///
    /// The caller guarantees `output_dir` exists and is empty.
    async fn generate(&self, source_dir: &Path, output_dir: &Path) -> Result<(), ToolError>;
}

/// Stand-in for a collaborator the config does not declare.
///
/// Config validation rejects any variant or docs section that would need it,
/// so reaching it means the caller skipped validation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

#[async_trait]
impl Compressor for Unconfigured {
    async fn compress(&self, _source: &str) -> Result<String, ToolError> {
        Err(ToolError::NotConfigured("compressor"))
    }
}

#[async_trait]
impl DocGenerator for Unconfigured {
    async fn generate(&self, _source_dir: &Path, _output_dir: &Path) -> Result<(), ToolError> {
        Err(ToolError::NotConfigured("doc generator"))
    }
}

#[async_trait]
impl<T: Compressor + ?Sized> Compressor for Box<T> {
    async fn compress(&self, source: &str) -> Result<String, ToolError> {
        (**self).compress(source).await
    }
}

#[async_trait]
impl<T: DocGenerator + ?Sized> DocGenerator for Box<T> {
    async fn generate(&self, source_dir: &Path, output_dir: &Path) -> Result<(), ToolError> {
        (**self).generate(source_dir, output_dir).await
    }
}
