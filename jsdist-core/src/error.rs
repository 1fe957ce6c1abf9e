//! Error taxonomy for the release pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::contract::ToolError;

/// Pipeline step an error (or log event) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Validate,
    ResolveVersion,
    Init,
    AssembleVariants,
    RewriteDemo,
    BuildDocs,
    CopyStaticFiles,
    Archive,
    Cleanup,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Validate => "validate",
            Step::ResolveVersion => "resolve-version",
            Step::Init => "init",
            Step::AssembleVariants => "assemble-variants",
            Step::RewriteDemo => "rewrite-demo",
            Step::BuildDocs => "build-docs",
            Step::CopyStaticFiles => "copy-static-files",
            Step::Archive => "archive",
            Step::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Missing input, inconsistent variant definitions or a version argument
    /// that contradicts the configured version source.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no `version: '...'` declaration found in {}", .path.display())]
    VersionNotFound { path: PathBuf },

    #[error("[{step}] {tool} failed for {subject}: {source}")]
    ExternalTool {
        step: Step,
        tool: &'static str,
        subject: String,
        #[source]
        source: ToolError,
    },

    #[error("[archive] failed to write {}: {source}", .path.display())]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("[{step}] I/O error on {}: {source}", .path.display())]
    Io {
        step: Step,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReleaseError {
    pub fn config(message: impl Into<String>) -> Self {
        ReleaseError::Configuration(message.into())
    }

    /// Builds a closure for `map_err` that tags an I/O error with its step and path.
    pub(crate) fn io(step: Step, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ReleaseError::Io { step, path, source }
    }

    pub fn step(&self) -> Step {
        match self {
            ReleaseError::Configuration(_) => Step::Validate,
            ReleaseError::VersionNotFound { .. } => Step::ResolveVersion,
            ReleaseError::ExternalTool { step, .. } | ReleaseError::Io { step, .. } => *step,
            ReleaseError::ArchiveWrite { .. } => Step::Archive,
        }
    }
}
