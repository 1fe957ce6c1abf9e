//! High-level pipeline: assembles, tags and packages the library's variants.
//!
//! This module provides the top-level orchestration for the two entrypoints
//! of the CLI:
//!   - [`release`]: validate → resolve version → init staging → assemble
//!     variants → rewrite demo → build docs → copy static files → archive →
//!     clean up. Produces `<library>-<version>.zip` in the dist directory.
//!   - [`build`]: validate → resolve version → write every variant,
//!     unversioned, into the build directory.
//!
//! # Responsibilities
//! - Strictly sequential, fail-fast orchestration: each step is awaited before
//!   the next starts and the first failure ends the run.
//! - All inputs are validated and the version resolved before anything is
//!   written, so configuration mistakes leave no trace on disk.
//! - Staging is removed after a successful archive and after any failure
//!   while populating it. It is preserved only when the archive step fails,
//!   for post-mortem inspection.
//!
//! # Error Handling
//! Every failure is a [`ReleaseError`] naming its step and the file it
//! concerns; callers surface it as-is.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::archive;
use crate::assemble::{archive_filename, FragmentSet, VariantAssembler};
use crate::config::{DemoConfig, DocsConfig, ReleaseConfig, VariantConfig};
use crate::contract::{Compressor, DocGenerator, ToolError};
use crate::docs::{copy_filtered_tree, is_empty_dir, reset_dir};
use crate::error::{ReleaseError, Step};
use crate::version;

/// Subdirectory of staging that receives the generated docs.
pub const DOCS_SUBDIR: &str = "docs";

#[derive(Debug)]
pub struct ReleaseReport {
    pub version: String,
    pub archive: PathBuf,
    pub archive_sha256: String,
    pub archived_files: usize,
    pub artifacts: Vec<ArtifactReport>,
    pub docs_files: usize,
}

#[derive(Debug)]
pub struct BuildReport {
    pub version: String,
    pub output_dir: PathBuf,
    pub artifacts: Vec<ArtifactReport>,
}

#[derive(Debug, Clone)]
pub struct ArtifactReport {
    pub variant: String,
    pub filename: String,
    pub compressed: bool,
    pub bytes: usize,
}

pub async fn release<C, D>(
    config: &ReleaseConfig,
    version_arg: Option<&str>,
    compressor: &C,
    doc_generator: &D,
) -> Result<ReleaseReport, ReleaseError>
where
    C: Compressor + ?Sized,
    D: DocGenerator + ?Sized,
{
    info!(library = %config.library.name, "[RELEASE] Starting release pipeline");

    if let Err(e) = config.validate() {
        error!(error = %e, "[RELEASE][ERROR] Configuration rejected");
        return Err(e);
    }
    let version = version::resolve(&config.version, version_arg)?;
    if let Err(e) = config.validate_staging_entries(&version) {
        error!(error = %e, "[RELEASE][ERROR] Configuration rejected");
        return Err(e);
    }
    let fragments = FragmentSet::load(&config.fragments)?;
    let assembler = VariantAssembler::new(&config.library, &version);
    let staging = config.staging_dir.as_path();

    // --- Init ---
    if staging.exists() {
        warn!(path = %staging.display(), "[RELEASE] Removing leftover staging directory");
    }
    archive::remove_tree(staging).map_err(ReleaseError::io(Step::Init, staging))?;
    fs::create_dir_all(staging).map_err(ReleaseError::io(Step::Init, staging))?;
    info!(path = %staging.display(), "[RELEASE] Staging directory ready");

    let (artifacts, docs_files) =
        match populate(config, &assembler, &fragments, compressor, doc_generator, staging).await {
            Ok(populated) => populated,
            Err(e) => {
                discard_staging(staging);
                return Err(e);
            }
        };

    // --- Archive ---
    let archive_path = config.dist_dir.join(archive_filename(&config.library.name, &version));
    let summary = match fs::create_dir_all(&config.dist_dir)
        .map_err(archive::ArchiveError::from)
        .and_then(|_| archive::write_zip(staging, &archive_path))
    {
        Ok(summary) => summary,
        Err(source) => {
            error!(
                archive = %archive_path.display(),
                staging = %staging.display(),
                error = %source,
                "[RELEASE][ERROR] Archive failed, staging directory preserved for inspection"
            );
            return Err(ReleaseError::ArchiveWrite {
                path: archive_path,
                source,
            });
        }
    };

    // --- Cleanup ---
    // The archive is already in place; a leftover staging directory is wiped
    // by the next run.
    if let Err(e) = fs::remove_dir_all(staging) {
        warn!(
            step = %Step::Cleanup,
            path = %staging.display(),
            error = %e,
            "[RELEASE] Archive written but staging directory could not be removed"
        );
    }
    info!(
        archive = %archive_path.display(),
        sha256 = %summary.sha256,
        files = summary.files,
        "[RELEASE] Release complete"
    );

    Ok(ReleaseReport {
        version,
        archive: archive_path,
        archive_sha256: summary.sha256,
        archived_files: summary.files,
        artifacts,
        docs_files,
    })
}

/// Fills staging with the variants, demo page, docs and static files.
async fn populate<C, D>(
    config: &ReleaseConfig,
    assembler: &VariantAssembler<'_>,
    fragments: &FragmentSet,
    compressor: &C,
    doc_generator: &D,
    staging: &Path,
) -> Result<(Vec<ArtifactReport>, usize), ReleaseError>
where
    C: Compressor + ?Sized,
    D: DocGenerator + ?Sized,
{
    let version = assembler.version();

    // --- AssembleVariants ---
    let mut artifacts = Vec::with_capacity(config.variants.len());
    for variant in &config.variants {
        let filename = variant.filename(&config.library.name, Some(version));
        let artifact = write_variant(assembler, fragments, variant, compressor, staging, filename).await?;
        artifacts.push(artifact);
    }
    info!(count = artifacts.len(), "[RELEASE] Assembled all variants");

    // --- RewriteDemo ---
    if let Some(demo) = &config.demo {
        rewrite_demo(config, demo, version, staging)?;
    }

    // --- BuildDocs ---
    let docs_files = match &config.docs {
        Some(docs) => build_docs(docs, doc_generator, staging).await?,
        None => {
            debug!("[RELEASE] No docs configured, skipping docs build");
            0
        }
    };

    // --- CopyStaticFiles ---
    for file in &config.static_files {
        let name = file
            .file_name()
            .ok_or_else(|| ReleaseError::config(format!("static file {} has no file name", file.display())))?;
        let target = staging.join(name);
        fs::copy(file, &target).map_err(ReleaseError::io(Step::CopyStaticFiles, file))?;
        debug!(file = %file.display(), "[RELEASE] Copied static file");
    }
    Ok((artifacts, docs_files))
}

/// Best-effort removal of a half-populated staging directory.
fn discard_staging(staging: &Path) {
    match archive::remove_tree(staging) {
        Ok(()) => info!(path = %staging.display(), "[RELEASE] Removed incomplete staging directory"),
        Err(e) => warn!(path = %staging.display(), error = %e, "[RELEASE] Could not remove incomplete staging directory"),
    }
}

/// Writes every variant, unversioned, into the configured build directory.
pub async fn build<C>(
    config: &ReleaseConfig,
    version_arg: Option<&str>,
    compressor: &C,
) -> Result<BuildReport, ReleaseError>
where
    C: Compressor + ?Sized,
{
    info!(library = %config.library.name, "[BUILD] Building variants");

    if let Err(e) = config.validate_sources() {
        error!(error = %e, "[BUILD][ERROR] Configuration rejected");
        return Err(e);
    }
    let version = version::resolve(&config.version, version_arg)?;
    let fragments = FragmentSet::load(&config.fragments)?;
    let assembler = VariantAssembler::new(&config.library, &version);
    let output_dir = config.build_dir.as_path();
    fs::create_dir_all(output_dir).map_err(ReleaseError::io(Step::Init, output_dir))?;

    let mut artifacts = Vec::with_capacity(config.variants.len());
    for variant in &config.variants {
        info!(variant = %variant.name, modes = %variant.modes, "[BUILD] Building version");
        let filename = variant.filename(&config.library.name, None);
        let artifact = write_variant(&assembler, &fragments, variant, compressor, output_dir, filename).await?;
        artifacts.push(artifact);
    }

    info!(count = artifacts.len(), output_dir = %output_dir.display(), "[BUILD] All variants written");
    Ok(BuildReport {
        version,
        output_dir: output_dir.to_path_buf(),
        artifacts,
    })
}

/// Assembles one variant, compresses it if requested, and writes it.
/// Nothing is written when compression fails.
async fn write_variant<C>(
    assembler: &VariantAssembler<'_>,
    fragments: &FragmentSet,
    variant: &VariantConfig,
    compressor: &C,
    dir: &Path,
    filename: String,
) -> Result<ArtifactReport, ReleaseError>
where
    C: Compressor + ?Sized,
{
    let text = render_variant(assembler, fragments, variant, compressor, &filename).await?;
    let target = dir.join(&filename);
    fs::write(&target, &text).map_err(ReleaseError::io(Step::AssembleVariants, &target))?;
    info!(variant = %variant.name, file = %filename, bytes = text.len(), compressed = variant.compress, "Wrote variant");
    Ok(ArtifactReport {
        variant: variant.name.clone(),
        filename,
        compressed: variant.compress,
        bytes: text.len(),
    })
}

/// Full text of a variant. Compressed variants compress the whole
/// concatenated body in one call and keep the header in front of the result.
pub async fn render_variant<C>(
    assembler: &VariantAssembler<'_>,
    fragments: &FragmentSet,
    variant: &VariantConfig,
    compressor: &C,
    filename: &str,
) -> Result<String, ReleaseError>
where
    C: Compressor + ?Sized,
{
    let assembled = assembler.assemble_variant(fragments, variant)?;
    if !variant.compress {
        return Ok(assembled.text());
    }

    let tool_error = |source: ToolError| ReleaseError::ExternalTool {
        step: Step::AssembleVariants,
        tool: "compressor",
        subject: filename.to_string(),
        source,
    };
    let compressed = match compressor.compress(&assembled.body).await {
        Ok(text) if text.trim().is_empty() => Err(ToolError::EmptyOutput),
        other => other,
    };
    match compressed {
        Ok(text) => Ok(assembled.with_body(&text)),
        Err(e) => {
            error!(variant = %variant.name, file = %filename, error = %e, "Compression failed, variant not written");
            Err(tool_error(e))
        }
    }
}

/// Copies the demo page into staging with its script reference pointing at
/// the versioned file of the configured variant.
fn rewrite_demo(
    config: &ReleaseConfig,
    demo: &DemoConfig,
    version: &str,
    staging: &Path,
) -> Result<(), ReleaseError> {
    let variant = config
        .variant(&demo.variant)
        .ok_or_else(|| ReleaseError::config(format!("demo.variant {:?} is not a configured variant", demo.variant)))?;
    let versioned = variant.filename(&config.library.name, Some(version));
    let page = fs::read_to_string(&demo.path).map_err(ReleaseError::io(Step::RewriteDemo, &demo.path))?;
    let rewritten = page.replace(&demo.script_reference, &versioned);

    let name = demo
        .path
        .file_name()
        .ok_or_else(|| ReleaseError::config(format!("demo page {} has no file name", demo.path.display())))?;
    let target = staging.join(name);
    fs::write(&target, rewritten).map_err(ReleaseError::io(Step::RewriteDemo, &target))?;
    info!(from = %demo.script_reference, to = %versioned, file = %target.display(), "[RELEASE] Rewrote demo page");
    Ok(())
}

/// Regenerates the docs into a freshly emptied output directory and copies
/// the result, minus excluded housekeeping files, to `<staging>/docs`.
async fn build_docs<D>(docs: &DocsConfig, generator: &D, staging: &Path) -> Result<usize, ReleaseError>
where
    D: DocGenerator + ?Sized,
{
    reset_dir(&docs.output).map_err(ReleaseError::io(Step::BuildDocs, &docs.output))?;

    let tool_error = |source: ToolError| ReleaseError::ExternalTool {
        step: Step::BuildDocs,
        tool: "doc generator",
        subject: docs.source.display().to_string(),
        source,
    };
    if let Err(e) = generator.generate(&docs.source, &docs.output).await {
        error!(source = %docs.source.display(), error = %e, "[RELEASE][ERROR] Documentation build failed");
        return Err(tool_error(e));
    }
    let produced_nothing = is_empty_dir(&docs.output).map_err(ReleaseError::io(Step::BuildDocs, &docs.output))?;
    if produced_nothing {
        error!(output = %docs.output.display(), "[RELEASE][ERROR] Documentation generator produced no output");
        return Err(tool_error(ToolError::EmptyOutput));
    }

    let target = staging.join(DOCS_SUBDIR);
    if target.exists() {
        fs::remove_dir_all(&target).map_err(ReleaseError::io(Step::BuildDocs, &target))?;
    }
    let files = copy_filtered_tree(&docs.output, &target, &docs.exclude)
        .map_err(ReleaseError::io(Step::BuildDocs, &docs.output))?;
    info!(files, target = %target.display(), "[RELEASE] Copied generated docs into staging");
    Ok(files)
}
