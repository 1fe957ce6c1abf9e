//! # jsdist CLI interface
//!
//! Command parsing and the glue between the YAML config, the concrete
//! collaborators (compressor, doc generator) and the pipeline in
//! [`jsdist_core::release`].
//!
//! All packaging logic lives in `jsdist-core`; this module only loads the
//! config, wires the tools described in it and reports the outcome.
//!
//! ## How To Use
//! - Command line: `jsdist release [VERSION] --config jsdist.yaml`, or
//!   `jsdist build [VERSION]` for the unversioned variant files only.
//! - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jsdist_core::release::{build, release, ArtifactReport};

use crate::load_config::load_config;

/// Build and release the library's distributable scripts.
#[derive(Parser)]
#[clap(
    name = "jsdist",
    version,
    about = "Assemble, compress and package JavaScript library variants into a versioned release archive"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every variant, the docs and the demo into `<library>-<version>.zip`
    Release {
        /// Release version; only accepted when the config takes it from the command line
        version: Option<String>,
        /// Path to the YAML config file
        #[clap(long, default_value = "jsdist.yaml")]
        config: PathBuf,
    },
    /// Write every variant, unversioned, into the configured build directory
    Build {
        /// Version for the header comments; only accepted when the config takes it from the command line
        version: Option<String>,
        /// Path to the YAML config file
        #[clap(long, default_value = "jsdist.yaml")]
        config: PathBuf,
    },
}

/// Async CLI entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Release { version, config } => {
            let config = load_config(&config)?;
            tracing::info!(command = "release", "Starting release");
            let compressor = jsdist_core::compress::from_config(config.compressor.as_ref())
                .context("Failed to construct compressor")?;
            let doc_generator = jsdist_core::docs::from_config(config.docs.as_ref());

            match release(&config, version.as_deref(), &compressor, &doc_generator).await {
                Ok(report) => {
                    tracing::info!(command = "release", ?report, "Release complete");
                    print_artifacts(&report.artifacts);
                    if report.docs_files > 0 {
                        println!("  docs/ ({} files)", report.docs_files);
                    }
                    println!(
                        "Released {} {} -> {} ({} files, sha256 {})",
                        config.library.name,
                        report.version,
                        report.archive.display(),
                        report.archived_files,
                        report.archive_sha256
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "release", step = %e.step(), error = %e, "Release failed");
                    Err(anyhow::Error::new(e).context("Release failed"))
                }
            }
        }
        Commands::Build { version, config } => {
            let config = load_config(&config)?;
            tracing::info!(command = "build", "Starting variant build");
            let compressor = jsdist_core::compress::from_config(config.compressor.as_ref())
                .context("Failed to construct compressor")?;

            match build(&config, version.as_deref(), &compressor).await {
                Ok(report) => {
                    tracing::info!(command = "build", ?report, "Build complete");
                    print_artifacts(&report.artifacts);
                    println!(
                        "Built {} {} into {}",
                        config.library.name,
                        report.version,
                        report.output_dir.display()
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "build", step = %e.step(), error = %e, "Build failed");
                    Err(anyhow::Error::new(e).context("Build failed"))
                }
            }
        }
    }
}

fn print_artifacts(artifacts: &[ArtifactReport]) {
    for artifact in artifacts {
        let kind = if artifact.compressed { "compressed" } else { "plain" };
        println!("  {} ({kind}, {} bytes)", artifact.filename, artifact.bytes);
    }
}
