//! Documentation build: the command-backed [`DocGenerator`] and the filtered
//! copy of the generated HTML tree into staging.

use std::fs;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::config::{CommandSpec, DocsConfig};
use crate::contract::{DocGenerator, ToolError, Unconfigured};

/// Builds the doc generator described by the config, or [`Unconfigured`]
/// when the config has no docs section.
pub fn from_config(config: Option<&DocsConfig>) -> Box<dyn DocGenerator> {
    match config {
        Some(docs) => Box::new(CommandDocGenerator::new(docs.command.clone())),
        None => Box::new(Unconfigured),
    }
}

/// Runs a docs builder such as `sphinx-build`, with the docs source
/// directory as its working directory. `{source}` and `{output}` in the
/// arguments are replaced with the respective paths.
pub struct CommandDocGenerator {
    command: CommandSpec,
}

impl CommandDocGenerator {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

#[async_trait]
impl DocGenerator for CommandDocGenerator {
    async fn generate(&self, source_dir: &Path, output_dir: &Path) -> Result<(), ToolError> {
        let program = &self.command.program;
        info!(program = %program, source = %source_dir.display(), output = %output_dir.display(), "Running documentation generator");
        let output = self
            .command
            .command(&[("source", source_dir), ("output", output_dir)])
            .current_dir(source_dir)
            .output()
            .map_err(|source| ToolError::Launch {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(program = %program, status = %output.status, stderr = %stderr, "Documentation generator failed");
            return Err(ToolError::Failed {
                program: program.clone(),
                status: output.status,
                stderr,
            });
        }
        debug!(program = %program, stdout = %String::from_utf8_lossy(&output.stdout), "Documentation generator finished");
        Ok(())
    }
}

/// Removes `dir` if present and recreates it empty.
pub fn reset_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
        debug!(path = %dir.display(), "Removed stale directory");
    }
    fs::create_dir_all(dir)
}

/// True when `dir` has no entries.
pub fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

/// Copies the tree under `src` to `dest`, skipping every file or directory
/// whose name is in `exclude`, at any depth. Returns the number of files copied.
pub fn copy_filtered_tree(src: &Path, dest: &Path, exclude: &[String]) -> io::Result<usize> {
    let walker = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || e.file_name()
                    .to_str()
                    .map(|name| !exclude.iter().any(|x| x == name))
                    .unwrap_or(true)
        });

    let mut copied = 0;
    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    debug!(src = %src.display(), dest = %dest.display(), files = copied, "Copied filtered tree");
    Ok(copied)
}
