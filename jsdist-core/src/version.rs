//! Version resolution: one version string per run, from the command line or
//! from the `version: '...'` declaration in the library's base source file.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

use crate::config::VersionSource;
use crate::error::{ReleaseError, Step};

static VERSION_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\bversion:[ \t]*'([^'\r\n]+)'").expect("version pattern is valid"));

/// Returns the value of the first `version: '<value>'` declaration in `source`.
pub fn find_version(source: &str) -> Option<&str> {
    VERSION_DECLARATION
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Reads `path` and extracts its version declaration.
pub fn version_from_file(path: &Path) -> Result<String, ReleaseError> {
    let contents = fs::read_to_string(path).map_err(ReleaseError::io(Step::ResolveVersion, path))?;
    match find_version(&contents) {
        Some(version) => Ok(version.to_string()),
        None => {
            error!(path = %path.display(), "No version declaration found in base source file");
            Err(ReleaseError::VersionNotFound {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Resolves the version of a run.
///
/// Exactly one of the two sources must provide it: a command line argument is
/// rejected when the config derives the version from source, and required when
/// it does not.
pub fn resolve(source: &VersionSource, argument: Option<&str>) -> Result<String, ReleaseError> {
    let version = match (source, argument) {
        (VersionSource::Argument, Some(arg)) => {
            let arg = arg.trim();
            if arg.is_empty() {
                return Err(ReleaseError::config("version argument is empty"));
            }
            arg.to_string()
        }
        (VersionSource::Argument, None) => {
            return Err(ReleaseError::config(
                "config takes the version from the command line, but none was given",
            ));
        }
        (VersionSource::Source { path }, None) => version_from_file(path)?,
        (VersionSource::Source { path }, Some(arg)) => {
            return Err(ReleaseError::config(format!(
                "version {arg:?} given on the command line, but config derives it from {}",
                path.display()
            )));
        }
    };
    if version.contains(['/', '\\']) {
        return Err(ReleaseError::config(format!(
            "version {version:?} cannot be used in a filename"
        )));
    }
    info!(%version, "Resolved release version");
    Ok(version)
}
