//! Zip archiving of the staging tree.
//!
//! The archive is written to a temporary `.partial` file next to its final
//! location and renamed into place only once complete, so a failed write
//! never leaves a truncated archive under the release name.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("archive path {} has no parent directory", .0.display())]
    NoParent(PathBuf),

    #[error("entry {} is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),
}

/// What [`write_zip`] put into place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub files: usize,
    pub sha256: String,
}

/// Archives everything under `source_dir` into `archive_path`, with entry
/// names relative to `source_dir`. The digest is taken from the finished
/// temporary file, so once the archive is in place nothing is left to fail.
pub fn write_zip(source_dir: &Path, archive_path: &Path) -> Result<ArchiveSummary, ArchiveError> {
    let parent = archive_path
        .parent()
        .ok_or_else(|| ArchiveError::NoParent(archive_path.to_path_buf()))?;
    let mut staged = tempfile::Builder::new()
        .prefix(".jsdist-")
        .suffix(".zip.partial")
        .tempfile_in(parent)?;

    let files = {
        let mut writer = ZipWriter::new(staged.as_file_mut());
        let files = add_tree(&mut writer, source_dir)?;
        writer.finish()?;
        files
    };
    staged.as_file().sync_all()?;
    let sha256 = sha256_file(staged.path())?;

    if archive_path.exists() {
        info!(path = %archive_path.display(), "Replacing existing archive of the same version");
    }
    staged.persist(archive_path).map_err(|e| e.error)?;
    info!(path = %archive_path.display(), files, %sha256, "Wrote archive");
    Ok(ArchiveSummary { files, sha256 })
}

fn add_tree<W: io::Write + io::Seek>(writer: &mut ZipWriter<W>, root: &Path) -> Result<usize, ArchiveError> {
    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let dir_options = SimpleFileOptions::default().unix_permissions(0o755);

    let mut files = 0;
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let name = entry_name(root, entry.path())?;
        if entry.file_type().is_dir() {
            writer.add_directory(format!("{name}/"), dir_options)?;
        } else {
            writer.start_file(name.as_str(), file_options)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, writer)?;
            debug!(entry = %name, "Added archive entry");
            files += 1;
        }
    }
    Ok(files)
}

/// Zip entry names always use `/`, whatever the host separator.
fn entry_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| ArchiveError::NonUtf8Path(path.to_path_buf()))?;
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| ArchiveError::NonUtf8Path(path.to_path_buf()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Hex SHA-256 digest of a file.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Lists the entry names of an existing archive.
pub fn list_entries(archive_path: &Path) -> Result<Vec<String>, ArchiveError> {
    let archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    Ok(archive.file_names().map(str::to_string).collect())
}

/// Removes a directory tree if it exists.
pub fn remove_tree(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
