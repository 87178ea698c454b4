use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SweeperError};

/// One ZIP file discovered in the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Location of the archive.
    pub path: PathBuf,
    /// Size on disk in bytes.
    pub size: u64,
    /// Name of the directory it extracts into (archive name, extension stripped).
    pub dest_name: OsString,
}

impl ArchiveEntry {
    /// Build an entry for `path`, reading its size from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| SweeperError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let dest_name = path
            .file_stem()
            .map(|s| s.to_os_string())
            .ok_or_else(|| SweeperError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            dest_name,
        })
    }

    /// File name for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Whether `path` has a `.zip` extension (any case).
pub fn has_zip_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("zip"))
}

/// List the ZIP files directly inside `root`, sorted by file name.
///
/// Symlinks and non-regular files are ignored.
pub fn discover_archives(root: &Path) -> Result<Vec<ArchiveEntry>> {
    let read_dir = fs::read_dir(root).map_err(|e| SweeperError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut archives = Vec::new();

    for entry in read_dir {
        let entry = entry.map_err(|e| SweeperError::Io {
            path: root.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);

        if is_file && has_zip_extension(&path) {
            archives.push(ArchiveEntry::from_path(&path)?);
        }
    }

    archives.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(archives)
}
