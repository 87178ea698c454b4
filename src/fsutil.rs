//! Small filesystem helpers shared by the extractor and the normalizer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Remove a file, symlink or directory tree without following symlinks.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = path.symlink_metadata()?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Whether `dir` has no entries.
pub fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

/// Immediate subdirectories of `root` (symlinks excluded), sorted by name.
pub fn child_dirs(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// The only entry of `dir` if it is exactly one real directory.
pub fn single_child_dir(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?;
    let first = match entries.next() {
        Some(entry) => entry?,
        None => return Ok(None),
    };
    if entries.next().is_some() {
        return Ok(None);
    }
    if first.file_type()?.is_dir() {
        Ok(Some(first.path()))
    } else {
        Ok(None)
    }
}

/// Whether `a` and `b` name the same filesystem object, without following
/// a final symlink.
///
/// Compares identity rather than spelling, so `Photos` and `photos` match on
/// a case-insensitive volume.
#[cfg(unix)]
pub fn same_entry(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (a.symlink_metadata(), b.symlink_metadata()) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
pub fn same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
