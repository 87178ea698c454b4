//! Advisory lock that serializes runs over the same directory.
//!
//! The sentinel file lives beside the target directory, not inside it, so it
//! is never extracted over, cleaned or reorganized.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use self::unix as backend;
#[cfg(windows)]
use self::windows as backend;

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use self::backend::{Attempt, FileLock};

use crate::report::OperationStats;

const SENTINEL_SUFFIX: &str = ".archive-sweeper.lock";

/// Sentinel file guarding `root`.
///
/// `<parent>/.<root name>.archive-sweeper.lock`, or
/// `<root>/.archive-sweeper.lock` when `root` has no parent.
pub fn sentinel_path(root: &Path) -> PathBuf {
    match (root.parent(), root.file_name()) {
        (Some(parent), Some(name)) => {
            let mut file_name = OsString::from(".");
            file_name.push(name);
            file_name.push(SENTINEL_SUFFIX);
            parent.join(file_name)
        }
        _ => root.join(SENTINEL_SUFFIX),
    }
}

/// An acquired run lock. Released explicitly or on drop.
pub struct RunLock {
    path: PathBuf,
    held: Option<FileLock>,
}

impl RunLock {
    /// Acquire the lock for `root`, waiting for a concurrent run to finish.
    ///
    /// Returns `None` after logging a warning if locking is not possible.
    pub fn acquire(root: &Path, stats: &mut OperationStats) -> Option<RunLock> {
        let path = sentinel_path(root);

        match lock_sentinel(&path, stats) {
            Ok(held) => {
                tracing::debug!(path = %path.display(), "Run lock acquired");
                Some(RunLock {
                    path,
                    held: Some(held),
                })
            }
            Err(e) => {
                stats.warning(format!("Could not acquire run lock: {}", e), Some(&path));
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Remove the sentinel and unlock. A second call does nothing.
    pub fn release(&mut self) {
        let Some(held) = self.held.take() else {
            return;
        };

        // Removed while still locked so a waiter notices the replacement.
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), "Cannot remove lock file: {}", e);
            }
        }

        if let Err(e) = backend::unlock(held) {
            tracing::warn!(path = %self.path.display(), "Cannot unlock: {}", e);
        }
        tracing::debug!(path = %self.path.display(), "Run lock released");
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock_sentinel(path: &Path, stats: &mut OperationStats) -> io::Result<FileLock> {
    loop {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let held = match backend::try_lock(file)? {
            Attempt::Acquired(held) => held,
            Attempt::Contended(file) => {
                stats.info("Another run holds the lock, waiting", Some(path));
                backend::lock_blocking(file)?
            }
        };

        if backend::same_file(&held, path) {
            return Ok(held);
        }
        tracing::debug!(path = %path.display(), "Lock file was replaced, retrying");
    }
}
