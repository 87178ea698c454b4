//! Path validation performed before any mutating operation.
//!
//! The guard never touches the filesystem beyond reading metadata. A failed
//! check aborts only the item being validated.

mod mounts;

pub use mounts::{containing_mount, is_network_filesystem, parse_mounts, MountPoint};

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::PathError;
use crate::report::OperationStats;

/// Maximum path length in characters, excluding the terminator.
#[cfg(windows)]
pub const MAX_PATH_CHARS: Option<usize> = Some(259);
#[cfg(not(windows))]
pub const MAX_PATH_CHARS: Option<usize> = None;

/// Lengths past this many bytes are logged as suspicious where no hard limit applies.
pub const SUSPICIOUS_PATH_BYTES: usize = 4096;

/// What the caller intends to do with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    Create,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Create => "create",
        }
    }
}

/// Validates paths for length, traversal, permissions and network residency.
#[derive(Debug, Clone, Default)]
pub struct PathGuard {
    mounts: Vec<MountPoint>,
}

impl PathGuard {
    /// Create a guard using the system mount table.
    pub fn new() -> Self {
        let mounts = match mounts::load() {
            Ok(mounts) => mounts,
            Err(e) => {
                tracing::debug!("Could not read mount table: {}", e);
                Vec::new()
            }
        };
        Self { mounts }
    }

    /// Create a guard with an explicit mount table.
    pub fn with_mounts(mounts: Vec<MountPoint>) -> Self {
        Self { mounts }
    }

    /// Run every check for `path` and `operation`.
    pub fn validate(
        &self,
        path: &Path,
        operation: Operation,
        stats: &mut OperationStats,
    ) -> Result<(), PathError> {
        self.check_length(path, stats)?;

        check_no_traversal(path)?;
        tracing::debug!(path = %path.display(), "traversal check passed");

        check_permissions(path, operation)?;
        tracing::debug!(
            path = %path.display(),
            operation = operation.as_str(),
            "permission check passed"
        );

        if self.is_network_path(path) {
            stats.warning(
                "Path resides on a network filesystem; operations may be slow",
                Some(path),
            );
        }

        Ok(())
    }

    /// Validate a path name taken from untrusted archive contents.
    ///
    /// Rejects absolute paths, drive prefixes and any `..` segment, treating
    /// both `/` and `\` as separators.
    pub fn validate_untrusted(&self, name: &str) -> Result<(), PathError> {
        let rejected = || PathError::Traversal(PathBuf::from(name));

        if name.contains('\0') {
            return Err(rejected());
        }
        if name.starts_with('/') || name.starts_with('\\') {
            return Err(rejected());
        }
        let bytes = name.as_bytes();
        if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
            return Err(rejected());
        }
        if name.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(rejected());
        }

        check_no_traversal(Path::new(name))
    }

    /// Validate a single directory-entry name derived from untrusted input.
    ///
    /// The name must be usable as one component below an existing directory:
    /// non-empty, not `.` or `..`, and free of separators and NUL bytes.
    pub fn validate_name(&self, name: &OsStr) -> Result<(), PathError> {
        let text = name.to_string_lossy();
        if text.is_empty() || text == "." || text == ".." || text.contains(['/', '\\', '\0']) {
            return Err(PathError::Traversal(PathBuf::from(name)));
        }
        Ok(())
    }

    /// Whether `path` lives on a network-mounted volume.
    pub fn is_network_path(&self, path: &Path) -> bool {
        if self.mounts.is_empty() {
            return false;
        }
        let resolved = resolve_existing(path);
        let network = containing_mount(&self.mounts, &resolved).is_some_and(MountPoint::is_network);
        tracing::debug!(path = %path.display(), network, "network mount check");
        network
    }

    fn check_length(&self, path: &Path, stats: &mut OperationStats) -> Result<(), PathError> {
        let text = path.to_string_lossy();

        if let Some(limit) = MAX_PATH_CHARS {
            let length = text.chars().count();
            if length > limit {
                return Err(PathError::TooLong {
                    path: path.to_path_buf(),
                    length,
                    limit,
                });
            }
        } else if text.len() > SUSPICIOUS_PATH_BYTES {
            stats.warning(
                format!("Unusually long path ({} bytes)", text.len()),
                Some(path),
            );
        }

        tracing::debug!(path = %path.display(), "length check passed");
        Ok(())
    }
}

fn check_no_traversal(path: &Path) -> Result<(), PathError> {
    // Interior `.` segments are dropped by component parsing; only `..` remains.
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(PathError::Traversal(path.to_path_buf()));
    }
    Ok(())
}

/// Canonicalize the longest existing ancestor of `path`.
fn resolve_existing(path: &Path) -> PathBuf {
    let mut current = path.to_path_buf();
    let mut suffix = Vec::new();

    loop {
        if let Ok(resolved) = current.canonicalize() {
            return suffix.iter().rev().fold(resolved, |acc, part| acc.join(part));
        }
        match (current.file_name().map(|n| n.to_os_string()), current.parent()) {
            (Some(name), Some(parent)) => {
                suffix.push(name);
                current = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn check_permissions(path: &Path, operation: Operation) -> Result<(), PathError> {
    let exists = path.symlink_metadata().is_ok();

    match operation {
        Operation::Read | Operation::Write if !exists => Err(PathError::NotFound(path.to_path_buf())),
        Operation::Read => {
            let mut access = Access::READ;
            if path.is_dir() {
                access.execute = true;
            }
            require(path, access, operation)
        }
        Operation::Write => require(path, Access::WRITE, operation),
        Operation::Create => {
            let parent = parent_of(path);
            if !parent.is_dir() {
                return Err(PathError::NotFound(parent));
            }
            require(
                &parent,
                Access {
                    read: false,
                    write: true,
                    execute: true,
                },
                operation,
            )?;
            if exists {
                require(path, Access::WRITE, operation)?;
            }
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Access {
    read: bool,
    write: bool,
    execute: bool,
}

impl Access {
    const READ: Access = Access {
        read: true,
        write: false,
        execute: false,
    };
    const WRITE: Access = Access {
        read: false,
        write: true,
        execute: false,
    };
}

#[cfg(unix)]
fn require(path: &Path, access: Access, operation: Operation) -> Result<(), PathError> {
    use nix::unistd::{access as check, AccessFlags};

    let mut flags = AccessFlags::empty();
    if access.read {
        flags |= AccessFlags::R_OK;
    }
    if access.write {
        flags |= AccessFlags::W_OK;
    }
    if access.execute {
        flags |= AccessFlags::X_OK;
    }

    check(path, flags).map_err(|_| PathError::PermissionDenied {
        path: path.to_path_buf(),
        operation: operation.as_str(),
    })
}

#[cfg(not(unix))]
fn require(path: &Path, access: Access, operation: Operation) -> Result<(), PathError> {
    let denied = || PathError::PermissionDenied {
        path: path.to_path_buf(),
        operation: operation.as_str(),
    };

    let metadata = path.metadata().map_err(|_| denied())?;
    // Directories carry no meaningful read-only bit on Windows.
    if access.write && !metadata.is_dir() && metadata.permissions().readonly() {
        return Err(denied());
    }
    Ok(())
}
