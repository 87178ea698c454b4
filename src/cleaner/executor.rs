//! Executor for removing operating-system artifacts from a tree.

use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use super::rules::ArtifactRules;
use crate::report::OperationStats;

/// Number of artifacts removed by one clean.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanCounts {
    pub files: usize,
    pub dirs: usize,
}

impl CleanCounts {
    pub fn total(&self) -> usize {
        self.files + self.dirs
    }
}

/// Recursively deletes artifact files and directories.
///
/// Cleaning is best-effort: every failure is recorded and the scan continues.
#[derive(Debug, Clone, Default)]
pub struct ArtifactCleaner {
    rules: ArtifactRules,
}

impl ArtifactCleaner {
    pub fn new(rules: ArtifactRules) -> Self {
        Self { rules }
    }

    /// Clean every descendant of `root` (not `root` itself).
    pub fn clean(&self, root: &Path, stats: &mut OperationStats) -> CleanCounts {
        let mut counts = CleanCounts::default();
        let mut entries: Vec<DirEntry> = Vec::new();

        for result in WalkDir::new(root).min_depth(1).follow_links(false) {
            match result {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    stats.warning(format!("Cannot scan: {}", err), Some(&path));
                }
            }
        }

        // Deepest first, so a directory's contents are handled before it.
        entries.sort_by(|a, b| b.depth().cmp(&a.depth()));

        for entry in entries {
            let path = entry.path();

            // Gone with an ancestor removed earlier in this pass.
            if path.symlink_metadata().is_err() {
                continue;
            }

            let file_type = entry.file_type();
            let name = entry.file_name().to_string_lossy();

            if file_type.is_symlink() {
                tracing::debug!(path = %path.display(), "Skipping symlink");
            } else if file_type.is_dir() {
                if self.rules.is_artifact_dir(&name) {
                    match fs::remove_dir_all(path) {
                        Ok(()) => {
                            counts.dirs += 1;
                            stats.record_removed(path, true);
                            stats.info("Removed artifact directory", Some(path));
                        }
                        Err(e) => stats.error(format!("Error removing directory: {}", e), Some(path)),
                    }
                }
            } else if file_type.is_file() {
                if self.rules.is_artifact_file(&name) {
                    match fs::remove_file(path) {
                        Ok(()) => {
                            counts.files += 1;
                            stats.record_removed(path, false);
                            stats.info("Removed artifact file", Some(path));
                        }
                        Err(e) => stats.error(format!("Error removing file: {}", e), Some(path)),
                    }
                }
            } else {
                tracing::debug!(path = %path.display(), "Skipping special file");
            }
        }

        tracing::debug!(
            root = %root.display(),
            files = counts.files,
            dirs = counts.dirs,
            "Artifact clean finished"
        );

        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_messy_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        fs::create_dir_all(root.join("photos/__MACOSX/photos")).unwrap();
        fs::write(root.join("photos/__MACOSX/photos/._img.jpg"), "x").unwrap();
        fs::write(root.join("photos/img.jpg"), "jpeg").unwrap();
        fs::write(root.join("photos/.DS_Store"), "x").unwrap();
        fs::write(root.join("photos/._img.jpg"), "x").unwrap();
        fs::create_dir_all(root.join(".Spotlight-V100/Store")).unwrap();
        fs::write(root.join(".Spotlight-V100/Store/index"), "x").unwrap();
        fs::write(root.join("notes.txt"), "keep").unwrap();

        tmp
    }

    #[test]
    fn test_removes_artifacts_and_keeps_content() {
        let tmp = create_messy_tree();
        let mut stats = OperationStats::new();

        let counts = ArtifactCleaner::default().clean(tmp.path(), &mut stats);

        // ._img.jpg (inside __MACOSX), .DS_Store, ._img.jpg
        assert_eq!(counts.files, 3);
        // __MACOSX, .Spotlight-V100
        assert_eq!(counts.dirs, 2);
        assert_eq!(stats.files_removed, 3);
        assert_eq!(stats.dirs_removed, 2);

        assert!(tmp.path().join("photos/img.jpg").exists());
        assert!(tmp.path().join("notes.txt").exists());
        assert!(!tmp.path().join("photos/__MACOSX").exists());
        assert!(!tmp.path().join(".Spotlight-V100").exists());
        assert!(!tmp.path().join("photos/.DS_Store").exists());
    }

    #[test]
    fn test_second_clean_is_noop() {
        let tmp = create_messy_tree();
        let cleaner = ArtifactCleaner::default();
        let mut stats = OperationStats::new();

        let first = cleaner.clean(tmp.path(), &mut stats);
        let second = cleaner.clean(tmp.path(), &mut stats);

        assert!(first.total() > 0);
        assert_eq!(second, CleanCounts::default());
    }

    #[test]
    fn test_root_itself_is_never_removed() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("__MACOSX");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("keep.txt"), "x").unwrap();

        let mut stats = OperationStats::new();
        let counts = ArtifactCleaner::default().clean(&root, &mut stats);

        assert_eq!(counts.total(), 0);
        assert!(root.join("keep.txt").exists());
    }

    #[test]
    fn test_empty_directory_is_fine() {
        let tmp = TempDir::new().unwrap();
        let mut stats = OperationStats::new();

        let counts = ArtifactCleaner::default().clean(tmp.path(), &mut stats);

        assert_eq!(counts.total(), 0);
        assert!(stats.logs.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed_or_deleted() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join(".DS_Store"), "x").unwrap();

        std::os::unix::fs::symlink(outside.path(), tmp.path().join("linked")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join(".DS_Store"),
            tmp.path().join("._link"),
        )
        .unwrap();

        let mut stats = OperationStats::new();
        let counts = ArtifactCleaner::default().clean(tmp.path(), &mut stats);

        assert_eq!(counts.total(), 0);
        assert!(outside.path().join(".DS_Store").exists());
        assert!(tmp.path().join("._link").symlink_metadata().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_removal_failure_is_logged_and_scan_continues() {
        use std::os::unix::fs::PermissionsExt;

        if nix::unistd::geteuid().is_root() {
            return;
        }

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join(".DS_Store"), "x").unwrap();
        fs::write(tmp.path().join(".DS_Store"), "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let mut stats = OperationStats::new();
        let counts = ArtifactCleaner::default().clean(tmp.path(), &mut stats);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(counts.files, 1);
        assert_eq!(stats.error_count(), 1);
        assert!(locked.join(".DS_Store").exists());
    }

    #[test]
    fn test_extra_rules_are_honoured() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Thumbs.db"), "x").unwrap();

        let cleaner = ArtifactCleaner::new(ArtifactRules::new().with_extra(["Thumbs.db"], Vec::<String>::new()));
        let mut stats = OperationStats::new();

        assert_eq!(cleaner.clean(tmp.path(), &mut stats).files, 1);
    }
}
