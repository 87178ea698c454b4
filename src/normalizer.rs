//! Collapses single-child directory nesting under a root.
//!
//! `root/outer/inner/...` becomes `root/inner/...` when `outer` holds nothing
//! but `inner` (after artifact cleaning). By default passes repeat until one
//! reorganizes nothing, so deeper chains collapse in a single run.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cleaner::ArtifactCleaner;
use crate::fsutil::{child_dirs, is_empty_dir, remove_path, same_entry, single_child_dir};
use crate::interrupt;
use crate::prompt::Prompt;
use crate::report::OperationStats;

/// Options for [`TreeNormalizer`].
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Repeat passes until nothing changes; otherwise run exactly one.
    pub fixed_point: bool,
    /// Replace an existing target without asking.
    pub no_confirm: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            fixed_point: true,
            no_confirm: false,
        }
    }
}

/// Counters for one normalization.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeCounts {
    pub examined: usize,
    pub reorganized: usize,
    pub ignored: usize,
}

/// A parent directory holding exactly one subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPair {
    pub parent: PathBuf,
    pub child: PathBuf,
}

impl DirectoryPair {
    fn child_name(&self) -> OsString {
        self.child
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default()
    }
}

/// What happened to one examined directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    Reorganized { target: PathBuf },
    Ignored(String),
}

pub struct TreeNormalizer {
    options: NormalizeOptions,
    cleaner: ArtifactCleaner,
}

impl TreeNormalizer {
    pub fn new(options: NormalizeOptions, cleaner: ArtifactCleaner) -> Self {
        Self { options, cleaner }
    }

    /// Normalize the immediate child directories of `root`.
    pub fn normalize(
        &self,
        root: &Path,
        prompt: &mut dyn Prompt,
        stats: &mut OperationStats,
    ) -> NormalizeCounts {
        let mut counts = NormalizeCounts::default();
        // Parents already ignored this run; they are not re-examined.
        let mut settled: HashSet<PathBuf> = HashSet::new();
        let mut passes = 0usize;

        loop {
            passes += 1;
            let reorganized = self.pass(root, prompt, stats, &mut settled, &mut counts);
            tracing::debug!(pass = passes, reorganized, "Normalization pass finished");

            if reorganized == 0 || !self.options.fixed_point || interrupt::is_interrupted() {
                break;
            }
        }

        counts
    }

    fn pass(
        &self,
        root: &Path,
        prompt: &mut dyn Prompt,
        stats: &mut OperationStats,
        settled: &mut HashSet<PathBuf>,
        counts: &mut NormalizeCounts,
    ) -> usize {
        let parents = match child_dirs(root) {
            Ok(dirs) => dirs,
            Err(e) => {
                stats.error(format!("Cannot list directory: {}", e), Some(root));
                return 0;
            }
        };

        let mut reorganized = 0;

        for parent in parents {
            if interrupt::is_interrupted() {
                break;
            }
            if settled.contains(&parent) || !parent.is_dir() {
                continue;
            }

            counts.examined += 1;
            stats.dirs_examined += 1;

            let outcome = self.examine(root, &parent, prompt, stats, settled);
            match outcome {
                PairOutcome::Reorganized { target } => {
                    counts.reorganized += 1;
                    stats.dirs_reorganized += 1;
                    reorganized += 1;
                    settled.remove(&target);
                }
                PairOutcome::Ignored(reason) => {
                    tracing::debug!(parent = %parent.display(), %reason, "Directory ignored");
                    counts.ignored += 1;
                    stats.dirs_ignored += 1;
                    settled.insert(parent);
                }
            }
        }

        reorganized
    }

    fn examine(
        &self,
        root: &Path,
        parent: &Path,
        prompt: &mut dyn Prompt,
        stats: &mut OperationStats,
        settled: &mut HashSet<PathBuf>,
    ) -> PairOutcome {
        // Junk must not hide a single real subdirectory.
        self.cleaner.clean(parent, stats);

        let child = match single_child_dir(parent) {
            Ok(Some(child)) => child,
            Ok(None) => {
                stats.info("Not a single-child directory, leaving as is", Some(parent));
                return PairOutcome::Ignored("not a single-child directory".to_string());
            }
            Err(e) => {
                stats.error(format!("Cannot list directory: {}", e), Some(parent));
                return PairOutcome::Ignored(e.to_string());
            }
        };

        let pair = DirectoryPair {
            parent: parent.to_path_buf(),
            child,
        };
        stats.operation("Reorganizing directory", Some(&pair.child));

        let target = root.join(pair.child_name());
        // Spelling alone misses `Photos/photos` on case-insensitive volumes.
        if target == pair.parent || same_entry(&target, &pair.parent) {
            return self.promote_same_name(&pair, target, stats);
        }

        if target.symlink_metadata().is_ok() {
            stats.warning("Target already exists", Some(&target));
            if !self.options.no_confirm
                && !prompt.confirm(&format!("Replace existing {}?", target.display()))
            {
                stats.info("Kept existing target", Some(&target));
                return PairOutcome::Ignored("target exists".to_string());
            }
            if let Err(e) = remove_path(&target) {
                stats.error(format!("Cannot replace target: {}", e), Some(&target));
                return PairOutcome::Ignored(e.to_string());
            }
            settled.remove(&target);
        }

        if let Err(e) = fs::rename(&pair.child, &target) {
            stats.error(format!("Move failed: {}", e), Some(&pair.child));
            return PairOutcome::Ignored(e.to_string());
        }

        self.finish(&pair, target, stats)
    }

    /// `root/x/x`: park the child beside the parent, drop the parent, rename
    /// the child to `target`, keeping the child's spelling.
    fn promote_same_name(
        &self,
        pair: &DirectoryPair,
        target: PathBuf,
        stats: &mut OperationStats,
    ) -> PairOutcome {
        let mut parked_name = OsString::from(".");
        parked_name.push(pair.child_name());
        parked_name.push(".sweeper-tmp");
        let parked = pair.parent.with_file_name(parked_name);

        if parked.symlink_metadata().is_ok() {
            stats.error("Temporary name already in use", Some(&parked));
            return PairOutcome::Ignored("temporary name in use".to_string());
        }

        if let Err(e) = fs::rename(&pair.child, &parked) {
            stats.error(format!("Move failed: {}", e), Some(&pair.child));
            return PairOutcome::Ignored(e.to_string());
        }

        if let Err(e) = fs::remove_dir(&pair.parent) {
            stats.warning(format!("Parent not empty after move: {}", e), Some(&pair.parent));
            if let Err(e) = fs::rename(&parked, &pair.child) {
                stats.error(
                    format!("Could not restore {}: {}", pair.child.display(), e),
                    Some(&parked),
                );
            }
            return PairOutcome::Ignored("parent not empty".to_string());
        }

        if let Err(e) = fs::rename(&parked, &target) {
            stats.error(
                format!("Could not rename into place, content left at temporary name: {}", e),
                Some(&parked),
            );
            return PairOutcome::Ignored(e.to_string());
        }

        stats.success("Reorganization successful", Some(&target));
        PairOutcome::Reorganized { target }
    }

    fn finish(&self, pair: &DirectoryPair, target: PathBuf, stats: &mut OperationStats) -> PairOutcome {
        match is_empty_dir(&pair.parent) {
            Ok(true) => {}
            Ok(false) => {
                stats.warning("Parent not empty after move, keeping it", Some(&pair.parent));
                return PairOutcome::Ignored("parent not empty".to_string());
            }
            Err(e) => {
                stats.warning(format!("Cannot inspect parent: {}", e), Some(&pair.parent));
                return PairOutcome::Ignored(e.to_string());
            }
        }

        if let Err(e) = fs::remove_dir(&pair.parent) {
            stats.warning(format!("Cannot remove parent: {}", e), Some(&pair.parent));
            return PairOutcome::Ignored(e.to_string());
        }

        stats.success("Reorganization successful", Some(&target));
        PairOutcome::Reorganized { target }
    }
}
