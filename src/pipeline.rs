//! One run over a target directory: lock, extract, clean, normalize.

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::archive::{
    discover_archives, ArchiveExtractor, ExtractOptions, ExtractionOutcome, ExtractionStatus,
};
use crate::cleaner::{ArtifactCleaner, ArtifactRules};
use crate::config::Config;
use crate::error::PathError;
use crate::guard::{Operation, PathGuard};
use crate::interrupt::{self, EXIT_INTERRUPTED};
use crate::lock::RunLock;
use crate::normalizer::{NormalizeOptions, TreeNormalizer};
use crate::prompt::Prompt;
use crate::report::OperationStats;

/// Everything a run needs to know, resolved from configuration and flags.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    pub clean_only: bool,
    pub no_confirm: bool,
    pub extract: ExtractOptions,
    pub fixed_point: bool,
    pub rules: ArtifactRules,
    /// Draw a progress bar on stderr when it is a terminal.
    pub show_progress: bool,
}

impl RunOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clean_only: false,
            no_confirm: false,
            extract: ExtractOptions::default(),
            fixed_point: true,
            rules: ArtifactRules::default(),
            show_progress: false,
        }
    }

    /// Options seeded from a loaded configuration.
    pub fn from_config(root: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            extract: ExtractOptions {
                max_archive_size: config.extract.max_archive_size,
                delete_archive: config.extract.delete_archives,
                check_integrity: config.extract.check_integrity,
                ..ExtractOptions::default()
            },
            fixed_point: config.normalize.fixed_point,
            rules: ArtifactRules::default().with_extra(
                config.artifacts.extra_files.iter().cloned(),
                config.artifacts.extra_dirs.iter().cloned(),
            ),
            ..Self::new(root)
        }
    }
}

/// Process exit status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Interrupted,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::Interrupted => EXIT_INTERRUPTED,
        }
    }
}

/// Statistics and exit status of a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub stats: OperationStats,
    pub exit: ExitStatus,
}

pub struct Pipeline {
    options: RunOptions,
    guard: PathGuard,
}

impl Pipeline {
    pub fn new(options: RunOptions) -> Self {
        Self::with_guard(options, PathGuard::new())
    }

    pub fn with_guard(options: RunOptions, guard: PathGuard) -> Self {
        Self { options, guard }
    }

    /// Execute the run. Per-item failures are recorded, never propagated.
    pub fn run(&self, prompt: &mut dyn Prompt) -> RunReport {
        let mut stats = OperationStats::new();

        let root = match self.check_root(&self.options.root, &mut stats) {
            Ok(root) => root,
            Err(e) => {
                stats.error(format!("Cannot use directory: {}", e), Some(&self.options.root));
                return RunReport {
                    stats,
                    exit: ExitStatus::Failure,
                };
            }
        };
        let root = root.as_path();

        let mut lock = RunLock::acquire(root, &mut stats);
        if lock.is_none()
            && !interrupt::is_interrupted()
            && !self.options.no_confirm
            && prompt.is_interactive()
            && !prompt.confirm("Could not lock the directory. Continue without a lock?")
        {
            stats.error("Run aborted: lock unavailable", Some(root));
            return RunReport {
                stats,
                exit: ExitStatus::Failure,
            };
        }

        if !interrupt::is_interrupted() {
            self.process(root, prompt, &mut stats);
        }

        if let Some(lock) = lock.as_mut() {
            lock.release();
        }

        let exit = if interrupt::is_interrupted() {
            stats.warning("Run interrupted", Some(root));
            ExitStatus::Interrupted
        } else if stats.error_count() > 0 {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        };

        tracing::info!(code = exit.code(), errors = stats.error_count(), "Run finished");
        RunReport { stats, exit }
    }

    /// Resolve `root` to an absolute directory and check it can be read and written.
    fn check_root(&self, root: &Path, stats: &mut OperationStats) -> Result<PathBuf, PathError> {
        let resolved = fs::canonicalize(root).map_err(|e| {
            tracing::debug!(path = %root.display(), "Cannot resolve directory: {}", e);
            PathError::NotFound(root.to_path_buf())
        })?;

        if !resolved.is_dir() {
            return Err(PathError::NotADirectory(root.to_path_buf()));
        }

        for operation in [Operation::Read, Operation::Write] {
            self.guard.validate(&resolved, operation, stats)?;
        }

        Ok(resolved)
    }

    fn process(&self, root: &Path, prompt: &mut dyn Prompt, stats: &mut OperationStats) {
        let cleaner = ArtifactCleaner::new(self.options.rules.clone());

        if self.options.clean_only {
            stats.operation("Cleaning OS artifacts", Some(root));
            cleaner.clean(root, stats);
            return;
        }

        self.extract_all(root, &cleaner, prompt, stats);
        if interrupt::is_interrupted() {
            return;
        }

        stats.operation("Cleaning OS artifacts", Some(root));
        cleaner.clean(root, stats);
        if interrupt::is_interrupted() {
            return;
        }

        stats.operation("Reorganizing directories", Some(root));
        let normalizer = TreeNormalizer::new(
            NormalizeOptions {
                fixed_point: self.options.fixed_point,
                no_confirm: self.options.no_confirm,
            },
            cleaner,
        );
        normalizer.normalize(root, prompt, stats);
    }

    fn extract_all(
        &self,
        root: &Path,
        cleaner: &ArtifactCleaner,
        prompt: &mut dyn Prompt,
        stats: &mut OperationStats,
    ) {
        let archives = match discover_archives(root) {
            Ok(archives) => archives,
            Err(e) => {
                stats.error(format!("Cannot list archives: {}", e), Some(root));
                return;
            }
        };

        if archives.is_empty() {
            stats.info("No ZIP archives found", Some(root));
            return;
        }

        let extractor = ArchiveExtractor::new(
            ExtractOptions {
                no_confirm: self.options.no_confirm,
                ..self.options.extract.clone()
            },
            self.guard.clone(),
            cleaner.clone(),
        );

        let progress = self.progress_bar(archives.len() as u64);

        for entry in &archives {
            if interrupt::is_interrupted() {
                break;
            }
            progress.set_message(entry.file_name());

            // Prompts write to stderr; keep the bar out of their way.
            let outcome = progress.suspend(|| extractor.extract(entry, root, prompt, stats));
            record_outcome(&outcome, stats);
            progress.inc(1);
        }

        progress.finish_and_clear();
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress || !std::io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("━╸─"));
        }
        bar
    }
}

fn record_outcome(outcome: &ExtractionOutcome, stats: &mut OperationStats) {
    stats.archives_seen += 1;

    match &outcome.status {
        ExtractionStatus::Succeeded => {
            stats.archives_succeeded += 1;
            stats.bytes_extracted += outcome.bytes_written;
            stats.success(
                format!(
                    "Extraction successful ({} artifact files, {} artifact dirs removed)",
                    outcome.files_cleaned, outcome.dirs_cleaned
                ),
                Some(&outcome.destination),
            );
        }
        ExtractionStatus::SkippedByUser { reason } => {
            stats.archives_skipped += 1;
            stats.info(format!("Skipped by user: {}", reason), Some(&outcome.archive));
        }
        ExtractionStatus::Failed(e) => {
            stats.archives_failed += 1;
            stats.error(
                format!("Extraction failed [{}]: {}", e.kind(), e),
                Some(&outcome.archive),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::AutoPrompt;
    use crate::report::Severity;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
    }

    fn pipeline(root: &Path, configure: impl FnOnce(&mut RunOptions)) -> Pipeline {
        let mut options = RunOptions::new(root);
        configure(&mut options);
        Pipeline::with_guard(options, PathGuard::with_mounts(Vec::new()))
    }

    #[test]
    fn test_full_run_extracts_cleans_and_flattens() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("inbox");
        fs::create_dir(&root).unwrap();
        write_zip(
            &root.join("photos.zip"),
            &[
                ("photos/", b""),
                ("photos/a.jpg", b"jpeg"),
                ("photos/b.jpg", b"jpeg"),
                ("__MACOSX/photos/._a.jpg", b"meta"),
            ],
        );
        fs::write(root.join(".DS_Store"), "junk").unwrap();

        let report = pipeline(&root, |_| {}).run(&mut AutoPrompt(false));

        assert_eq!(report.exit, ExitStatus::Success, "{:?}", report.stats.logs);
        assert!(root.join("photos/a.jpg").exists());
        assert!(root.join("photos/b.jpg").exists());
        assert!(!root.join("photos/photos").exists());
        assert!(!root.join("photos.zip").exists());
        assert!(!root.join(".DS_Store").exists());
        assert_eq!(report.stats.archives_seen, 1);
        assert_eq!(report.stats.archives_succeeded, 1);
        assert!(report.stats.dirs_reorganized >= 1);
        assert!(!tmp.path().join(".inbox.archive-sweeper.lock").exists());
    }

    #[test]
    fn test_clean_only_leaves_archives() {
        let tmp = TempDir::new().unwrap();
        write_zip(&tmp.path().join("keep.zip"), &[("a.txt", b"a")]);
        fs::create_dir_all(tmp.path().join("outer/inner")).unwrap();
        fs::write(tmp.path().join("._ghost"), "x").unwrap();

        let report = pipeline(tmp.path(), |o| o.clean_only = true).run(&mut AutoPrompt(false));

        assert_eq!(report.exit, ExitStatus::Success);
        assert!(tmp.path().join("keep.zip").exists());
        assert!(!tmp.path().join("keep").exists());
        assert!(tmp.path().join("outer/inner").is_dir());
        assert!(!tmp.path().join("._ghost").exists());
        assert_eq!(report.stats.archives_seen, 0);
    }

    #[test]
    fn test_failed_archive_sets_failure_but_others_proceed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a-broken.zip"), "garbage").unwrap();
        write_zip(&tmp.path().join("b-good.zip"), &[("x.txt", b"x"), ("y.txt", b"y")]);

        let report = pipeline(tmp.path(), |o| o.no_confirm = true).run(&mut AutoPrompt(true));

        assert_eq!(report.exit, ExitStatus::Failure);
        assert_eq!(report.stats.archives_failed, 1);
        assert_eq!(report.stats.archives_succeeded, 1);
        assert!(tmp.path().join("b-good/x.txt").exists());
        assert!(tmp.path().join("a-broken.zip").exists());
    }

    #[test]
    fn test_skipped_archive_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        write_zip(&tmp.path().join("dup.zip"), &[("new.txt", b"new")]);
        fs::create_dir(tmp.path().join("dup")).unwrap();
        fs::write(tmp.path().join("dup/old.txt"), "old").unwrap();
        fs::write(tmp.path().join("dup/older.txt"), "older").unwrap();

        let report = pipeline(tmp.path(), |_| {}).run(&mut AutoPrompt(false));

        assert_eq!(report.exit, ExitStatus::Success);
        assert_eq!(report.stats.archives_skipped, 1);
        assert!(tmp.path().join("dup/old.txt").exists());
        assert!(tmp.path().join("dup.zip").exists());
    }

    #[test]
    fn test_missing_root_fails() {
        let tmp = TempDir::new().unwrap();
        let report = pipeline(&tmp.path().join("nope"), |_| {}).run(&mut AutoPrompt(true));

        assert_eq!(report.exit, ExitStatus::Failure);
        assert_eq!(report.stats.count(Severity::Error), 1);
    }

    #[test]
    fn test_file_root_fails() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let report = pipeline(&file, |_| {}).run(&mut AutoPrompt(true));
        assert_eq!(report.exit, ExitStatus::Failure);
        assert!(report.stats.logs.iter().any(|l| l.message.contains("Not a directory")));
    }

    #[test]
    fn test_root_with_parent_segment_is_resolved() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("inbox");
        fs::create_dir_all(root.join("nested")).unwrap();
        write_zip(&root.join("a.zip"), &[("one.txt", b"1"), ("two.txt", b"2")]);

        let report = pipeline(&root.join("nested").join(".."), |_| {}).run(&mut AutoPrompt(false));

        assert_eq!(report.exit, ExitStatus::Success, "{:?}", report.stats.logs);
        assert!(root.join("a/one.txt").exists());
        assert!(!tmp.path().join(".nested.archive-sweeper.lock").exists());
    }

    #[test]
    fn test_keep_archives() {
        let tmp = TempDir::new().unwrap();
        write_zip(&tmp.path().join("a.zip"), &[("one.txt", b"1"), ("two.txt", b"2")]);

        let report = pipeline(tmp.path(), |o| o.extract.delete_archive = false)
            .run(&mut AutoPrompt(false));

        assert_eq!(report.exit, ExitStatus::Success);
        assert!(tmp.path().join("a.zip").exists());
        assert!(tmp.path().join("a/one.txt").exists());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::Failure.code(), 1);
        assert_eq!(ExitStatus::Interrupted.code(), 130);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.extract.delete_archives = false;
        config.normalize.fixed_point = false;
        config.artifacts.extra_files = vec!["Thumbs.db".to_string()];

        let options = RunOptions::from_config("/tmp/x", &config);
        assert!(!options.extract.delete_archive);
        assert!(!options.fixed_point);
        assert!(options.rules.is_artifact_file("Thumbs.db"));
        assert_eq!(options.root, PathBuf::from("/tmp/x"));
    }
}
