//! Validates and extracts a single archive.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use humansize::{format_size, BINARY};
use zip::ZipArchive;

use super::entry::ArchiveEntry;
use super::validate;
use crate::cleaner::{ArtifactCleaner, CleanCounts};
use crate::error::ArchiveError;
use crate::fsutil::{is_empty_dir, remove_path};
use crate::guard::{Operation, PathGuard};
use crate::interrupt;
use crate::prompt::Prompt;
use crate::report::OperationStats;

/// Default per-archive ceiling: 10 GiB.
pub const DEFAULT_MAX_ARCHIVE_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Options for the extractor.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Largest archive (and largest declared uncompressed total) accepted without consent.
    pub max_archive_size: u64,
    /// Never ask; overwrite existing destinations.
    pub no_confirm: bool,
    /// Delete the original archive after a successful extraction.
    pub delete_archive: bool,
    /// Read every member once before extracting to verify checksums.
    pub check_integrity: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_archive_size: DEFAULT_MAX_ARCHIVE_SIZE,
            no_confirm: false,
            delete_archive: true,
            check_integrity: true,
        }
    }
}

/// How processing one archive ended.
#[derive(Debug)]
pub enum ExtractionStatus {
    Succeeded,
    /// The operator declined; nothing was changed.
    SkippedByUser { reason: String },
    Failed(ArchiveError),
}

/// Result of processing one [`ArchiveEntry`].
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub archive: PathBuf,
    pub destination: PathBuf,
    pub status: ExtractionStatus,
    pub files_cleaned: usize,
    pub dirs_cleaned: usize,
    pub bytes_written: u64,
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExtractionStatus::Succeeded)
    }
}

enum Processed {
    Skipped(String),
    Extracted { cleaned: CleanCounts, bytes: u64 },
}

/// Extracts archives into sibling directories named after them.
pub struct ArchiveExtractor {
    options: ExtractOptions,
    guard: PathGuard,
    cleaner: ArtifactCleaner,
    interrupted: fn() -> bool,
}

impl ArchiveExtractor {
    pub fn new(options: ExtractOptions, guard: PathGuard, cleaner: ArtifactCleaner) -> Self {
        Self {
            options,
            guard,
            cleaner,
            interrupted: interrupt::is_interrupted,
        }
    }

    /// Replace the interruption check (the process-wide signal flag by default).
    pub fn with_interrupt_check(mut self, interrupted: fn() -> bool) -> Self {
        self.interrupted = interrupted;
        self
    }

    /// Process one archive into `dest_root/<archive stem>`.
    ///
    /// Never panics or propagates: every outcome, including failures, is
    /// returned as an [`ExtractionOutcome`]. A destination created by this
    /// call is removed again on failure, except for the empty-archive case
    /// where it is left for inspection.
    pub fn extract(
        &self,
        entry: &ArchiveEntry,
        dest_root: &Path,
        prompt: &mut dyn Prompt,
        stats: &mut OperationStats,
    ) -> ExtractionOutcome {
        let destination = dest_root.join(&entry.dest_name);

        stats.operation(
            format!("Processing ZIP: {}", entry.file_name()),
            Some(&entry.path),
        );

        let mut outcome = ExtractionOutcome {
            archive: entry.path.clone(),
            destination: destination.clone(),
            status: ExtractionStatus::Succeeded,
            files_cleaned: 0,
            dirs_cleaned: 0,
            bytes_written: 0,
        };

        match self.process(entry, &destination, prompt, stats) {
            Ok(Processed::Skipped(reason)) => {
                outcome.status = ExtractionStatus::SkippedByUser { reason };
            }
            Ok(Processed::Extracted { cleaned, bytes }) => {
                outcome.files_cleaned = cleaned.files;
                outcome.dirs_cleaned = cleaned.dirs;
                outcome.bytes_written = bytes;
                outcome.status = match self.finish(entry, &destination, stats) {
                    Ok(()) => ExtractionStatus::Succeeded,
                    Err(e) => ExtractionStatus::Failed(e),
                };
            }
            Err(e) => outcome.status = ExtractionStatus::Failed(e),
        }

        outcome
    }

    fn process(
        &self,
        entry: &ArchiveEntry,
        destination: &Path,
        prompt: &mut dyn Prompt,
        stats: &mut OperationStats,
    ) -> Result<Processed, ArchiveError> {
        self.guard.validate_name(&entry.dest_name)?;
        self.guard.validate(destination, Operation::Create, stats)?;

        let mut overridden = self.check_ceiling(entry.size, "Archive", &entry.path, prompt, stats)?;

        let file = File::open(&entry.path).map_err(|e| ArchiveError::io(&entry.path, e))?;
        let mut archive = validate::open(BufReader::new(file))?;

        let inspection = validate::inspect(&mut archive, &self.guard)?;
        if !overridden {
            overridden = self.check_ceiling(
                inspection.declared_size,
                "Declared uncompressed",
                &entry.path,
                prompt,
                stats,
            )?;
        }

        if let Some(first) = inspection.encrypted.first() {
            stats.warning(
                format!(
                    "Archive contains {} encrypted entr{} (first: {})",
                    inspection.encrypted.len(),
                    if inspection.encrypted.len() == 1 { "y" } else { "ies" },
                    first
                ),
                Some(&entry.path),
            );
            if !self.options.no_confirm && !prompt.confirm("Archive is password protected. Attempt anyway?") {
                return Ok(Processed::Skipped("encrypted archive".to_string()));
            }
            // No password support: consent still cannot produce content.
            return Err(ArchiveError::Encrypted(first.clone()));
        }

        if self.options.check_integrity {
            validate::verify_integrity(&mut archive, self.interrupted)?;
        }

        // Last point at which nothing on disk has changed.
        self.check_interrupted()?;

        if destination.symlink_metadata().is_ok() {
            stats.warning("Destination directory exists", Some(destination));
            if !self.options.no_confirm
                && !prompt.confirm(&format!("Overwrite contents of {}?", destination.display()))
            {
                return Ok(Processed::Skipped("destination exists".to_string()));
            }
            self.check_interrupted()?;
            stats.operation("Clearing existing directory", Some(destination));
            remove_path(destination).map_err(|e| ArchiveError::io(destination, e))?;
        }

        stats.info("Creating directory", Some(destination));
        fs::create_dir(destination).map_err(|e| ArchiveError::io(destination, e))?;

        let budget = (!overridden).then_some(self.options.max_archive_size);
        let written = self.write_entries(&mut archive, destination, budget);
        let bytes = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                discard(destination, stats);
                return Err(e);
            }
        };

        let cleaned = self.cleaner.clean(destination, stats);
        Ok(Processed::Extracted { cleaned, bytes })
    }

    fn check_interrupted(&self) -> Result<(), ArchiveError> {
        if (self.interrupted)() {
            return Err(ArchiveError::Interrupted);
        }
        Ok(())
    }

    /// Ask before exceeding the size ceiling. `Ok(true)` means the operator overrode it.
    fn check_ceiling(
        &self,
        size: u64,
        what: &str,
        archive: &Path,
        prompt: &mut dyn Prompt,
        stats: &mut OperationStats,
    ) -> Result<bool, ArchiveError> {
        let limit = self.options.max_archive_size;
        if size <= limit {
            return Ok(false);
        }

        stats.warning(
            format!(
                "{} size {} exceeds limit of {}",
                what,
                format_size(size, BINARY),
                format_size(limit, BINARY)
            ),
            Some(archive),
        );

        if !self.options.no_confirm && prompt.confirm("Archive exceeds the size limit. Extract anyway?") {
            stats.warning("Size limit overridden by operator", Some(archive));
            return Ok(true);
        }

        Err(ArchiveError::TooLarge { size, limit })
    }

    fn write_entries<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        destination: &Path,
        budget: Option<u64>,
    ) -> Result<u64, ArchiveError> {
        let mut total = 0u64;

        for index in 0..archive.len() {
            self.check_interrupted()?;

            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let relative = file
                .enclosed_name()
                .ok_or_else(|| ArchiveError::UnsafeEntry(name.clone()))?
                .to_path_buf();
            let target = destination.join(relative);

            if file.is_dir() {
                fs::create_dir_all(&target).map_err(|e| ArchiveError::io(&target, e))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
            }

            let mut out = File::create(&target).map_err(|e| ArchiveError::io(&target, e))?;
            let written = match budget {
                Some(limit) => {
                    let remaining = limit.saturating_sub(total);
                    let mut limited = (&mut file).take(remaining.saturating_add(1));
                    interrupt::copy_interruptible(&mut limited, &mut out, self.interrupted)
                }
                None => interrupt::copy_interruptible(&mut file, &mut out, self.interrupted),
            }
            .map_err(|e| match e.kind() {
                io::ErrorKind::Interrupted => ArchiveError::Interrupted,
                _ => ArchiveError::io(&target, e),
            })?;

            total = total.saturating_add(written);
            if let Some(limit) = budget {
                if total > limit {
                    return Err(ArchiveError::TooLarge { size: total, limit });
                }
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    let mode = (mode & 0o777) | 0o600;
                    fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                        .map_err(|e| ArchiveError::io(&target, e))?;
                }
            }
        }

        Ok(total)
    }

    fn finish(
        &self,
        entry: &ArchiveEntry,
        destination: &Path,
        stats: &mut OperationStats,
    ) -> Result<(), ArchiveError> {
        if is_empty_dir(destination).map_err(|e| ArchiveError::io(destination, e))? {
            return Err(ArchiveError::Empty);
        }

        if self.options.delete_archive {
            fs::remove_file(&entry.path).map_err(|e| ArchiveError::io(&entry.path, e))?;
            stats.info("Removed original archive", Some(&entry.path));
        }

        Ok(())
    }
}

/// Best-effort removal of a partially extracted destination.
fn discard(destination: &Path, stats: &mut OperationStats) {
    match remove_path(destination) {
        Ok(()) => stats.info("Removed partial extraction", Some(destination)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => stats.error(
            format!("Could not remove partial extraction: {}", e),
            Some(destination),
        ),
    }
}
