//! Run statistics and the leveled operation log.
//!
//! A single [`OperationStats`] value is created per run and threaded by
//! `&mut` through every component. Rendering lives in [`render`].

mod render;

pub use render::{rate, select_renderer, PlainRenderer, Renderer, StyledRenderer};

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
    /// Marks the start of a step.
    Operation,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "[INFO]",
            Severity::Warning => "[WARNING]",
            Severity::Error => "[ERROR]",
            Severity::Success => "[SUCCESS]",
            Severity::Operation => "→",
        }
    }
}

/// One immutable log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// A path deleted by the artifact cleaner.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedPath {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Aggregate counters plus the ordered log of one run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct OperationStats {
    pub archives_seen: usize,
    pub archives_succeeded: usize,
    pub archives_failed: usize,
    pub archives_skipped: usize,
    pub bytes_extracted: u64,
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub dirs_examined: usize,
    pub dirs_reorganized: usize,
    pub dirs_ignored: usize,
    pub logs: Vec<LogEntry>,
    pub removed: Vec<RemovedPath>,
}

impl OperationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a log entry and mirror it as a tracing event.
    pub fn add_log(&mut self, message: impl Into<String>, severity: Severity, path: Option<&Path>) {
        let message = message.into();
        match (severity, path) {
            (Severity::Error, Some(p)) => tracing::error!(path = %p.display(), "{}", message),
            (Severity::Error, None) => tracing::error!("{}", message),
            (Severity::Warning, Some(p)) => tracing::warn!(path = %p.display(), "{}", message),
            (Severity::Warning, None) => tracing::warn!("{}", message),
            (_, Some(p)) => tracing::debug!(path = %p.display(), "{}", message),
            (_, None) => tracing::debug!("{}", message),
        }
        self.logs.push(LogEntry {
            message,
            severity,
            path: path.map(Path::to_path_buf),
        });
    }

    pub fn info(&mut self, message: impl Into<String>, path: Option<&Path>) {
        self.add_log(message, Severity::Info, path);
    }

    pub fn warning(&mut self, message: impl Into<String>, path: Option<&Path>) {
        self.add_log(message, Severity::Warning, path);
    }

    pub fn error(&mut self, message: impl Into<String>, path: Option<&Path>) {
        self.add_log(message, Severity::Error, path);
    }

    pub fn success(&mut self, message: impl Into<String>, path: Option<&Path>) {
        self.add_log(message, Severity::Success, path);
    }

    pub fn operation(&mut self, message: impl Into<String>, path: Option<&Path>) {
        self.add_log(message, Severity::Operation, path);
    }

    /// Record a deletion made by the artifact cleaner.
    pub fn record_removed(&mut self, path: &Path, is_dir: bool) {
        if is_dir {
            self.dirs_removed += 1;
        } else {
            self.files_removed += 1;
        }
        self.removed.push(RemovedPath {
            path: path.to_path_buf(),
            is_dir,
        });
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.logs.iter().filter(|l| l.severity == severity).count()
    }

    pub fn entries(&self, severity: Severity) -> impl Iterator<Item = &LogEntry> {
        self.logs.iter().filter(move |l| l.severity == severity)
    }

    /// Render the summary at the given verbosity (0, 1 or 2).
    pub fn render(&self, verbosity: u8, renderer: &dyn Renderer) -> String {
        render::render(self, verbosity, renderer)
    }
}
