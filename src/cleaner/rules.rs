//! Which names count as operating-system artifacts.

use std::collections::HashSet;

/// Directories created by macOS (Spotlight, Trash, fsevents, resource forks).
pub const ARTIFACT_DIRS: &[&str] = &[
    "__MACOSX",
    ".__MACOSX",
    ".Spotlight-V100",
    ".Trashes",
    ".fseventsd",
    ".TemporaryItems",
    ".DocumentRevisions-V100",
];

/// Files created by macOS Finder.
pub const ARTIFACT_FILES: &[&str] = &[
    ".DS_Store",
    "._.DS_Store",
    ".AppleDouble",
    ".LSOverride",
    "Icon\r",
];

/// Prefix of AppleDouble sidecar files (`^\._.*$`).
pub const APPLE_DOUBLE_PREFIX: &str = "._";

/// Set of names the cleaner deletes.
///
/// Built-in names can be extended from configuration; they can never be
/// removed.
#[derive(Debug, Clone)]
pub struct ArtifactRules {
    files: HashSet<String>,
    dirs: HashSet<String>,
}

impl Default for ArtifactRules {
    fn default() -> Self {
        Self {
            files: ARTIFACT_FILES.iter().map(|s| s.to_string()).collect(),
            dirs: ARTIFACT_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ArtifactRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add extra exact file and directory names.
    pub fn with_extra<F, D>(mut self, files: F, dirs: D) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self.dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn is_artifact_file(&self, name: &str) -> bool {
        self.files.contains(name) || name.starts_with(APPLE_DOUBLE_PREFIX)
    }

    pub fn is_artifact_dir(&self, name: &str) -> bool {
        self.dirs.contains(name)
    }
}
