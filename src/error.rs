use std::path::PathBuf;
use thiserror::Error;

/// Core library errors
#[derive(Error, Debug)]
pub enum SweeperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error at path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures reported by the path guard.
///
/// These only ever abort the item being validated, never the whole run.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Path too long ({length} > {limit} characters): {path}")]
    TooLong {
        path: PathBuf,
        length: usize,
        limit: usize,
    },

    #[error("Path traversal detected: {0}")]
    Traversal(PathBuf),

    #[error("Permission denied ({operation}): {path}")]
    PermissionDenied {
        path: PathBuf,
        operation: &'static str,
    },

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Failures that abort a single archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Bad archive: {0}")]
    Corrupted(String),

    #[error("Unsafe entry in archive: '{0}'")]
    UnsafeEntry(String),

    #[error("Archive contains encrypted entries: '{0}'")]
    Encrypted(String),

    #[error("Empty archive")]
    Empty,

    #[error("Invalid destination: {0}")]
    Destination(#[from] PathError),

    #[error("IO error at path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Extraction interrupted")]
    Interrupted,
}

impl ArchiveError {
    /// Short machine-friendly label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ArchiveError::TooLarge { .. } => "too-large",
            ArchiveError::Corrupted(_) => "bad-archive",
            ArchiveError::UnsafeEntry(_) => "unsafe-entry",
            ArchiveError::Encrypted(_) => "encrypted",
            ArchiveError::Empty => "empty",
            ArchiveError::Destination(_) => "destination",
            ArchiveError::Io { .. } => "io",
            ArchiveError::Zip(_) => "zip",
            ArchiveError::Interrupted => "interrupted",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SweeperError>;
