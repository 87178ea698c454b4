use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::DEFAULT_MAX_ARCHIVE_SIZE;
use crate::error::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extract: ExtractConfig,
    pub artifacts: ArtifactsConfig,
    pub normalize: NormalizeConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Largest archive accepted without confirmation (bytes)
    pub max_archive_size: u64,
    /// Delete each archive after it is extracted successfully
    pub delete_archives: bool,
    /// Verify member checksums before extracting
    pub check_integrity: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Extra file names to remove
    pub extra_files: Vec<String>,
    /// Extra directory names to remove
    pub extra_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Repeat passes until no single-child directory remains
    pub fixed_point: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report detail: 0 (silent), 1 (summary), 2 (everything)
    pub verbosity: u8,
    /// Colored output when writing to a terminal
    pub color: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_archive_size: DEFAULT_MAX_ARCHIVE_SIZE,
            delete_archives: true,
            check_integrity: true,
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { fixed_point: true }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            verbosity: 1,
            color: true,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// if present, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/archive-sweeper/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("archive-sweeper").join("config.toml"))
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!(path = %path.display(), "Loading configuration");

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report.verbosity > 2 {
            return Err(ConfigError::Invalid(format!(
                "report.verbosity must be 0, 1 or 2 (got {})",
                self.report.verbosity
            )));
        }

        if self.extract.max_archive_size == 0 {
            return Err(ConfigError::Invalid(
                "extract.max_archive_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
