//! Archive Sweeper - batch ZIP extraction with OS-artifact cleanup
//!
//! This crate provides functionality for:
//! - Validating and extracting every ZIP archive in a directory
//! - Removing macOS metadata files and folders
//! - Collapsing single-child directory nesting
//! - Serializing concurrent runs with an advisory lock

pub mod archive;
pub mod cleaner;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod guard;
pub mod interrupt;
pub mod lock;
pub mod normalizer;
pub mod pipeline;
pub mod prompt;
pub mod report;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SweeperError};
pub use pipeline::{ExitStatus, Pipeline, RunOptions, RunReport};
