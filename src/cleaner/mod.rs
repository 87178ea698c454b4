//! Operating-system artifact removal.
//!
//! This module provides:
//! - The set of names treated as artifacts (`.DS_Store`, `__MACOSX`, `._*`, ...)
//! - A best-effort recursive cleaner

mod executor;
mod rules;

pub use executor::{ArtifactCleaner, CleanCounts};
pub use rules::{ArtifactRules, APPLE_DOUBLE_PREFIX, ARTIFACT_DIRS, ARTIFACT_FILES};
