//! ZIP discovery, safety validation and extraction.

mod entry;
mod extractor;
pub mod validate;

pub use entry::{discover_archives, has_zip_extension, ArchiveEntry};
pub use extractor::{
    ArchiveExtractor, ExtractOptions, ExtractionOutcome, ExtractionStatus,
    DEFAULT_MAX_ARCHIVE_SIZE,
};
