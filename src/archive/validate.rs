//! Safety checks run before anything is written.

use std::io::{self, Read, Seek};

use zip::ZipArchive;

use crate::error::ArchiveError;
use crate::guard::PathGuard;
use crate::interrupt;

/// What the metadata scan learned about an archive.
#[derive(Debug, Default, Clone)]
pub struct Inspection {
    pub entries: usize,
    /// Sum of declared uncompressed sizes.
    pub declared_size: u64,
    /// Names of entries flagged as encrypted.
    pub encrypted: Vec<String>,
}

/// Open an archive, mapping an unreadable central directory to `Corrupted`.
pub fn open<R: Read + Seek>(reader: R) -> Result<ZipArchive<R>, ArchiveError> {
    ZipArchive::new(reader).map_err(|e| ArchiveError::Corrupted(e.to_string()))
}

/// Scan entry metadata.
///
/// A single absolute or traversing entry name fails the whole archive.
pub fn inspect<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    guard: &PathGuard,
) -> Result<Inspection, ArchiveError> {
    let mut inspection = Inspection {
        entries: archive.len(),
        ..Default::default()
    };

    for index in 0..archive.len() {
        let file = archive
            .by_index_raw(index)
            .map_err(|e| ArchiveError::Corrupted(e.to_string()))?;
        let name = file.name().to_string();

        if guard.validate_untrusted(&name).is_err() {
            tracing::warn!(entry = %name, "Unsafe archive entry");
            return Err(ArchiveError::UnsafeEntry(name));
        }

        inspection.declared_size = inspection.declared_size.saturating_add(file.size());

        if file.encrypted() {
            inspection.encrypted.push(name);
        }
    }

    Ok(inspection)
}

/// Read every unencrypted member to the end so its CRC is verified.
///
/// The first bad member fails the archive. `interrupted` is polled between
/// members and between chunks of each member.
pub fn verify_integrity<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    interrupted: fn() -> bool,
) -> Result<(), ArchiveError> {
    for index in 0..archive.len() {
        if interrupted() {
            return Err(ArchiveError::Interrupted);
        }

        let encrypted = archive
            .by_index_raw(index)
            .map_err(|e| ArchiveError::Corrupted(e.to_string()))?
            .encrypted();
        if encrypted {
            continue;
        }

        let mut file = archive
            .by_index(index)
            .map_err(|e| ArchiveError::Corrupted(e.to_string()))?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        match interrupt::copy_interruptible(&mut file, &mut io::sink(), interrupted) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Err(ArchiveError::Interrupted),
            Err(e) => return Err(ArchiveError::Corrupted(format!("{}: {}", name, e))),
        }
    }

    tracing::debug!(entries = archive.len(), "Integrity check passed");
    Ok(())
}
