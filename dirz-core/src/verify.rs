use crate::codec;
use crate::error::{ArchiveError, IoContext, Result};
use crate::manifest::read_archive;
use crate::walk::{absolute_root, list_files, relative_key};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub files_checked: usize,
}

/// Prove that `archive` reproduces every file in `original_files` byte for byte.
///
/// Checks, in order: record count, presence of each key, the live source file
/// against the stored digest (`Integrity`), and the stored payload against the
/// stored digest (`Decompression`). Read-only.
pub fn verify_archive(
    archive: &Path,
    original_files: &[PathBuf],
    source_root: &Path,
) -> Result<VerifyReport> {
    info!(archive = %archive.display(), "validating archive");
    let manifest = read_archive(archive)?;

    if manifest.files.len() != original_files.len() {
        return Err(ArchiveError::CountMismatch {
            archived: manifest.files.len(),
            expected: original_files.len(),
        });
    }

    for path in original_files {
        let key = relative_key(source_root, path)?;
        let record =
            manifest.files.get(&key).ok_or_else(|| ArchiveError::MissingFile(key.clone()))?;

        let live = std::fs::read(path).io_context(|| format!("read {}", path.display()))?;
        if codec::sha256_hex(&live) != record.original_hash {
            return Err(ArchiveError::Integrity(key));
        }

        let stored = codec::decode_text(&record.content)
            .map_err(|_| ArchiveError::Decompression(key.clone()))?;
        let restored =
            codec::gunzip(&stored).map_err(|_| ArchiveError::Decompression(key.clone()))?;
        if codec::sha256_hex(&restored) != record.original_hash {
            return Err(ArchiveError::Decompression(key));
        }
    }

    info!(files = original_files.len(), "validation successful");
    Ok(VerifyReport { files_checked: original_files.len() })
}

/// Enumerate `source_root` now and verify `archive` against it.
pub fn verify_against_source(archive: &Path, source_root: &Path) -> Result<VerifyReport> {
    let root = absolute_root(source_root)?;
    let files = list_files(&root)?;
    verify_archive(archive, &files, &root)
}
