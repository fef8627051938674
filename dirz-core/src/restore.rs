use crate::codec;
use crate::error::{ArchiveError, IoContext, Result};
use crate::manifest::{read_archive, FileRecord};
use crate::path_safety::resolve_key;
use crate::pool::map_abortable;
use crate::progress::Progress;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Clone, Debug, Default)]
pub struct RestoreOptions {
    /// Worker threads for per-file work: 0 = one per CPU, 1 = sequential.
    pub jobs: usize,
    pub progress: Option<Progress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub output_dir: PathBuf,
    pub files_restored: usize,
    pub bytes_restored: u64,
}

/// Recreate every archived file under `output_dir` and return `output_dir`.
pub fn decompress_archive(archive: &Path, output_dir: &Path) -> Result<PathBuf> {
    decompress_archive_with(archive, output_dir, &RestoreOptions::default()).map(|r| r.output_dir)
}

/// Restore with explicit options.
///
/// Every key is checked for path safety before anything is written. Each file
/// is re-read after writing and must hash to its recorded digest. Files
/// written before a failure stay on disk.
pub fn decompress_archive_with(
    archive: &Path,
    output_dir: &Path,
    opts: &RestoreOptions,
) -> Result<RestoreReport> {
    let manifest = read_archive(archive)?;
    std::fs::create_dir_all(output_dir)
        .io_context(|| format!("create output dir {}", output_dir.display()))?;

    let mut plan: Vec<(&str, PathBuf, &FileRecord)> = Vec::with_capacity(manifest.files.len());
    for (key, record) in &manifest.files {
        plan.push((key.as_str(), resolve_key(output_dir, key)?, record));
    }

    if let Some(p) = &opts.progress {
        p.begin("Restoring", plan.len(), manifest.metadata.total_original_size);
        p.start();
    }
    let restored = map_abortable(opts.jobs, &plan, |(key, dest, record)| {
        let n = restore_file(key, dest, record)?;
        if let Some(p) = &opts.progress {
            p.file_done(n);
        }
        Ok(n)
    });
    if let Some(p) = &opts.progress {
        p.stop();
    }
    let restored = restored?;

    info!(output = %output_dir.display(), files = restored.len(), "decompressed archive");
    Ok(RestoreReport {
        output_dir: output_dir.to_path_buf(),
        files_restored: restored.len(),
        bytes_restored: restored.iter().sum(),
    })
}

/// Decode one record to `dest`, then re-read and check it. Returns bytes written.
fn restore_file(key: &str, dest: &Path, record: &FileRecord) -> Result<u64> {
    let compressed = codec::decode_text(&record.content)
        .map_err(|_| ArchiveError::Decompression(key.to_string()))?;
    let data =
        codec::gunzip(&compressed).map_err(|_| ArchiveError::Decompression(key.to_string()))?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .io_context(|| format!("create dir {}", parent.display()))?;
    }
    std::fs::write(dest, &data).io_context(|| format!("write {}", dest.display()))?;

    let written = std::fs::read(dest).io_context(|| format!("re-read {}", dest.display()))?;
    if codec::sha256_hex(&written) != record.original_hash {
        return Err(ArchiveError::Decompression(key.to_string()));
    }
    debug!(file = key, size = written.len(), "restored");
    Ok(written.len() as u64)
}
