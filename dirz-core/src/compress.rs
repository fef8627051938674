use crate::codec;
use crate::error::{ArchiveError, IoContext, Result};
use crate::manifest::{now_iso8601, FileRecord, Manifest, Metadata};
use crate::pool::map_abortable;
use crate::progress::Progress;
use crate::verify::verify_archive;
use crate::walk::{absolute_root, list_files, relative_key};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct CompressOptions {
    /// DEFLATE level 0..=9 for file payloads and the outer wrapper.
    pub level: u32,
    /// Worker threads for per-file work: 0 = one per CPU, 1 = sequential.
    pub jobs: usize,
    pub progress: Option<Progress>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self { level: codec::BEST_LEVEL, jobs: 0, progress: None }
    }
}

#[derive(Clone, Debug)]
pub struct CompressedArchive {
    pub path: PathBuf,
    pub metadata: Metadata,
    /// Size of the archive file on disk.
    pub archive_size: u64,
}

/// Compress `source_dir` into a verified archive under `output_dir` and return its path.
pub fn compress_directory(source_dir: &Path, output_dir: &Path) -> Result<PathBuf> {
    compress_directory_with(source_dir, output_dir, &CompressOptions::default()).map(|a| a.path)
}

pub fn compress_directory_with(
    source_dir: &Path,
    output_dir: &Path,
    opts: &CompressOptions,
) -> Result<CompressedArchive> {
    let root = absolute_root(source_dir)?;
    let files = list_files(&root)?;
    info!(count = files.len(), root = %root.display(), "found files");

    if let Some(p) = &opts.progress {
        let bytes = files.iter().filter_map(|f| f.metadata().ok()).map(|m| m.len()).sum();
        p.begin("Compressing", files.len(), bytes);
        p.start();
    }
    let compressed = map_abortable(opts.jobs, &files, |path| {
        let key = relative_key(&root, path)?;
        let record = compress_file(path, opts.level)?;
        debug!(file = %key, size = record.original_size, "compressed");
        if let Some(p) = &opts.progress {
            p.file_done(record.original_size);
        }
        Ok((key, record))
    });
    if let Some(p) = &opts.progress {
        p.stop();
    }

    let mut records = BTreeMap::new();
    for (key, record) in compressed? {
        if records.insert(key.clone(), record).is_some() {
            return Err(ArchiveError::Validation(PathBuf::from(key)));
        }
    }
    let manifest = Manifest::from_records(records, now_iso8601());
    let bytes = manifest.to_archive_bytes(opts.level)?;

    std::fs::create_dir_all(output_dir)
        .io_context(|| format!("create output dir {}", output_dir.display()))?;
    let (mut file, path) = create_archive_file(output_dir, &base_name(&root))?;
    file.write_all(&bytes)
        .and_then(|_| file.sync_all())
        .io_context(|| format!("write archive {}", path.display()))?;
    drop(file);

    let meta = &manifest.metadata;
    info!(
        archive = %path.display(),
        original = meta.total_original_size,
        compressed = meta.total_compressed_size,
        "compressed directory ({:.2}%)",
        meta.ratio_pct()
    );

    finish_archive(&path, &files, &root)?;
    Ok(CompressedArchive { path, metadata: manifest.metadata, archive_size: bytes.len() as u64 })
}

/// Verify a freshly written archive; on failure remove it so no archive is
/// left that claims a successful compression.
fn finish_archive(path: &Path, files: &[PathBuf], root: &Path) -> Result<()> {
    let Err(e) = verify_archive(path, files, root) else {
        return Ok(());
    };
    warn!(archive = %path.display(), error = %e, "verification failed, removing archive");
    if let Err(rm) = std::fs::remove_file(path) {
        warn!(archive = %path.display(), error = %rm, "could not remove unverified archive");
    }
    Err(e)
}

/// Read one file and turn it into a record whose payload is proven to round-trip.
pub fn compress_file(path: &Path, level: u32) -> Result<FileRecord> {
    let data = std::fs::read(path).io_context(|| format!("read {}", path.display()))?;
    let original_hash = codec::sha256_hex(&data);
    let compressed =
        codec::gzip(&data, level).io_context(|| format!("compress {}", path.display()))?;
    let record = FileRecord {
        content: codec::encode_text(&compressed),
        original_hash,
        original_size: data.len() as u64,
        compressed_size: compressed.len() as u64,
    };
    check_round_trip(path, &record)?;
    Ok(record)
}

/// Decode the stored payload again and compare its digest with `original_hash`.
fn check_round_trip(path: &Path, record: &FileRecord) -> Result<()> {
    let restored = codec::decode_text(&record.content)
        .ok()
        .and_then(|z| codec::gunzip(&z).ok())
        .ok_or_else(|| ArchiveError::Validation(path.to_path_buf()))?;
    if codec::sha256_hex(&restored) != record.original_hash {
        return Err(ArchiveError::Validation(path.to_path_buf()));
    }
    Ok(())
}

fn base_name(root: &Path) -> String {
    root.file_name()
        .map(|s| s.to_owned())
        .or_else(|| std::fs::canonicalize(root).ok()?.file_name().map(|s| s.to_owned()))
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string())
}

/// Open `<dir>/<base>_compressed_<millis>.gz` exclusively, bumping the
/// millisecond stamp while the name is taken.
fn create_archive_file(dir: &Path, base: &str) -> Result<(File, PathBuf)> {
    let mut millis = chrono::Utc::now().timestamp_millis();
    loop {
        let path = dir.join(format!("{base}_compressed_{millis}.gz"));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => return Ok((f, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
            Err(e) => {
                return Err(ArchiveError::Io {
                    context: format!("create archive {}", path.display()),
                    source: e,
                })
            }
        }
    }
}
