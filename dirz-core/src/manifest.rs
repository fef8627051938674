use crate::codec;
use crate::error::{ArchiveError, IoContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One archived file. Created once per compression pass and never mutated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// base64 over the gzip stream of the original bytes.
    pub content: String,
    pub original_hash: String,
    pub original_size: u64,
    /// Length of the gzip stream before base64.
    pub compressed_size: u64,
}

/// Aggregates over all records; informational only, never used for integrity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub timestamp: String,
    pub file_count: u64,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
}

impl Metadata {
    /// Compressed bytes as a percentage of original bytes, `0.0` for empty input.
    pub fn ratio_pct(&self) -> f64 {
        if self.total_original_size == 0 {
            return 0.0;
        }
        self.total_compressed_size as f64 / self.total_original_size as f64 * 100.0
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    pub metadata: Metadata,
    /// Keyed by forward-slash relative path. Sorted so the JSON is canonical.
    pub files: BTreeMap<String, FileRecord>,
}

impl Manifest {
    /// Build a manifest (and its aggregates) from finished records.
    pub fn from_records(files: BTreeMap<String, FileRecord>, timestamp: String) -> Self {
        let metadata = Metadata {
            timestamp,
            file_count: files.len() as u64,
            total_original_size: files.values().map(|r| r.original_size).sum(),
            total_compressed_size: files.values().map(|r| r.compressed_size).sum(),
        };
        Self { metadata, files }
    }

    /// Serialize to compact JSON and wrap the whole thing in one gzip stream.
    pub fn to_archive_bytes(&self, level: u32) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self).map_err(|source| ArchiveError::Io {
            context: "serialize manifest".into(),
            source: source.into(),
        })?;
        codec::gzip(&json, level).io_context(|| "compress manifest")
    }

    /// Inverse of [`Manifest::to_archive_bytes`]; `origin` only labels errors.
    pub fn from_archive_bytes(bytes: &[u8], origin: &Path) -> Result<Self> {
        let json = codec::gunzip(bytes)
            .io_context(|| format!("decompress archive {}", origin.display()))?;
        serde_json::from_slice(&json)
            .map_err(|source| ArchiveError::Manifest { path: origin.to_path_buf(), source })
    }
}

/// Current UTC time as ISO-8601 with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Read, decompress and parse an archive file.
pub fn read_archive(path: &Path) -> Result<Manifest> {
    if !path.is_file() {
        return Err(ArchiveError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).io_context(|| format!("read archive {}", path.display()))?;
    Manifest::from_archive_bytes(&bytes, path)
}

/// Write `manifest` to `path` at maximum compression, replacing any existing file.
pub fn write_archive(manifest: &Manifest, path: &Path) -> Result<u64> {
    let bytes = manifest.to_archive_bytes(codec::BEST_LEVEL)?;
    std::fs::write(path, &bytes).io_context(|| format!("write archive {}", path.display()))?;
    Ok(bytes.len() as u64)
}
