//! Error taxonomy for archive operations.
//!
//! Every variant aborts the enclosing compress or restore call; nothing is
//! retried and nothing already written is rolled back.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Source directory or archive file does not exist.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no files found in {}", .0.display())]
    EmptyDirectory(PathBuf),

    /// Per-file round trip produced different bytes than were read.
    #[error("compression validation failed for {}: hash mismatch", .0.display())]
    Validation(PathBuf),

    #[error("file count mismatch: archive has {archived} files, source had {expected} files")]
    CountMismatch { archived: usize, expected: usize },

    #[error("file {0} not found in archive")]
    MissingFile(String),

    /// Live source file no longer hashes to the recorded digest.
    #[error("hash mismatch for {0}")]
    Integrity(String),

    /// Stored payload is not base64, not gzip, or not the recorded bytes.
    #[error("decompression validation failed for {0}")]
    Decompression(String),

    #[error("unsafe path in archive: {0}")]
    UnsafePath(String),

    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("malformed manifest in {}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Attach a context line (path + phase) to a raw I/O failure.
pub(crate) trait IoContext<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| ArchiveError::Io { context: f().into(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_context_keeps_source() {
        let r: io::Result<()> = Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        let err = r.io_context(|| "read /tmp/x").unwrap_err();
        assert_eq!(err.to_string(), "read /tmp/x");
        assert_eq!(err.source().unwrap().to_string(), "disk on fire");
    }

    #[test]
    fn count_mismatch_message_names_both_sides() {
        let err = ArchiveError::CountMismatch { archived: 2, expected: 3 };
        assert_eq!(
            err.to_string(),
            "file count mismatch: archive has 2 files, source had 3 files"
        );
    }
}
