//! Self-verifying directory archives.
//!
//! A directory tree is serialized into one gzip file holding a JSON manifest;
//! each file inside is individually gzip+base64 encoded and carries its
//! SHA-256. Compression verifies the written archive before returning, and
//! restoration re-hashes every file it writes.

pub mod codec;
pub mod compress;
pub mod error;
pub mod manifest;
pub mod path_safety;
mod pool;
pub mod progress;
pub mod report;
pub mod restore;
pub mod verify;
pub mod walk;

pub use compress::{compress_directory, compress_directory_with, CompressOptions, CompressedArchive};
pub use error::{ArchiveError, Result};
pub use manifest::{read_archive, write_archive, FileRecord, Manifest, Metadata};
pub use restore::{decompress_archive, decompress_archive_with, RestoreOptions, RestoreReport};
pub use verify::{verify_against_source, verify_archive, VerifyReport};
