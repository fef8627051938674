//! Shared pieces of the `dirz` and `extract-archive` binaries.

pub mod extract;
pub mod logger;
