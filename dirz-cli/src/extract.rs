use anyhow::{Context, Result};
use dirz_core::{decompress_archive_with, RestoreOptions, RestoreReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where an archive lands when no output directory is given.
pub fn default_output_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir().context("current dir")?.join("extracted"))
}

/// `N bytes` below 1 KiB, `X.XX KB` from there on.
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    }
}

/// Top-level entries of `dir` with their sizes, sorted by name.
pub fn top_level_entries(dir: &Path) -> Result<Vec<(String, u64)>> {
    let mut out = vec![];
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let md = fs::metadata(entry.path())
            .with_context(|| format!("stat {}", entry.path().display()))?;
        out.push((entry.file_name().to_string_lossy().into_owned(), md.len()));
    }
    out.sort();
    Ok(out)
}

/// Restore `archive` and print what ended up in the output directory.
pub fn run_extract(archive: &Path, output: Option<PathBuf>, opts: &RestoreOptions) -> Result<RestoreReport> {
    let output = match output {
        Some(o) => o,
        None => default_output_dir()?,
    };
    info!(archive = %archive.display(), output = %output.display(), "extracting archive");

    let report = decompress_archive_with(archive, &output, opts)
        .with_context(|| format!("extract {}", archive.display()))?;
    info!(
        output = %report.output_dir.display(),
        files = report.files_restored,
        bytes = report.bytes_restored,
        "extraction complete"
    );

    for (name, size) in top_level_entries(&report.output_dir)? {
        println!("{name}\t{}", human_size(size));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_switch_to_kb_at_1024() {
        assert_eq!(human_size(0), "0 bytes");
        assert_eq!(human_size(1023), "1023 bytes");
        assert_eq!(human_size(1024), "1.00 KB");
        assert_eq!(human_size(1536), "1.50 KB");
    }

    #[test]
    fn entries_are_sorted_and_shallow() {
        let td = tempfile::tempdir().unwrap();
        fs::write(td.path().join("b.txt"), "bb").unwrap();
        fs::create_dir(td.path().join("a")).unwrap();
        fs::write(td.path().join("a/inner.txt"), "x").unwrap();
        let names: Vec<_> = top_level_entries(td.path()).unwrap().into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec!["a", "b.txt"]);
    }
}
