use crate::error::{ArchiveError, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve a manifest key to a destination under `root`, refusing anything that
/// could land outside it.
///
/// Rejected: empty keys, empty or `.`/`..` segments, absolute or prefixed paths,
/// and any existing ancestor (or the target itself) that is a symlink.
pub fn resolve_key(root: &Path, key: &str) -> Result<PathBuf> {
    let unsafe_key = || ArchiveError::UnsafePath(key.to_string());
    if key.is_empty() {
        return Err(unsafe_key());
    }
    let mut rel = PathBuf::new();
    for seg in key.split('/') {
        if seg.is_empty() || seg == "." || seg == ".." {
            return Err(unsafe_key());
        }
        rel.push(seg);
    }
    // Catches platform prefixes and separators hidden inside a segment.
    if rel.is_absolute() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(unsafe_key());
    }
    if rel.components().count() != key.split('/').count() {
        return Err(unsafe_key());
    }

    let mut cur = root.to_path_buf();
    for comp in rel.components() {
        cur.push(comp);
        if let Ok(m) = std::fs::symlink_metadata(&cur) {
            if m.file_type().is_symlink() {
                return Err(ArchiveError::UnsafePath(format!(
                    "{key} (symlink at {})",
                    cur.display()
                )));
            }
        }
    }
    Ok(cur)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_nested_key_resolves_under_root() {
        let td = tempfile::tempdir().unwrap();
        let p = resolve_key(td.path(), "sub/dir/file.txt").unwrap();
        assert_eq!(p, td.path().join("sub").join("dir").join("file.txt"));
    }

    #[test]
    fn traversal_and_absolute_are_rejected() {
        let root = Path::new("/out");
        for bad in ["", "../x", "a/../../x", "/etc/passwd", "a//b", "./a", "a/."] {
            assert!(
                matches!(resolve_key(root, bad), Err(ArchiveError::UnsafePath(_))),
                "accepted {bad:?}"
            );
        }
    }
}
