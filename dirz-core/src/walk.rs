use crate::error::{ArchiveError, IoContext, Result};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Make `root` absolute against the current directory without resolving symlinks.
pub fn absolute_root(root: &Path) -> Result<PathBuf> {
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    let cwd = std::env::current_dir().io_context(|| "resolve current directory")?;
    Ok(cwd.join(root))
}

/// Every regular file under `root`, at any depth, in file-name order per directory.
///
/// Directories are descended but not emitted; symlinks are neither followed nor
/// emitted. A missing root is `NotFound`, a root without files is `EmptyDirectory`.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ArchiveError::NotFound(root.to_path_buf()));
    }
    let mut files = Vec::new();
    for ent in WalkDir::new(root).min_depth(1).follow_links(false).sort_by_file_name() {
        let ent = ent.map_err(|e| {
            let at = e.path().unwrap_or(root).display().to_string();
            ArchiveError::Io { context: format!("walk {at}"), source: e.into() }
        })?;
        if ent.file_type().is_file() {
            files.push(ent.into_path());
        }
    }
    if files.is_empty() {
        return Err(ArchiveError::EmptyDirectory(root.to_path_buf()));
    }
    Ok(files)
}

/// Manifest key for `path`: `root` stripped, remaining components joined by `/`.
///
/// This is the one rule shared by the assembler and the verifier, so a key
/// computed at compression time is reproducible at verification time.
pub fn relative_key(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| {
        ArchiveError::Io {
            context: format!("{} is not under {}", path.display(), root.display()),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "outside source root"),
        }
    })?;
    let mut parts = Vec::new();
    for comp in rel.components() {
        match comp {
            Component::Normal(s) => {
                let s = s.to_str().ok_or_else(|| ArchiveError::NonUtf8Path(path.to_path_buf()))?;
                parts.push(s);
            }
            Component::CurDir => {}
            _ => return Err(ArchiveError::UnsafePath(rel.display().to_string())),
        }
    }
    Ok(parts.join("/"))
}
