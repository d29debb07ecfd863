//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Write a string to a file through a temporary sibling, then rename.
///
/// The final path either holds the complete contents or is untouched;
/// readers never observe a partially written file.
pub fn write_string_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path has no parent: {}", path.display()))?;
    ensure_dir(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;

    io::Write::write_all(&mut tmp, contents.as_bytes())
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;

    tmp.persist(path)
        .with_context(|| format!("failed to move temp file into place: {}", path.display()))?;
    Ok(())
}

/// Create a symlink (platform-aware).
#[cfg(unix)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_string_atomic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sub").join("file.txt");

        write_string_atomic(&path, "content").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "content");

        // Overwrite replaces wholesale
        write_string_atomic(&path, "other").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "other");
    }

    #[test]
    fn test_ensure_dir_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a/b/c");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
