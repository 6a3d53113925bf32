use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting a target source file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Read a file to string, returning `None` when it does not exist.
pub fn read_if_exists(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

/// Write `content` only when it differs from what is on disk.
/// Returns true if a write happened.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    if let Some(existing) = read_if_exists(path)? {
        if existing == content {
            return Ok(false);
        }
    }
    atomic_write(path, content.as_bytes())?;
    Ok(true)
}

/// Add each of `entries` to `root/.gitignore` if not already present.
/// Returns the number of lines appended.
pub fn ensure_gitignore_entries(root: &Path, entries: &[&str]) -> Result<usize> {
    let gitignore = root.join(".gitignore");
    let existing = read_if_exists(&gitignore)?.unwrap_or_default();
    // Exact line match — avoids false positives from substring checks.
    let missing: Vec<&str> = entries
        .iter()
        .copied()
        .filter(|e| !existing.lines().any(|l| l == *e))
        .collect();
    if missing.is_empty() {
        return Ok(0);
    }
    let mut next = existing.clone();
    if !next.is_empty() && !next.ends_with('\n') {
        next.push('\n');
    }
    for entry in &missing {
        next.push_str(entry);
        next.push('\n');
    }
    atomic_write(&gitignore, next.as_bytes())?;
    Ok(missing.len())
}
