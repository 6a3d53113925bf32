//! Timestamped sibling backups written before any in-place mutation.
//!
//! Backups are never pruned automatically; `ci finalize` adds the
//! `*.bak.*` pattern to the target repo's `.gitignore` instead.

use crate::error::Result;
use crate::paths::file_stamp;
use std::path::{Path, PathBuf};

/// Path of the backup that would be written for `path` at `now`.
pub fn backup_path(path: &Path, now: chrono::DateTime<chrono::Utc>) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".bak.");
    name.push_str(&file_stamp(now));
    path.with_file_name(name)
}

/// Copy the current bytes of `path` to a timestamped sibling.
/// Returns the backup path.
pub fn write_backup(path: &Path) -> Result<PathBuf> {
    let dest = backup_path(path, chrono::Utc::now());
    std::fs::copy(path, &dest)?;
    Ok(dest)
}

/// All backups previously written for `path`, oldest first.
pub fn list_backups(path: &Path) -> Result<Vec<PathBuf>> {
    let Some(parent) = path.parent() else {
        return Ok(Vec::new());
    };
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let prefix = format!("{name}.bak.");
    let mut out = Vec::new();
    if !parent.exists() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(parent)? {
        let entry = entry?;
        let fname = entry.file_name();
        if fname.to_string_lossy().starts_with(&prefix) {
            out.push(entry.path());
        }
    }
    // Stamps are lexically ordered (RFC 3339 with punctuation dashed).
    out.sort();
    Ok(out)
}

/// Restore `path` from its most recent backup, if one exists.
/// Returns the backup used, or `None` when there is nothing to restore.
pub fn restore_latest(path: &Path) -> Result<Option<PathBuf>> {
    let backups = list_backups(path)?;
    let Some(latest) = backups.last() else {
        return Ok(None);
    };
    std::fs::copy(latest, path)?;
    Ok(Some(latest.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn backup_preserves_exact_bytes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("router.ts");
        std::fs::write(&file, "export const appRouter = {};\n").unwrap();
        let bak = write_backup(&file).unwrap();
        assert_eq!(
            std::fs::read(&bak).unwrap(),
            std::fs::read(&file).unwrap()
        );
        assert!(bak.file_name().unwrap().to_str().unwrap().starts_with("router.ts.bak."));
    }

    #[test]
    fn restore_uses_most_recent() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        std::fs::write(&file, "v1").unwrap();
        let old = backup_path(&file, chrono::Utc::now() - chrono::Duration::seconds(5));
        std::fs::write(&old, "v1").unwrap();
        std::fs::write(&file, "v2").unwrap();
        write_backup(&file).unwrap();
        std::fs::write(&file, "mangled").unwrap();

        let used = restore_latest(&file).unwrap().unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "v2");
        assert_ne!(used, old);
    }

    #[test]
    fn restore_without_backup_is_none() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        std::fs::write(&file, "v1").unwrap();
        assert!(restore_latest(&file).unwrap().is_none());
    }

    #[test]
    fn list_backups_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        std::fs::write(&file, "v1").unwrap();
        std::fs::write(dir.path().join("b.ts.bak.x"), "other").unwrap();
        write_backup(&file).unwrap();
        assert_eq!(list_backups(&file).unwrap().len(), 1);
    }
}
