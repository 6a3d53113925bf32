//! The idempotent mutator: apply a [`Patch`] to a file at most once.
//!
//! Every mutation follows the same contract: check an "already applied"
//! predicate first; if it holds, no-op. Otherwise attempt the rewrite —
//! an unmatched pattern is a logged no-op, never an error. A timestamped
//! backup of the pre-edit bytes is written before any overwrite.

use crate::backup;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One idempotent source transformation.
pub trait Patch {
    /// Short identifier used in log lines and reports.
    fn name(&self) -> &str;

    /// True when the transformation is already present in `content`.
    fn is_applied(&self, content: &str) -> bool;

    /// Produce the rewritten content, or `None` when no confident match
    /// was found (the file is left untouched in that case).
    fn apply(&self, content: &str) -> Option<String>;
}

/// Result of applying a patch to one file.
#[derive(Debug)]
pub enum Outcome {
    /// Target file does not exist; caller warns and skips.
    FileMissing,
    /// The applied-check held; nothing written.
    AlreadyApplied,
    /// Rewritten and persisted; the pre-edit bytes live at `backup`.
    Patched { backup: PathBuf },
    /// Dry-run: the rewrite matched, `preview` is what would be written.
    WouldPatch { preview: String },
    /// Pattern did not match — "could not confidently patch".
    NoConfidentMatch,
}

impl Outcome {
    pub fn changed(&self) -> bool {
        matches!(self, Outcome::Patched { .. } | Outcome::WouldPatch { .. })
    }
}

/// Apply `patch` to the file at `path`.
///
/// With `dry` set no filesystem write occurs; the preview in the returned
/// outcome is byte-identical to what apply mode would persist.
pub fn apply_to_file(path: &Path, patch: &dyn Patch, dry: bool) -> Result<Outcome> {
    if !path.is_file() {
        return Ok(Outcome::FileMissing);
    }
    let content = std::fs::read_to_string(path)?;
    if patch.is_applied(&content) {
        debug!(patch = patch.name(), "already applied");
        return Ok(Outcome::AlreadyApplied);
    }
    let Some(next) = patch.apply(&content) else {
        debug!(patch = patch.name(), "no confident match");
        return Ok(Outcome::NoConfidentMatch);
    };
    if next == content {
        return Ok(Outcome::AlreadyApplied);
    }
    if dry {
        return Ok(Outcome::WouldPatch { preview: next });
    }
    let bak = backup::write_backup(path)?;
    crate::io::atomic_write(path, next.as_bytes())?;
    Ok(Outcome::Patched { backup: bak })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct AppendMarker;

    impl Patch for AppendMarker {
        fn name(&self) -> &str {
            "append-marker"
        }
        fn is_applied(&self, content: &str) -> bool {
            content.contains("// marker")
        }
        fn apply(&self, content: &str) -> Option<String> {
            if !content.contains("target") {
                return None;
            }
            Some(format!("{content}// marker\n"))
        }
    }

    #[test]
    fn patch_then_noop_on_second_run() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.ts");
        std::fs::write(&file, "target\n").unwrap();

        let first = apply_to_file(&file, &AppendMarker, false).unwrap();
        assert!(matches!(first, Outcome::Patched { .. }));
        let second = apply_to_file(&file, &AppendMarker, false).unwrap();
        assert!(matches!(second, Outcome::AlreadyApplied));
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "target\n// marker\n"
        );
    }

    #[test]
    fn backup_holds_pre_edit_bytes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.ts");
        std::fs::write(&file, "target\n").unwrap();

        let Outcome::Patched { backup } = apply_to_file(&file, &AppendMarker, false).unwrap()
        else {
            panic!("expected Patched");
        };
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "target\n");
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.ts");
        std::fs::write(&file, "target\n").unwrap();

        let out = apply_to_file(&file, &AppendMarker, true).unwrap();
        let Outcome::WouldPatch { preview } = out else {
            panic!("expected WouldPatch");
        };
        assert_eq!(preview, "target\n// marker\n");
        // No write, no backup
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "target\n");
        assert!(backup::list_backups(&file).unwrap().is_empty());
    }

    #[test]
    fn dry_preview_matches_apply_result() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.ts");
        std::fs::write(&file, "target\n").unwrap();

        let Outcome::WouldPatch { preview } = apply_to_file(&file, &AppendMarker, true).unwrap()
        else {
            panic!("expected WouldPatch");
        };
        apply_to_file(&file, &AppendMarker, false).unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), preview);
    }

    #[test]
    fn unmatched_content_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.ts");
        std::fs::write(&file, "unrelated\n").unwrap();

        let out = apply_to_file(&file, &AppendMarker, false).unwrap();
        assert!(matches!(out, Outcome::NoConfidentMatch));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "unrelated\n");
    }

    #[test]
    fn missing_file_is_an_outcome_not_an_error() {
        let dir = TempDir::new().unwrap();
        let out = apply_to_file(&dir.path().join("absent.ts"), &AppendMarker, false).unwrap();
        assert!(matches!(out, Outcome::FileMissing));
    }
}
