//! CI housekeeping: normalize line endings via `.gitattributes`, keep
//! generated artifacts out of git, and surface the workflow badge in the
//! README. Every step is a no-op when the tree is already in shape.

use crate::error::Result;
use crate::git;
use crate::io::{ensure_gitignore_entries, read_if_exists, write_if_changed};
use crate::paths::{LOGS_DIR, REPORTS_DIR, TEST_LOGS_DIR};
use std::path::Path;

/// Full `.gitattributes` written when the repo has none.
pub const GITATTRIBUTES_CONTENT: &str = "\
# Normalize line endings
* text=auto eol=lf

# Keep Windows scripts with CRLF
*.bat eol=crlf
*.cmd eol=crlf
*.ps1 eol=crlf
";

/// Lines that must be present in an existing `.gitattributes`.
const GITATTRIBUTES_REQUIRED: &[&str] = &[
    "* text=auto eol=lf",
    "*.bat eol=crlf",
    "*.cmd eol=crlf",
    "*.ps1 eol=crlf",
];

/// Generated-artifact patterns that belong in `.gitignore`.
const GITIGNORE_ENTRIES: &[&str] = &["*.bak.*", REPORTS_DIR, LOGS_DIR, TEST_LOGS_DIR];

#[derive(Debug, Default)]
pub struct CiOptions {
    pub dry_run: bool,
    /// Commit the touched files when true and the worktree is a repo.
    pub commit: bool,
}

/// What `finalize` did (or would do, under `--dry`).
#[derive(Debug, Default)]
pub struct CiReport {
    pub actions: Vec<String>,
    pub changed_paths: Vec<String>,
    pub committed: bool,
}

impl CiReport {
    pub fn changed(&self) -> bool {
        !self.changed_paths.is_empty()
    }

    fn record(&mut self, path: &str, action: impl Into<String>) {
        self.actions.push(action.into());
        self.changed_paths.push(path.to_string());
    }
}

pub fn finalize(root: &Path, opts: &CiOptions) -> Result<CiReport> {
    let mut report = CiReport::default();

    ensure_gitattributes(root, opts.dry_run, &mut report)?;
    ensure_gitignore(root, opts.dry_run, &mut report)?;
    ensure_readme_badge(root, opts.dry_run, &mut report)?;

    if report.changed_paths.is_empty() {
        report.actions.push("already OK".to_string());
    } else if opts.commit && !opts.dry_run && git::is_repo(root) {
        let paths: Vec<&str> = report.changed_paths.iter().map(String::as_str).collect();
        report.committed = git::commit_paths(root, &paths, "chore(ci): normalize line endings and ignore generated artifacts")?;
    }

    Ok(report)
}

fn ensure_gitattributes(root: &Path, dry: bool, report: &mut CiReport) -> Result<()> {
    let path = root.join(".gitattributes");
    match read_if_exists(&path)? {
        None => {
            if !dry {
                write_if_changed(&path, GITATTRIBUTES_CONTENT)?;
            }
            report.record(".gitattributes", "create .gitattributes");
        }
        Some(existing) => {
            let missing: Vec<&str> = GITATTRIBUTES_REQUIRED
                .iter()
                .copied()
                .filter(|line| !existing.lines().any(|l| l.trim() == *line))
                .collect();
            if missing.is_empty() {
                return Ok(());
            }
            if !dry {
                let mut next = existing;
                if !next.is_empty() && !next.ends_with('\n') {
                    next.push('\n');
                }
                for line in &missing {
                    next.push_str(line);
                    next.push('\n');
                }
                write_if_changed(&path, &next)?;
            }
            report.record(
                ".gitattributes",
                format!("append {} line(s) to .gitattributes", missing.len()),
            );
        }
    }
    Ok(())
}

fn ensure_gitignore(root: &Path, dry: bool, report: &mut CiReport) -> Result<()> {
    let existing = read_if_exists(&root.join(".gitignore"))?.unwrap_or_default();
    let missing = GITIGNORE_ENTRIES
        .iter()
        .filter(|e| !existing.lines().any(|l| l == **e))
        .count();
    if missing == 0 {
        return Ok(());
    }
    if !dry {
        ensure_gitignore_entries(root, GITIGNORE_ENTRIES)?;
    }
    report.record(".gitignore", format!("append {missing} .gitignore entries"));
    Ok(())
}

/// Insert a CI badge under the first `#` heading when the repo has a
/// GitHub origin and the README lacks one.
fn ensure_readme_badge(root: &Path, dry: bool, report: &mut CiReport) -> Result<()> {
    let path = root.join("README.md");
    let Some(readme) = read_if_exists(&path)? else {
        return Ok(());
    };
    if readme.contains("/actions/workflows/") {
        return Ok(());
    }
    let Some((owner, repo)) = git::origin_owner_repo(root) else {
        return Ok(());
    };
    let badge = format!(
        "![CI](https://github.com/{owner}/{repo}/actions/workflows/ci.yml/badge.svg)"
    );
    let next = match readme.lines().position(|l| l.starts_with("# ")) {
        Some(idx) => {
            let mut lines: Vec<&str> = readme.lines().collect();
            lines.insert(idx + 1, "");
            lines.insert(idx + 2, &badge);
            let mut joined = lines.join("\n");
            if readme.ends_with('\n') {
                joined.push('\n');
            }
            joined
        }
        None => format!("{badge}\n\n{readme}"),
    };
    if !dry {
        write_if_changed(&path, &next)?;
    }
    report.record("README.md", "insert CI badge into README.md");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn finalize_no_commit(root: &Path, dry: bool) -> CiReport {
        finalize(
            root,
            &CiOptions {
                dry_run: dry,
                commit: false,
            },
        )
        .unwrap()
    }

    #[test]
    fn creates_gitattributes_from_scratch() {
        let dir = TempDir::new().unwrap();
        let report = finalize_no_commit(dir.path(), false);
        assert!(report.changed());
        let content = std::fs::read_to_string(dir.path().join(".gitattributes")).unwrap();
        assert!(content.contains("* text=auto eol=lf"));
        assert!(content.contains("*.ps1 eol=crlf"));
    }

    #[test]
    fn appends_only_missing_lines() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".gitattributes"),
            "* text=auto eol=lf\n*.bat eol=crlf\n",
        )
        .unwrap();
        finalize_no_commit(dir.path(), false);
        let content = std::fs::read_to_string(dir.path().join(".gitattributes")).unwrap();
        assert_eq!(content.matches("* text=auto eol=lf").count(), 1);
        assert!(content.contains("*.cmd eol=crlf"));
        assert!(content.contains("*.ps1 eol=crlf"));
    }

    #[test]
    fn second_run_reports_already_ok() {
        let dir = TempDir::new().unwrap();
        finalize_no_commit(dir.path(), false);
        let report = finalize_no_commit(dir.path(), false);
        assert!(!report.changed());
        assert_eq!(report.actions, ["already OK"]);
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let report = finalize_no_commit(dir.path(), true);
        assert!(report.changed());
        assert!(!dir.path().join(".gitattributes").exists());
        assert!(!dir.path().join(".gitignore").exists());
    }

    #[test]
    fn gitignore_gets_artifact_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "node_modules\n").unwrap();
        finalize_no_commit(dir.path(), false);
        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(content.contains("*.bak.*"));
        assert!(content.contains("tools/reports"));
        assert!(content.starts_with("node_modules\n"));
    }

    #[test]
    fn readme_without_origin_left_alone() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "# CareerOS\n\nHello.\n").unwrap();
        finalize_no_commit(dir.path(), false);
        let content = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(!content.contains("badge.svg"));
    }
}
