//! Thin wrappers over the `git` CLI.
//!
//! Mutating subcommands require a clean worktree before touching files, so
//! git history is the real undo path and the sibling backups are belt and
//! braces for partially-applied runs.

use crate::error::{RepofixError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

fn git_output(root: &Path, args: &[&str]) -> Result<Option<String>> {
    let out = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|e| RepofixError::SpawnFailed {
            command: format!("git {}", args.join(" ")),
            source: e,
        })?;
    if !out.status.success() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&out.stdout).into_owned()))
}

/// True when `root` is inside a git worktree.
pub fn is_repo(root: &Path) -> bool {
    matches!(
        git_output(root, &["rev-parse", "--is-inside-work-tree"]),
        Ok(Some(s)) if s.trim() == "true"
    )
}

/// Error unless `git status --porcelain` is empty (or `force` is set).
pub fn ensure_clean(root: &Path, force: bool) -> Result<()> {
    if force {
        return Ok(());
    }
    if !is_repo(root) {
        return Err(RepofixError::NotARepo(root.to_path_buf()));
    }
    let status = git_output(root, &["status", "--porcelain"])?
        .ok_or_else(|| RepofixError::NotARepo(root.to_path_buf()))?;
    if status.trim().is_empty() {
        Ok(())
    } else {
        Err(RepofixError::DirtyWorktree)
    }
}

/// Absolute paths of files changed since `ref_name`, or `None` when git
/// can't answer (not a repo, unknown ref) — callers then scan everything.
pub fn changed_since(root: &Path, ref_name: &str) -> Option<HashSet<PathBuf>> {
    let out = git_output(root, &["diff", "--name-only", ref_name]).ok()??;
    Some(
        out.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| root.join(l.trim()))
            .collect(),
    )
}

/// Stage and commit `paths` with `message`. Best-effort: returns false when
/// the commit did not happen (nothing staged, git unavailable).
pub fn commit_paths(root: &Path, paths: &[&str], message: &str) -> Result<bool> {
    let mut add = vec!["add", "--"];
    add.extend(paths);
    if git_output(root, &add)?.is_none() {
        return Ok(false);
    }
    let committed = git_output(root, &["commit", "-m", message])?.is_some();
    Ok(committed)
}

/// Parse `remote.origin.url` into (owner, repo). Handles both
/// `https://github.com/owner/repo.git` and `git@github.com:owner/repo.git`.
pub fn origin_owner_repo(root: &Path) -> Option<(String, String)> {
    let url = git_output(root, &["config", "--get", "remote.origin.url"]).ok()??;
    parse_github_url(url.trim())
}

fn parse_github_url(url: &str) -> Option<(String, String)> {
    let re = github_url_re();
    let caps = re.captures(url)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

fn github_url_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"(?i)github\.com[/:]([^/]+)/([^/.]+)(?:\.git)?$").unwrap()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo(dir: &Path) {
        let run = |args: &[&str]| {
            assert!(Command::new("git")
                .args(args)
                .current_dir(dir)
                .output()
                .unwrap()
                .status
                .success());
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@test"]);
        run(&["config", "user.name", "test"]);
    }

    #[test]
    fn parse_https_url() {
        assert_eq!(
            parse_github_url("https://github.com/honorablepanda/careeros.git"),
            Some(("honorablepanda".into(), "careeros".into()))
        );
    }

    #[test]
    fn parse_ssh_url() {
        assert_eq!(
            parse_github_url("git@github.com:owner/repo.git"),
            Some(("owner".into(), "repo".into()))
        );
    }

    #[test]
    fn parse_rejects_non_github() {
        assert!(parse_github_url("https://gitlab.com/owner/repo.git").is_none());
    }

    #[test]
    fn is_repo_distinguishes_worktrees() {
        let dir = TempDir::new().unwrap();
        assert!(!is_repo(dir.path()));
        init_repo(dir.path());
        assert!(is_repo(dir.path()));
    }

    #[test]
    fn ensure_clean_rejects_non_repo() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ensure_clean(dir.path(), false),
            Err(RepofixError::NotARepo(_))
        ));
    }

    #[test]
    fn ensure_clean_force_bypasses() {
        let dir = TempDir::new().unwrap();
        ensure_clean(dir.path(), true).unwrap();
    }

    #[test]
    fn ensure_clean_detects_dirty_tree() {
        let dir = TempDir::new().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("untracked.ts"), "x").unwrap();
        assert!(matches!(
            ensure_clean(dir.path(), false),
            Err(RepofixError::DirtyWorktree)
        ));
    }
}
