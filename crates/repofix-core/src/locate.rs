//! Heuristic file location.
//!
//! Target artifacts (the tRPC root router, the summary router, vitest
//! configs) move around between branches of the CareerOS monorepo, so
//! every caller goes through a prioritized candidate list first and only
//! then falls back to a directory walk.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Return the first of `candidates` (relative to `root`) that exists.
pub fn first_existing(root: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|c| root.join(c))
        .find(|p| p.is_file())
}

/// Recursively collect files under `root`, skipping `ignore_dirs` by name
/// and keeping only paths for which `keep` returns true.
///
/// Unreadable directories are skipped rather than failing the whole walk.
pub fn walk_files<F>(root: &Path, ignore_dirs: &[&str], keep: &F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let mut out = Vec::new();
    walk_into(root, ignore_dirs, keep, &mut out);
    out.sort();
    out
}

fn walk_into<F>(dir: &Path, ignore_dirs: &[&str], keep: &F, out: &mut Vec<PathBuf>)
where
    F: Fn(&Path) -> bool,
{
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_dir() {
            if ignore_dirs.contains(&name.as_ref()) {
                continue;
            }
            walk_into(&path, ignore_dirs, keep, out);
        } else if keep(&path) {
            out.push(path);
        }
    }
}

/// True for `.ts`, `.tsx`, `.js`, `.jsx`, `.mjs`, `.cjs`.
pub fn is_source_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs")
    )
}

/// True for `*.spec.*` / `*.test.*` source files.
pub fn is_spec_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    is_source_file(path)
        && (name.contains(".spec.") || name.contains(".test."))
}

/// Locate a file by candidate paths, then by walking with a filename predicate.
pub fn find_by_name<F>(
    root: &Path,
    candidates: &[&str],
    ignore_dirs: &[&str],
    name_matches: F,
) -> Option<PathBuf>
where
    F: Fn(&str) -> bool,
{
    if let Some(found) = first_existing(root, candidates) {
        return Some(found);
    }
    walk_files(root, ignore_dirs, &|p: &Path| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| name_matches(n))
    })
    .into_iter()
    .next()
}

/// A walk hit scored by content/path heuristics. Higher is better.
#[derive(Debug, Clone)]
pub struct ScoredFile {
    pub path: PathBuf,
    pub content: String,
    pub score: i32,
}

/// Walk source files and score each with `score_fn` (content is read once).
/// Files scoring zero or less are dropped; the rest come back best-first.
pub fn scored_search<F>(root: &Path, ignore_dirs: &[&str], score_fn: F) -> Result<Vec<ScoredFile>>
where
    F: Fn(&Path, &str) -> i32,
{
    let files = walk_files(root, ignore_dirs, &is_source_file);
    let mut hits = Vec::new();
    for path in files {
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        let score = score_fn(&path, &content);
        if score > 0 {
            hits.push(ScoredFile {
                path,
                content,
                score,
            });
        }
    }
    hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.path.cmp(&b.path)));
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::IGNORE_DIRS;
    use tempfile::TempDir;

    #[test]
    fn first_existing_respects_priority() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/second.ts"), "").unwrap();
        let found = first_existing(dir.path(), &["src/first.ts", "src/second.ts"]).unwrap();
        assert!(found.ends_with("src/second.ts"));
    }

    #[test]
    fn first_existing_none_when_absent() {
        let dir = TempDir::new().unwrap();
        assert!(first_existing(dir.path(), &["a.ts", "b.ts"]).is_none());
    }

    #[test]
    fn falls_back_to_secondary_candidate() {
        // Primary candidate absent, secondary present — locator must return
        // the secondary path rather than reporting "not found".
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("apps/api/src")).unwrap();
        std::fs::write(dir.path().join("apps/api/src/root.ts"), "").unwrap();
        let found = first_existing(
            dir.path(),
            &["apps/api/src/trpc/root.ts", "apps/api/src/root.ts"],
        );
        assert!(found.unwrap().ends_with("apps/api/src/root.ts"));
    }

    #[test]
    fn walk_skips_ignored_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.ts"), "").unwrap();
        std::fs::write(dir.path().join("src/app.ts"), "").unwrap();
        let files = walk_files(dir.path(), IGNORE_DIRS, &is_source_file);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/app.ts"));
    }

    #[test]
    fn find_by_name_walk_fallback() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("deep/nested")).unwrap();
        std::fs::write(dir.path().join("deep/nested/tracker.router.ts"), "").unwrap();
        let found = find_by_name(dir.path(), &["apps/api/tracker.router.ts"], IGNORE_DIRS, |n| {
            n.starts_with("tracker.router.")
        });
        assert!(found.unwrap().ends_with("tracker.router.ts"));
    }

    #[test]
    fn spec_file_detection() {
        assert!(is_spec_file(Path::new("web/src/page.spec.tsx")));
        assert!(is_spec_file(Path::new("web/src/page.test.ts")));
        assert!(!is_spec_file(Path::new("web/src/page.tsx")));
        assert!(!is_spec_file(Path::new("web/src/page.spec.md")));
    }

    #[test]
    fn scored_search_orders_best_first() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/trpc")).unwrap();
        std::fs::write(dir.path().join("src/other.ts"), "const x = 1;").unwrap();
        std::fs::write(
            dir.path().join("src/trpc/root.ts"),
            "export const appRouter = t.router({});",
        )
        .unwrap();
        let hits = scored_search(dir.path(), IGNORE_DIRS, |path, content| {
            let mut score = 0;
            if path.to_string_lossy().contains("/trpc/") {
                score += 30;
            }
            if content.contains("appRouter") {
                score += 20;
            }
            score
        })
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].path.ends_with("src/trpc/root.ts"));
        assert_eq!(hits[0].score, 50);
    }
}
