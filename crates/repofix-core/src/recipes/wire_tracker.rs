//! Wire `trackerRouter` into the tRPC root router, even when `appRouter`
//! is aliased or re-exported.
//!
//! The root router is found by scoring every source file: living under a
//! `trpc/` directory, being named `root.*`/`router.*`, declaring
//! `export type AppRouter = typeof X`, and exporting `const appRouter`
//! each add weight. The best-scoring candidate gets the import and the
//! `tracker:` key; `--all` patches every candidate.

use crate::error::Result;
use crate::locate::{find_by_name, scored_search, ScoredFile};
use crate::mutate::Patch;
use crate::paths::TRACKER_ROUTER;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn app_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"export\s+type\s+AppRouter\s*=\s*typeof\s+([A-Za-z0-9_]+)\s*;").unwrap()
    })
}

fn router_factory_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(createTRPCRouter|t\.router|mergeRouters|t\.mergeRouters)\s*\(").unwrap()
    })
}

fn app_router_export_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"export\s+(const|let|var)\s+appRouter\s*=").unwrap())
}

fn tracker_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^tracker\.router\.(t|j)sx?$").unwrap())
}

fn root_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(root|router)\.(t|j)sx?$").unwrap())
}

/// Locate `tracker.router.*` by candidate path, then by walk.
pub fn find_tracker_router(root: &Path, ignore_dirs: &[&str]) -> Option<PathBuf> {
    find_by_name(root, &[TRACKER_ROUTER], ignore_dirs, |name| {
        tracker_filename_re().is_match(name)
    })
}

/// Root-router candidates, best first.
pub fn find_root_candidates(root: &Path, ignore_dirs: &[&str]) -> Result<Vec<ScoredFile>> {
    scored_search(root, ignore_dirs, |path, content| {
        let has_type = app_type_re().is_match(content);
        if !has_type && !router_factory_re().is_match(content) {
            return 0;
        }
        let mut score = 0;
        let display = path.to_string_lossy().replace('\\', "/");
        if display.to_lowercase().contains("/trpc/") {
            score += 30;
        }
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| root_filename_re().is_match(n))
        {
            score += 20;
        }
        if has_type {
            score += 30;
        }
        if app_router_export_re().is_match(content) {
            score += 20;
        }
        score
    })
}

/// Relative import specifier from the directory of `from_file` to
/// `to_file`, with the source extension stripped.
pub fn relative_import(from_file: &Path, to_file: &Path) -> String {
    let from_dir: Vec<_> = from_file.parent().map(|p| p.components().collect()).unwrap_or_default();
    let to: Vec<_> = to_file.components().collect();

    let common = from_dir
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
    for comp in &to[common..] {
        parts.push(comp.as_os_str().to_string_lossy().into_owned());
    }
    let mut joined = parts.join("/");
    // Strip the source-file extension
    for ext in [".tsx", ".jsx", ".ts", ".js"] {
        if let Some(stripped) = joined.strip_suffix(ext) {
            joined = stripped.to_string();
            break;
        }
    }
    if !joined.starts_with('.') {
        joined = format!("./{joined}");
    }
    joined
}

/// The idempotent root-router edit: import + `tracker:` key.
pub struct WireTracker {
    /// Import specifier for the tracker router, e.g. `./routers/tracker.router`.
    pub import_path: String,
}

fn import_tracker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"import\s*\{[^}]*\btrackerRouter\b[^}]*\}\s*from\s*['"][^'"]*tracker\.router"#)
            .unwrap()
    })
}

fn tracker_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\btracker\s*:\s*trackerRouter\b").unwrap())
}

fn router_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(createTRPCRouter|t\.router|router)\s*\(\s*\{").unwrap()
    })
}

impl Patch for WireTracker {
    fn name(&self) -> &str {
        "wire-tracker-router"
    }

    fn is_applied(&self, content: &str) -> bool {
        import_tracker_re().is_match(content) && tracker_key_re().is_match(content)
    }

    fn apply(&self, content: &str) -> Option<String> {
        let mut next = content.to_string();

        if !import_tracker_re().is_match(&next) {
            let import_line = format!("import {{ trackerRouter }} from '{}';\n", self.import_path);
            // After the last existing import, or at the top of the file.
            let insert_at = last_import_end(&next).unwrap_or(0);
            next.insert_str(insert_at, &import_line);
        }

        if !tracker_key_re().is_match(&next) {
            let m = router_open_re().find(&next)?;
            let brace_end = m.end();
            next.insert_str(brace_end, "\n  tracker: trackerRouter,");
        }

        Some(next)
    }
}

/// Byte offset just past the newline of the last top-level `import` line.
fn last_import_end(content: &str) -> Option<usize> {
    let re = {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"(?m)^import\b[^\n]*\n").unwrap())
    };
    re.find_iter(content).last().map(|m| m.end())
}
