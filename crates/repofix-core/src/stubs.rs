//! Stub/placeholder scanner: finds the markers, bandaid casts, and
//! never-finished spec files that tend to accumulate in the target repo.

use crate::config::Config;
use crate::error::Result;
use crate::locate::{is_source_file, is_spec_file, walk_files};
use crate::paths::rel_display;
use crate::report::Report;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(TODO|FIXME|HACK|STUB|PLACEHOLDER|WIP|TEMP)\b").unwrap())
}

fn not_implemented_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"throw\s+new\s+Error\s*\(\s*['"](not implemented|unimplemented)"#).unwrap()
    })
}

fn ts_bandaid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@ts-(ignore|expect-error)").unwrap())
}

fn cast_any_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bas\s+any\b").unwrap())
}

fn double_cast_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bas\s+unknown\s+as\b").unwrap())
}

fn stubby_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)sanity|health|placeholder|stub|smoke").unwrap())
}

fn expect_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bexpect\s*\(").unwrap())
}

/// Convert a minimatch-style ignore pattern (`*`, `**`) to a regex over
/// the forward-slash relative path.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    re.push_str(".*");
                } else {
                    re.push_str("[^/]*");
                }
            }
            '?' => re.push_str("[^/]"),
            c if "\\.+()[]{}^$|".contains(c) => {
                re.push('\\');
                re.push(c);
            }
            c => re.push(c),
        }
    }
    re.push('$');
    Ok(Regex::new(&re)?)
}

#[derive(Debug, Default)]
pub struct StubScanOptions {
    /// Ignore patterns over relative paths (minimatch-like `*`/`**`).
    pub ignore: Vec<String>,
    /// Restrict to these absolute paths (from `--since`).
    pub limit_to: Option<HashSet<PathBuf>>,
}

pub fn scan_stubs(root: &Path, cfg: &Config, opts: &StubScanOptions) -> Result<Report> {
    let ignore_res: Vec<Regex> = opts
        .ignore
        .iter()
        .map(|p| glob_to_regex(p))
        .collect::<Result<_>>()?;
    let ignore_dirs = cfg.ignore_dirs();
    let mut report = Report::new();
    for file in walk_files(root, &ignore_dirs, &is_source_file) {
        if let Some(limit) = &opts.limit_to {
            if !limit.contains(&file) {
                continue;
            }
        }
        let rel = rel_display(root, &file);
        if ignore_res.iter().any(|re| re.is_match(&rel)) {
            continue;
        }
        scan_file(&file, &rel, &mut report);
    }
    Ok(report)
}

fn scan_file(file: &Path, rel: &str, report: &mut Report) {
    let Ok(text) = std::fs::read_to_string(file) else {
        return;
    };

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        if let Some(m) = marker_re().captures(line) {
            report.add("MARKER", rel, lineno, format!("{} marker", &m[1]), line.trim());
        }
        if not_implemented_re().is_match(line) {
            report.add("NOT_IMPLEMENTED", rel, lineno, "throws 'not implemented'", line.trim());
        }
        if let Some(m) = ts_bandaid_re().captures(line) {
            report.add(
                "TS_BANDAID",
                rel,
                lineno,
                format!("@ts-{} suppression", &m[1]),
                line.trim(),
            );
        }
        if double_cast_re().is_match(line) {
            report.add("DOUBLE_CAST", rel, lineno, "`as unknown as` double cast", line.trim());
        } else if cast_any_re().is_match(line) {
            report.add("CAST_ANY", rel, lineno, "`as any` cast", line.trim());
        }
    }

    // Spec files that never grew real assertions
    if is_spec_file(file) {
        let expects = expect_re().find_iter(&text).count();
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if expects <= 1 {
            report.add(
                "SPEC_STUB",
                rel,
                1,
                format!("spec file with {expects} expect() call(s)"),
                "",
            );
        } else if stubby_name_re().is_match(name) {
            report.add("SPEC_STUB", rel, 1, "stub-ish spec filename", "");
        }
    }
}

/// Chunked `git rm` suggestions for obvious stub specs, 10 paths per line.
pub fn suggest_deletes(report: &Report) -> Vec<String> {
    let stub_specs: Vec<&str> = report
        .findings()
        .iter()
        .filter(|f| f.kind == "SPEC_STUB")
        .map(|f| f.file.as_str())
        .collect();
    stub_specs
        .chunks(10)
        .map(|chunk| format!("git rm {}", chunk.join(" ")))
        .collect()
}
