//! Project scanner: test-hygiene and footgun heuristics over the target
//! source tree, ported finding-for-finding from the original diagnostics.

use crate::config::Config;
use crate::error::Result;
use crate::locate::{is_source_file, is_spec_file, walk_files};
use crate::paths::{self, rel_display};
use crate::report::Report;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const LARGE_FILE_BYTES: u64 = 500 * 1024;

fn open_handle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(setTimeout|setInterval)\s*\(").unwrap())
}

fn only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(describe|it|test)\.only\s*\(").unwrap())
}

fn duplicate_unmount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"const\s*\{\s*unmount\s*\}\s*=\s*const\s*\{\s*unmount\s*\}\s*=\s*render\(")
            .unwrap()
    })
}

fn cli_junk_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(^|\n)\s*(pnpm|npm|yarn)\s|<<'NODE'|cat\s+<<'EOF'").unwrap())
}

fn trpc_use_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\btrpc\.").unwrap())
}

fn proxy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bnew\s+Proxy\s*\(").unwrap())
}

fn global_react_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"globalThis\.React\s*=\s*React").unwrap())
}

fn after_each_cleanup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"afterEach\s*\(\s*\(\)\s*=>\s*cleanup\(\)\s*\)").unwrap())
}

fn global_trpc_mock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"vi\.mock\(['"]@/trpc['"]"#).unwrap())
}

fn line_of(text: &str, byte_idx: usize) -> usize {
    text[..byte_idx].matches('\n').count() + 1
}

fn snippet_at(text: &str, line: usize) -> String {
    text.lines().nth(line - 1).unwrap_or("").trim().to_string()
}

/// Scan the whole tree (or only `limit_to` paths when `--since` resolved)
/// and return the accumulated findings.
pub fn scan_project(root: &Path, cfg: &Config, limit_to: Option<&HashSet<PathBuf>>) -> Result<Report> {
    let mut report = Report::new();
    let ignore = cfg.ignore_dirs();
    let files = walk_files(root, &ignore, &|p: &Path| {
        is_source_file(p)
            || matches!(p.extension().and_then(|e| e.to_str()), Some("json" | "md"))
    });
    for file in files {
        if let Some(limit) = limit_to {
            if !limit.contains(&file) {
                continue;
            }
        }
        scan_file(root, &file, &mut report)?;
    }
    check_vitest_setup(root, &mut report)?;
    check_vite_react_plugin(root, &mut report)?;
    Ok(report)
}

fn scan_file(root: &Path, file: &Path, report: &mut Report) -> Result<()> {
    let is_code = is_source_file(file);
    let is_spec = is_spec_file(file);
    let rel = rel_display(root, file);
    let Ok(text) = std::fs::read_to_string(file) else {
        return Ok(());
    };

    // Open handles outside tests
    if is_code && !is_spec {
        for m in open_handle_re().captures_iter(&text) {
            let line = line_of(&text, m.get(0).unwrap().start());
            report.add(
                "OPEN_HANDLE",
                &rel,
                line,
                format!("Found {}(", &m[1]),
                snippet_at(&text, line),
            );
        }
    }

    // .only usage
    if is_code {
        for m in only_re().captures_iter(&text) {
            let line = line_of(&text, m.get(0).unwrap().start());
            report.add(
                "FOOTGUN",
                &rel,
                line,
                format!(".{}.only() present", &m[1]),
                snippet_at(&text, line),
            );
        }
    }

    // Duplicate unmount assignment
    if is_code {
        for m in duplicate_unmount_re().find_iter(&text) {
            let line = line_of(&text, m.start());
            report.add(
                "SMELL",
                &rel,
                line,
                "Duplicate const assignment for unmount/render",
                snippet_at(&text, line),
            );
        }
    }

    // Shell/heredoc junk pasted into source files
    if is_code {
        if let Some(m) = cli_junk_re().find(&text) {
            let line = line_of(&text, m.start());
            report.add(
                "SUSPECT_CLI",
                &rel,
                line,
                "CLI/heredoc command embedded in source",
                snippet_at(&text, line),
            );
        }
    }

    // Large file quick flag
    if let Ok(meta) = std::fs::metadata(file) {
        if meta.len() > LARGE_FILE_BYTES {
            let mb = meta.len() as f64 / 1024.0 / 1024.0;
            report.add("PERF", &rel, 1, format!("Large file ({mb:.2} MB)"), "");
        }
    }

    // trpc usage without colocated spec
    if is_code && !is_spec && trpc_use_re().is_match(&text) && !has_colocated_spec(file) {
        report.add(
            "TRPC_TEST",
            &rel,
            1,
            "Uses trpc hooks but no colocated spec found",
            "",
        );
    }

    // Proxies inside tests can cause runaway memory if recursive
    if is_spec {
        if let Some(m) = proxy_re().find(&text) {
            let line = line_of(&text, m.start());
            report.add(
                "OOM_RISK",
                &rel,
                line,
                "new Proxy used in test — ensure it is NOT recursive",
                snippet_at(&text, line),
            );
        }
    }

    Ok(())
}

fn has_colocated_spec(file: &Path) -> bool {
    let Some(ext) = file.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let Some(dir) = file.parent() else {
        return false;
    };
    let mut candidates = vec![
        dir.join(format!("{stem}.spec.{ext}")),
        dir.join(format!("{stem}.test.{ext}")),
    ];
    // Next.js app-router pages get a pass for .tsx specs next to page.tsx
    if stem == "page" && ext == "tsx" {
        candidates.push(dir.join("page.spec.tsx"));
        candidates.push(dir.join("page.test.tsx"));
    }
    candidates.iter().any(|c| c.exists())
}

fn check_vitest_setup(root: &Path, report: &mut Report) -> Result<()> {
    let path = root.join(paths::VITEST_SETUP);
    let Some(s) = crate::io::read_if_exists(&path)? else {
        return Ok(());
    };
    let rel = rel_display(root, &path);
    if !global_react_re().is_match(&s) {
        report.add(
            "SETUP",
            &rel,
            1,
            "Missing: globalThis.React = React (helps JSX in some paths)",
            "",
        );
    }
    if !s.contains("@testing-library/jest-dom") {
        report.add("SETUP", &rel, 1, "Missing: import '@testing-library/jest-dom'", "");
    }
    if !after_each_cleanup_re().is_match(&s) {
        report.add("SETUP", &rel, 1, "Missing: afterEach(() => cleanup())", "");
    }
    if global_trpc_mock_re().is_match(&s) {
        report.add(
            "OOM_RISK",
            &rel,
            1,
            "Global vi.mock('@/trpc') in setup — prefer per-test mocks; globals can leak memory",
            "",
        );
    }
    Ok(())
}

fn check_vite_react_plugin(root: &Path, report: &mut Report) -> Result<()> {
    let path = root.join(paths::VITE_CONFIG);
    let Some(s) = crate::io::read_if_exists(&path)? else {
        return Ok(());
    };
    if !s.contains("@vitejs/plugin-react") {
        report.add(
            "SETUP",
            rel_display(root, &path),
            1,
            "Vite config missing @vitejs/plugin-react in plugins[]",
            "",
        );
    }
    Ok(())
}
