use crate::output::print_json;
use anyhow::Context;
use repofix_core::config::Config;
use repofix_core::io::{atomic_write, ensure_dir, read_if_exists};
use repofix_core::mutate::Patch;
use repofix_core::paths::{self, file_stamp};
use repofix_core::prisma::Schema;
use repofix_core::recipes::{summary, wire_tracker};
use repofix_core::{git, RepofixError};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Ok,
    Warn,
    Fail,
}

impl Status {
    fn glyph(self) -> &'static str {
        match self {
            Status::Ok => "✓",
            Status::Warn => "!",
            Status::Fail => "✖",
        }
    }
}

#[derive(Debug, Serialize)]
struct Check {
    status: Status,
    label: &'static str,
    detail: String,
}

/// Read-only wiring diagnostics. Never mutates, always exits 0 — the
/// output is the product.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let cfg = Config::load(root).context("failed to load repofix.yaml")?;
    let mut checks = Vec::new();

    check_toolchain(&mut checks);
    check_repo(root, &mut checks);
    check_schema(root, &mut checks);
    check_routers(root, &cfg, &mut checks)?;
    check_vitest(root, &mut checks);

    if json {
        print_json(&checks)?;
    } else {
        for c in &checks {
            println!("{} {} — {}", c.status.glyph(), c.label, c.detail);
        }
    }

    // Persist the same lines for later comparison
    let mut log = String::new();
    for c in &checks {
        let _ = writeln!(log, "{} {} — {}", c.status.glyph(), c.label, c.detail);
    }
    let dir = paths::logs_dir(root);
    ensure_dir(&dir)?;
    let stamp = file_stamp(chrono::Utc::now());
    atomic_write(&dir.join(format!("doctor-{stamp}.log")), log.as_bytes())?;
    Ok(())
}

fn push(checks: &mut Vec<Check>, status: Status, label: &'static str, detail: impl Into<String>) {
    checks.push(Check {
        status,
        label,
        detail: detail.into(),
    });
}

fn check_toolchain(checks: &mut Vec<Check>) {
    match which::which("pnpm") {
        Ok(p) => push(checks, Status::Ok, "pnpm", p.display().to_string()),
        Err(_) => push(checks, Status::Warn, "pnpm", "not on PATH; matrix runs will fail"),
    }
}

fn check_repo(root: &Path, checks: &mut Vec<Check>) {
    if git::is_repo(root) {
        push(checks, Status::Ok, "git", "inside a worktree");
    } else {
        push(checks, Status::Warn, "git", "not a repository; mutations will need --force");
    }
}

fn check_schema(root: &Path, checks: &mut Vec<Check>) {
    let schema = match Schema::load(root) {
        Ok(s) => s,
        Err(RepofixError::SchemaNotFound(p)) => {
            push(checks, Status::Fail, "prisma", format!("schema not found at {}", p.display()));
            return;
        }
        Err(e) => {
            push(checks, Status::Fail, "prisma", e.to_string());
            return;
        }
    };

    match schema.model("Application") {
        None => push(checks, Status::Fail, "prisma", "no Application model"),
        Some(fields) => {
            push(checks, Status::Ok, "prisma", format!("Application model ({} fields)", fields.len()));
            if schema.model_has_field("Application", "source") {
                push(checks, Status::Ok, "prisma", "Application.source present");
            } else {
                push(
                    checks,
                    Status::Warn,
                    "prisma",
                    "Application.source missing — summary groupBy(['source']) would fail",
                );
            }
            match schema.enum_for_field("Application", "status") {
                Some(e) => push(checks, Status::Ok, "prisma", format!("Application.status backed by enum {e}")),
                None => push(checks, Status::Warn, "prisma", "Application.status is not enum-backed"),
            }
        }
    }
}

fn check_routers(root: &Path, cfg: &Config, checks: &mut Vec<Check>) -> anyhow::Result<()> {
    let ignore = cfg.ignore_dirs();

    match summary::locate(root) {
        Some(p) => push(checks, Status::Ok, "summary router", paths::rel_display(root, &p)),
        None => push(checks, Status::Warn, "summary router", "not found"),
    }

    let tracker = wire_tracker::find_tracker_router(root, &ignore);
    match &tracker {
        Some(p) => push(checks, Status::Ok, "tracker router", paths::rel_display(root, p)),
        None => push(checks, Status::Warn, "tracker router", "tracker.router.* not found"),
    }

    let candidates = wire_tracker::find_root_candidates(root, &ignore)?;
    match candidates.first() {
        None => push(checks, Status::Warn, "root router", "no candidates found"),
        Some(best) => {
            let probe = wire_tracker::WireTracker {
                import_path: String::new(),
            };
            if probe.is_applied(&best.content) {
                push(
                    checks,
                    Status::Ok,
                    "root router",
                    format!("{} (tracker wired)", paths::rel_display(root, &best.path)),
                );
            } else {
                push(
                    checks,
                    Status::Warn,
                    "root router",
                    format!(
                        "{} — tracker not wired (run `repofix fix wire-tracker`)",
                        paths::rel_display(root, &best.path)
                    ),
                );
            }
        }
    }
    Ok(())
}

fn check_vitest(root: &Path, checks: &mut Vec<Check>) {
    match read_if_exists(&root.join(paths::VITEST_CONFIG)).unwrap_or(None) {
        None => push(checks, Status::Warn, "vitest config", "web/vitest.config.ts missing"),
        Some(text) => {
            let mut notes = Vec::new();
            if !text.contains("jsdom") {
                notes.push("no jsdom environment");
            }
            if !text.contains("setupFiles") {
                notes.push("no setupFiles");
            }
            if notes.is_empty() {
                push(checks, Status::Ok, "vitest config", "jsdom + setupFiles");
            } else {
                push(checks, Status::Warn, "vitest config", notes.join(", "));
            }
        }
    }

    let setup_present = root.join(paths::SETUP_TESTS).is_file()
        || root.join(paths::VITEST_SETUP).is_file();
    if setup_present {
        push(checks, Status::Ok, "vitest setup", "setup file present");
    } else {
        push(checks, Status::Warn, "vitest setup", "no setup file found");
    }
}
