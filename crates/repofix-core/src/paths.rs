use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Target-repo layout constants
// ---------------------------------------------------------------------------

pub const PRISMA_SCHEMA: &str = "prisma/schema.prisma";
pub const SUMMARY_ROUTER: &str = "apps/api/src/router/summary.ts";
pub const TRACKER_ROUTER: &str = "apps/api/src/trpc/routers/tracker.router.ts";
pub const WEB_DIR: &str = "web";
pub const VITEST_CONFIG: &str = "web/vitest.config.ts";
pub const VITEST_SETUP: &str = "web/vitest.setup.ts";
pub const SETUP_TESTS: &str = "web/test/setup-tests.ts";
pub const TRPC_STUB: &str = "web/test/trpc.stub.ts";
pub const VITE_CONFIG: &str = "web/vite.config.ts";

pub const REPORTS_DIR: &str = "tools/reports";
pub const LOGS_DIR: &str = "tools/logs";
pub const TEST_LOGS_DIR: &str = "tools/test-logs";

pub const CONFIG_FILE: &str = "repofix.yaml";

/// Directory names never descended into during a walk.
pub const IGNORE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".next",
    "dist",
    "build",
    "coverage",
    "out",
    ".turbo",
    ".cache",
    "tmp",
    "vendor",
];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn reports_dir(root: &Path) -> PathBuf {
    root.join(REPORTS_DIR)
}

pub fn logs_dir(root: &Path) -> PathBuf {
    root.join(LOGS_DIR)
}

pub fn test_logs_dir(root: &Path) -> PathBuf {
    root.join(TEST_LOGS_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Timestamp suitable for filenames: colons and dots replaced with dashes.
pub fn file_stamp(now: chrono::DateTime<chrono::Utc>) -> String {
    now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Render a path relative to `root` with forward slashes, for display.
pub fn rel_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
