//! Vitest setup/config matrix runner.
//!
//! Enumerates vetted variants of `web/test/setup-tests.ts` and
//! `web/vitest.config.ts`, runs the suite once per combination, and keeps
//! each trial as an immutable record. Picking the winner is a pure fold
//! over those records; all apply/restore filesystem effects happen after
//! the fold, driven by its result.

use crate::config::Config;
use crate::error::{RepofixError, Result};
use crate::io::{atomic_write, ensure_dir, read_if_exists};
use crate::paths::{self, file_stamp, rel_display};
use crate::runner::{self, TestSummary};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Variant {
    pub id: &'static str,
    pub content: &'static str,
}

/// Vetted setup-file variants, most defensive first.
pub fn setup_variants() -> Vec<Variant> {
    vec![
        Variant {
            id: "S0-bulletproof-jestdom",
            content: r#"import React from 'react';
(globalThis as any).React = React;

import { afterEach, expect } from 'vitest';
import { cleanup } from '@testing-library/react';

// Handle both jest-dom v6 (".../vitest") and v5 ("matchers" + manual extend)
async function installJestDom() {
  try {
    await import('@testing-library/jest-dom/vitest');
    return;
  } catch {
    try {
      const matchers = await import('@testing-library/jest-dom/matchers');
      // @ts-ignore - matchers shape differs across versions
      expect.extend(matchers);
      await import('@testing-library/jest-dom');
    } catch {
      // continue without extra matchers
    }
  }
}
await installJestDom();

afterEach(() => cleanup());
"#,
        },
        Variant {
            id: "S1-vitest-jestdom",
            content: r#"import { afterEach } from 'vitest';
import '@testing-library/jest-dom/vitest';
import { cleanup } from '@testing-library/react';
import React from 'react';
(globalThis as any).React = React;

afterEach(() => cleanup());
"#,
        },
        Variant {
            id: "S2-minimal",
            content: r#"import '@testing-library/jest-dom';
import React from 'react';
(globalThis as any).React = React;
"#,
        },
    ]
}

/// Vetted vitest-config variants.
pub fn config_variants() -> Vec<Variant> {
    vec![
        Variant {
            id: "C0-jsdom-setup-alias",
            content: r#"import { defineConfig } from 'vitest/config';
import path from 'path';

export default defineConfig({
  test: {
    environment: 'jsdom',
    globals: true,
    setupFiles: ['./test/setup-tests.ts'],
  },
  resolve: {
    alias: {
      '@/trpc': path.resolve(__dirname, 'test/trpc.stub.ts'),
      '@': path.resolve(__dirname, 'src'),
    },
  },
});
"#,
        },
        Variant {
            id: "C1-jsdom-env-url",
            content: r#"import { defineConfig } from 'vitest/config';
import path from 'path';

export default defineConfig({
  test: {
    environment: 'jsdom',
    environmentOptions: { jsdom: { url: 'http://localhost:3000' } },
    globals: true,
    setupFiles: ['./test/setup-tests.ts'],
  },
  resolve: {
    alias: {
      '@/trpc': path.resolve(__dirname, 'test/trpc.stub.ts'),
      '@': path.resolve(__dirname, 'src'),
    },
  },
});
"#,
        },
        Variant {
            id: "C2-single-thread",
            content: r#"import { defineConfig } from 'vitest/config';
import path from 'path';

export default defineConfig({
  test: {
    environment: 'jsdom',
    globals: true,
    setupFiles: ['./test/setup-tests.ts'],
    pool: 'threads',
    poolOptions: { threads: { singleThread: true } },
  },
  resolve: {
    alias: {
      '@/trpc': path.resolve(__dirname, 'test/trpc.stub.ts'),
      '@': path.resolve(__dirname, 'src'),
    },
  },
});
"#,
        },
    ]
}

/// A `@/trpc` stub that never touches the network.
pub const TRPC_STUB: &str = r#"import { vi } from 'vitest';

const noopQuery = { data: undefined, isLoading: false, error: null };

export const trpc = {
  tracker: {
    getApplications: { useQuery: vi.fn(() => noopQuery) },
    getActivity: { useQuery: vi.fn(() => noopQuery) },
  },
  summary: {
    get: { useQuery: vi.fn(() => noopQuery) },
  },
};
"#;

// ---------------------------------------------------------------------------
// Trial records
// ---------------------------------------------------------------------------

pub const SUMMARY_CSV_HEADER: &str = "try_id,setup,config,code,files_passed,files_failed,files_total,tests_passed,tests_failed,tests_total,duration_ms,succeeded,log";

/// Immutable result of one setup × config trial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trial {
    pub try_id: String,
    pub setup: String,
    pub config: String,
    pub code: i32,
    pub summary: TestSummary,
    pub duration_ms: u64,
    pub succeeded: bool,
    /// Log path relative to the target repo root.
    pub log: String,
}

impl Trial {
    /// Success outranks everything; among successes, passed tests then
    /// passed files. Hard failures score below any success.
    pub fn score(&self) -> i64 {
        if !self.succeeded {
            return -1;
        }
        self.summary.tests_passed.unwrap_or(0) as i64 * 1_000_000
            + self.summary.files_passed.unwrap_or(0) as i64 * 1_000
    }

    pub fn csv_row(&self) -> String {
        let opt = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.try_id,
            self.setup,
            self.config,
            self.code,
            opt(self.summary.files_passed),
            opt(self.summary.files_failed),
            opt(self.summary.files_total),
            opt(self.summary.tests_passed),
            opt(self.summary.tests_failed),
            opt(self.summary.tests_total),
            self.duration_ms,
            self.succeeded,
            self.log
        )
    }
}

/// Pure "pick best" reducer over trial records.
pub fn pick_best(trials: &[Trial]) -> Option<&Trial> {
    trials
        .iter()
        .filter(|t| t.succeeded)
        .max_by_key(|t| t.score())
}

/// Leaderboard order: succeeded desc, tests passed desc, files passed
/// desc, tests total desc, duration asc, exit code asc.
pub fn sort_leaderboard(trials: &mut [Trial]) {
    trials.sort_by(|a, b| {
        b.succeeded
            .cmp(&a.succeeded)
            .then(b.summary.tests_passed.cmp(&a.summary.tests_passed))
            .then(b.summary.files_passed.cmp(&a.summary.files_passed))
            .then(b.summary.tests_total.cmp(&a.summary.tests_total))
            .then(a.duration_ms.cmp(&b.duration_ms))
            .then(a.code.cmp(&b.code))
    });
}

// ---------------------------------------------------------------------------
// Run-directory persistence
// ---------------------------------------------------------------------------

pub fn parse_summary_csv(text: &str) -> Vec<Trial> {
    let mut lines = text.lines();
    let _header = lines.next();
    let mut out = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split(',').collect();
        if cols.len() < 13 {
            continue;
        }
        let u = |i: usize| cols[i].parse::<u32>().ok();
        out.push(Trial {
            try_id: cols[0].to_string(),
            setup: cols[1].to_string(),
            config: cols[2].to_string(),
            code: cols[3].parse().unwrap_or(1),
            summary: TestSummary {
                files_passed: u(4),
                files_failed: u(5),
                files_total: u(6),
                tests_passed: u(7),
                tests_failed: u(8),
                tests_total: u(9),
                duration_ms: cols[10].parse().ok(),
            },
            duration_ms: cols[10].parse().unwrap_or(0),
            succeeded: cols[11] == "true",
            log: cols[12..].join(","),
        });
    }
    out
}

/// Most recent `vitest-matrix-*` run directory under the test-logs root.
pub fn most_recent_run_dir(logs_root: &Path) -> Result<PathBuf> {
    if !logs_root.exists() {
        return Err(RepofixError::NoMatrixRuns(logs_root.to_path_buf()));
    }
    let mut runs: Vec<PathBuf> = std::fs::read_dir(logs_root)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("vitest-matrix-"))
        })
        .collect();
    runs.sort();
    runs.pop()
        .ok_or_else(|| RepofixError::NoMatrixRuns(logs_root.to_path_buf()))
}

/// Load the trial records of a run directory.
pub fn load_run(run_dir: &Path) -> Result<Vec<Trial>> {
    let csv = run_dir.join("summary.csv");
    let Some(text) = read_if_exists(&csv)? else {
        return Err(RepofixError::MissingRunArtifact(csv));
    };
    Ok(parse_summary_csv(&text))
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MatrixOptions {
    pub apply_best: bool,
    pub clean_between: bool,
    pub heap_mb: u32,
    pub max_tries: usize,
    /// Override for the configured test command.
    pub test_command: Option<String>,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            apply_best: false,
            clean_between: false,
            heap_mb: 6144,
            max_tries: 20,
            test_command: None,
        }
    }
}

#[derive(Debug)]
pub struct MatrixOutcome {
    pub run_dir: PathBuf,
    pub trials: Vec<Trial>,
    /// Index into `trials` of the winner, when any trial succeeded.
    pub best: Option<usize>,
    /// True when the winner's files were left applied to the worktree.
    pub applied: bool,
}

/// Snapshot of the three mutated files before the run.
struct Originals {
    setup: Option<String>,
    config: Option<String>,
    stub: Option<String>,
}

fn restore_or_remove(path: &Path, original: &Option<String>) -> Result<()> {
    match original {
        Some(content) => atomic_write(path, content.as_bytes())?,
        None => {
            // Created during the run — remove rather than leave behind.
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
    }
    Ok(())
}

/// Run the full matrix. Mutated files are restored to their pre-run state
/// unless `apply_best` is set and some trial succeeded. Restoration also
/// happens when a trial errors out mid-run.
pub fn run_matrix(root: &Path, cfg: &Config, opts: &MatrixOptions) -> Result<MatrixOutcome> {
    let setup_path = root.join(paths::SETUP_TESTS);
    let config_path = root.join(paths::VITEST_CONFIG);
    let stub_path = root.join(paths::TRPC_STUB);

    let originals = Originals {
        setup: read_if_exists(&setup_path)?,
        config: read_if_exists(&config_path)?,
        stub: read_if_exists(&stub_path)?,
    };

    let result = run_matrix_inner(root, cfg, opts, &setup_path, &config_path, &stub_path, &originals);
    if result.is_err() {
        // Best-effort: the trial error is the one worth surfacing.
        let _ = restore_or_remove(&setup_path, &originals.setup);
        let _ = restore_or_remove(&config_path, &originals.config);
        let _ = restore_or_remove(&stub_path, &originals.stub);
    }
    result
}

fn run_matrix_inner(
    root: &Path,
    cfg: &Config,
    opts: &MatrixOptions,
    setup_path: &Path,
    config_path: &Path,
    stub_path: &Path,
    originals: &Originals,
) -> Result<MatrixOutcome> {
    let stamp = file_stamp(chrono::Utc::now());
    let run_dir = root.join(&cfg.test_logs_dir).join(format!("vitest-matrix-{stamp}"));
    ensure_dir(&run_dir)?;
    let csv_path = run_dir.join("summary.csv");
    let mut csv = String::from(SUMMARY_CSV_HEADER);
    csv.push('\n');

    // The stub is identical across combos; ensure it once.
    atomic_write(&stub_path, TRPC_STUB.as_bytes())?;

    let command = opts
        .test_command
        .clone()
        .unwrap_or_else(|| cfg.test_command.clone());
    let heap = format!("--max-old-space-size={}", opts.heap_mb);

    let setups = setup_variants();
    let configs = config_variants();
    let mut trials = Vec::new();
    let mut combo_no = 0usize;

    'outer: for setup in &setups {
        for config in &configs {
            combo_no += 1;
            if combo_no > opts.max_tries {
                break 'outer;
            }
            let try_id = format!("try-{:02}__{}__{}", combo_no, setup.id, config.id);
            info!(%try_id, "matrix trial");

            atomic_write(&setup_path, setup.content.as_bytes())?;
            atomic_write(&config_path, config.content.as_bytes())?;
            if opts.clean_between {
                clean_vitest_caches(root);
            }

            let out = runner::run_shell_with_env(&command, root, None, &[("NODE_OPTIONS", &heap)])?;
            let combined = out.combined();
            if let Some(hint) = runner::first_error_hint(&combined) {
                info!(%try_id, hint, "first error hint");
            }

            let log_path = run_dir.join(format!("{try_id}.log"));
            let log_body = format!(
                "# CMD\n{command}\n\n# EXIT CODE\n{}\n\n# STDOUT\n{}\n\n# STDERR\n{}\n",
                out.code, out.stdout, out.stderr
            );
            atomic_write(&log_path, log_body.as_bytes())?;

            let summary = runner::parse_test_summary(&combined);
            let succeeded = out.code == 0 && summary.has_totals();
            let trial = Trial {
                try_id,
                setup: setup.id.to_string(),
                config: config.id.to_string(),
                code: out.code,
                duration_ms: summary.duration_ms.unwrap_or(out.duration_ms),
                summary,
                succeeded,
                log: rel_display(root, &log_path),
            };
            csv.push_str(&trial.csv_row());
            csv.push('\n');
            trials.push(trial);
        }
    }

    atomic_write(&csv_path, csv.as_bytes())?;

    let best_trial = pick_best(&trials).cloned();
    let best = best_trial
        .as_ref()
        .and_then(|b| trials.iter().position(|t| t.try_id == b.try_id));

    #[derive(Serialize)]
    struct RunJson<'a> {
        best: Option<&'a Trial>,
        tries: &'a [Trial],
    }
    atomic_write(
        &run_dir.join("summary.json"),
        serde_json::to_string_pretty(&RunJson {
            best: best_trial.as_ref(),
            tries: &trials,
        })?
        .as_bytes(),
    )?;

    let applied = if opts.apply_best {
        match &best_trial {
            Some(b) => {
                let setup = setups.iter().find(|s| s.id == b.setup);
                let config = configs.iter().find(|c| c.id == b.config);
                if let (Some(s), Some(c)) = (setup, config) {
                    atomic_write(&setup_path, s.content.as_bytes())?;
                    atomic_write(&config_path, c.content.as_bytes())?;
                    true
                } else {
                    false
                }
            }
            None => {
                warn!("no successful trial to apply; restoring originals");
                false
            }
        }
    } else {
        false
    };

    if !applied {
        restore_or_remove(&setup_path, &originals.setup)?;
        restore_or_remove(&config_path, &originals.config)?;
        restore_or_remove(&stub_path, &originals.stub)?;
    }

    Ok(MatrixOutcome {
        run_dir,
        trials,
        best,
        applied,
    })
}

fn clean_vitest_caches(root: &Path) {
    for rel in ["node_modules/.vitest", "web/node_modules/.vitest"] {
        let p = root.join(rel);
        if p.exists() {
            let _ = std::fs::remove_dir_all(&p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn trial(id: &str, code: i32, tests_passed: Option<u32>, files_passed: Option<u32>) -> Trial {
        let summary = TestSummary {
            tests_passed,
            files_passed,
            tests_total: tests_passed,
            files_total: files_passed,
            ..Default::default()
        };
        Trial {
            try_id: id.to_string(),
            setup: "S0".to_string(),
            config: "C0".to_string(),
            code,
            succeeded: code == 0 && summary.has_totals(),
            summary,
            duration_ms: 100,
            log: format!("tools/test-logs/x/{id}.log"),
        }
    }

    #[test]
    fn score_ranks_tests_over_files() {
        let a = trial("a", 0, Some(10), Some(1));
        let b = trial("b", 0, Some(9), Some(99));
        assert!(a.score() > b.score());
    }

    #[test]
    fn failed_trial_scores_negative() {
        let t = trial("t", 1, Some(50), Some(5));
        assert_eq!(t.score(), -1);
    }

    #[test]
    fn pick_best_ignores_failures() {
        let trials = vec![
            trial("fail", 1, Some(100), Some(10)),
            trial("ok-small", 0, Some(3), Some(1)),
            trial("ok-big", 0, Some(7), Some(2)),
        ];
        assert_eq!(pick_best(&trials).unwrap().try_id, "ok-big");
    }

    #[test]
    fn pick_best_none_when_all_fail() {
        let trials = vec![trial("a", 1, None, None), trial("b", 2, None, None)];
        assert!(pick_best(&trials).is_none());
    }

    #[test]
    fn leaderboard_sorts_succeeded_first() {
        let mut trials = vec![
            trial("fail", 1, Some(9), Some(9)),
            trial("ok", 0, Some(1), Some(1)),
        ];
        sort_leaderboard(&mut trials);
        assert_eq!(trials[0].try_id, "ok");
    }

    #[test]
    fn csv_round_trip() {
        let t = trial("try-01__S0__C0", 0, Some(5), Some(2));
        let text = format!("{SUMMARY_CSV_HEADER}\n{}\n", t.csv_row());
        let parsed = parse_summary_csv(&text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].try_id, "try-01__S0__C0");
        assert_eq!(parsed[0].summary.tests_passed, Some(5));
        assert!(parsed[0].succeeded);
    }

    #[test]
    fn csv_missing_counts_parse_as_none() {
        let text = format!(
            "{SUMMARY_CSV_HEADER}\ntry-01,S0,C0,1,,,,,,,123,false,tools/x.log\n"
        );
        let parsed = parse_summary_csv(&text);
        assert_eq!(parsed[0].summary.tests_passed, None);
        assert!(!parsed[0].succeeded);
        assert_eq!(parsed[0].duration_ms, 123);
    }

    #[test]
    fn most_recent_run_dir_picks_latest() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("vitest-matrix-2026-01-01T00-00-00-000Z")).unwrap();
        std::fs::create_dir_all(dir.path().join("vitest-matrix-2026-02-01T00-00-00-000Z")).unwrap();
        std::fs::create_dir_all(dir.path().join("other-dir")).unwrap();
        let latest = most_recent_run_dir(dir.path()).unwrap();
        assert!(latest.ends_with("vitest-matrix-2026-02-01T00-00-00-000Z"));
    }

    #[test]
    fn most_recent_run_dir_errors_when_empty() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            most_recent_run_dir(dir.path()),
            Err(RepofixError::NoMatrixRuns(_))
        ));
    }

    #[test]
    fn run_matrix_restores_originals() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("web/test")).unwrap();
        std::fs::write(dir.path().join(paths::VITEST_CONFIG), "original config").unwrap();
        // setup-tests.ts and trpc.stub.ts do not exist yet

        let opts = MatrixOptions {
            max_tries: 2,
            test_command: Some("echo ' Tests  1 passed (1)'".to_string()),
            ..Default::default()
        };
        let outcome = run_matrix(dir.path(), &Config::default(), &opts).unwrap();

        assert_eq!(outcome.trials.len(), 2);
        assert!(outcome.best.is_some());
        assert!(!outcome.applied);
        // config restored, created files removed
        assert_eq!(
            std::fs::read_to_string(dir.path().join(paths::VITEST_CONFIG)).unwrap(),
            "original config"
        );
        assert!(!dir.path().join(paths::SETUP_TESTS).exists());
        assert!(!dir.path().join(paths::TRPC_STUB).exists());
        // run artifacts persisted
        assert!(outcome.run_dir.join("summary.csv").exists());
        assert!(outcome.run_dir.join("summary.json").exists());
        let csv = std::fs::read_to_string(outcome.run_dir.join("summary.csv")).unwrap();
        assert!(csv.starts_with(SUMMARY_CSV_HEADER));
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn run_matrix_apply_best_keeps_winner() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("web/test")).unwrap();
        let opts = MatrixOptions {
            apply_best: true,
            max_tries: 1,
            test_command: Some("echo ' Tests  2 passed (2)'".to_string()),
            ..Default::default()
        };
        let outcome = run_matrix(dir.path(), &Config::default(), &opts).unwrap();
        assert!(outcome.applied);
        let setup = std::fs::read_to_string(dir.path().join(paths::SETUP_TESTS)).unwrap();
        assert_eq!(setup, setup_variants()[0].content);
    }

    #[test]
    fn run_matrix_error_mid_run_restores_originals() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("web/test")).unwrap();
        std::fs::write(dir.path().join(paths::SETUP_TESTS), "original setup").unwrap();

        // The first trial turns the config file into a directory, so the
        // second trial's config write errors out mid-run.
        let opts = MatrixOptions {
            max_tries: 2,
            test_command: Some(
                "rm web/vitest.config.ts && mkdir web/vitest.config.ts".to_string(),
            ),
            ..Default::default()
        };
        let result = run_matrix(dir.path(), &Config::default(), &opts);

        assert!(result.is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(paths::SETUP_TESTS)).unwrap(),
            "original setup"
        );
        assert!(!dir.path().join(paths::TRPC_STUB).exists());
    }

    #[test]
    fn run_matrix_failure_restores_even_with_apply_best() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("web/test")).unwrap();
        let opts = MatrixOptions {
            apply_best: true,
            max_tries: 1,
            test_command: Some("exit 1".to_string()),
            ..Default::default()
        };
        let outcome = run_matrix(dir.path(), &Config::default(), &opts).unwrap();
        assert!(!outcome.applied);
        assert!(outcome.best.is_none());
        assert!(!dir.path().join(paths::SETUP_TESTS).exists());
    }
}
