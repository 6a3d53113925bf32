use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use repofix_core::config::Config;
use repofix_core::matrix::{
    self, load_run, most_recent_run_dir, sort_leaderboard, MatrixOptions, Trial,
};
use repofix_core::paths::rel_display;
use repofix_core::git;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum MatrixSubcommand {
    /// Run the setup × config matrix against the web test suite
    Run {
        /// Leave the winning combination applied to the worktree
        #[arg(long)]
        apply_best: bool,

        /// Remove vitest caches between trials
        #[arg(long)]
        clean_between: bool,

        /// Node heap limit per trial, in MiB
        #[arg(long, default_value = "6144")]
        heap_mb: u32,

        /// Stop after this many combinations
        #[arg(long, default_value = "20")]
        max_tries: usize,

        /// Test command override
        #[arg(long)]
        cmd: Option<String>,

        /// Skip the clean-worktree check
        #[arg(long)]
        force: bool,
    },

    /// Leaderboard over a recorded matrix run
    Report {
        /// Run directory (default: most recent under tools/test-logs/)
        #[arg(long)]
        run_dir: Option<PathBuf>,

        /// Show only the first N rows
        #[arg(long)]
        top: Option<usize>,

        /// Keep rows whose try id, setup, or config contains this substring
        #[arg(long)]
        filter: Option<String>,

        /// Show only the winning trial
        #[arg(long)]
        best_only: bool,

        /// Render as a Markdown table
        #[arg(long)]
        markdown: bool,
    },
}

pub fn run(root: &Path, sub: MatrixSubcommand, json: bool) -> anyhow::Result<()> {
    match sub {
        MatrixSubcommand::Run {
            apply_best,
            clean_between,
            heap_mb,
            max_tries,
            cmd,
            force,
        } => {
            git::ensure_clean(root, force)?;
            let cfg = Config::load(root).context("failed to load repofix.yaml")?;
            let opts = MatrixOptions {
                apply_best,
                clean_between,
                heap_mb,
                max_tries,
                test_command: cmd,
            };
            let outcome = matrix::run_matrix(root, &cfg, &opts).context("matrix run failed")?;

            if json {
                let best = outcome.best.map(|i| &outcome.trials[i]);
                return print_json(&serde_json::json!({
                    "run_dir": rel_display(root, &outcome.run_dir),
                    "trials": &outcome.trials,
                    "best": best,
                    "applied": outcome.applied,
                }));
            }

            println!("run dir: {}", rel_display(root, &outcome.run_dir));
            println!("trials:  {}", outcome.trials.len());
            match outcome.best {
                Some(i) => {
                    let b = &outcome.trials[i];
                    println!(
                        "best:    {} ({} tests / {} files passed)",
                        b.try_id,
                        b.summary.tests_passed.unwrap_or(0),
                        b.summary.files_passed.unwrap_or(0)
                    );
                    println!(
                        "applied: {}",
                        if outcome.applied { "yes" } else { "no (originals restored)" }
                    );
                }
                None => println!("best:    none succeeded (originals restored)"),
            }
            Ok(())
        }

        MatrixSubcommand::Report {
            run_dir,
            top,
            filter,
            best_only,
            markdown,
        } => {
            let cfg = Config::load(root).context("failed to load repofix.yaml")?;
            let dir = match run_dir {
                Some(d) => d,
                None => most_recent_run_dir(&root.join(&cfg.test_logs_dir))?,
            };
            let mut trials = load_run(&dir)
                .with_context(|| format!("failed to load run {}", dir.display()))?;

            if let Some(f) = &filter {
                trials.retain(|t| {
                    t.try_id.contains(f) || t.setup.contains(f) || t.config.contains(f)
                });
            }
            sort_leaderboard(&mut trials);
            if best_only {
                trials.truncate(1);
                trials.retain(|t| t.succeeded);
            }
            if let Some(n) = top {
                trials.truncate(n);
            }

            let any_succeeded = trials.iter().any(|t| t.succeeded);

            if json {
                print_json(&trials)?;
            } else if markdown {
                print!("{}", leaderboard_markdown(&trials));
            } else {
                println!("run: {}", dir.display());
                print_table(
                    &["TRY", "SETUP", "CONFIG", "CODE", "TESTS", "FILES", "MS", "OK"],
                    trials.iter().map(leaderboard_row).collect(),
                );
            }

            if !any_succeeded {
                eprintln!("no listed try succeeded");
                std::process::exit(2);
            }
            Ok(())
        }
    }
}

fn fmt_counts(passed: Option<u32>, total: Option<u32>) -> String {
    match (passed, total) {
        (Some(p), Some(t)) => format!("{p}/{t}"),
        (Some(p), None) => p.to_string(),
        _ => "-".to_string(),
    }
}

fn leaderboard_row(t: &Trial) -> Vec<String> {
    vec![
        t.try_id.clone(),
        t.setup.clone(),
        t.config.clone(),
        t.code.to_string(),
        fmt_counts(t.summary.tests_passed, t.summary.tests_total),
        fmt_counts(t.summary.files_passed, t.summary.files_total),
        t.duration_ms.to_string(),
        if t.succeeded { "yes" } else { "no" }.to_string(),
    ]
}

fn leaderboard_markdown(trials: &[Trial]) -> String {
    let mut md = String::from(
        "| try | setup | config | code | tests | files | ms | ok |\n|---|---|---|---|---|---|---|---|\n",
    );
    for t in trials {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
            t.try_id,
            t.setup,
            t.config,
            t.code,
            fmt_counts(t.summary.tests_passed, t.summary.tests_total),
            fmt_counts(t.summary.files_passed, t.summary.files_total),
            t.duration_ms,
            if t.succeeded { "yes" } else { "no" },
        ));
    }
    md
}
