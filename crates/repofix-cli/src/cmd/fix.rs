use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use repofix_core::config::Config;
use repofix_core::mutate::{apply_to_file, Outcome};
use repofix_core::paths::rel_display;
use repofix_core::prisma::Schema;
use repofix_core::recipes::{summary, wire_tracker};
use repofix_core::{git, RepofixError};
use std::path::Path;
use tracing::warn;

#[derive(Subcommand)]
pub enum FixSubcommand {
    /// Replace the summary router's groupBy(['source']) with a safe aggregation
    Summary {
        /// Preview the rewrite without writing
        #[arg(long)]
        dry: bool,

        /// Skip the clean-worktree check
        #[arg(long)]
        force: bool,
    },

    /// Wire trackerRouter into the tRPC root router
    WireTracker {
        /// Preview the rewrite without writing
        #[arg(long)]
        dry: bool,

        /// Patch every candidate root router, not just the best match
        #[arg(long)]
        all: bool,

        /// Skip the clean-worktree check
        #[arg(long)]
        force: bool,
    },
}

pub fn run(root: &Path, sub: FixSubcommand, json: bool) -> anyhow::Result<()> {
    match sub {
        FixSubcommand::Summary { dry, force } => run_summary(root, dry, force, json),
        FixSubcommand::WireTracker { dry, all, force } => {
            run_wire_tracker(root, dry, all, force, json)
        }
    }
}

fn run_summary(root: &Path, dry: bool, force: bool, json: bool) -> anyhow::Result<()> {
    if !dry {
        git::ensure_clean(root, force)?;
    }

    let Some(target) = summary::locate(root) else {
        warn!("summary router not found; nothing to do");
        return Ok(());
    };

    // Verify the schema assumption before touching source; a mismatch is
    // a warned skip, never a blind patch.
    match Schema::load(root) {
        Ok(schema) => {
            if !schema.model_has_field("Application", "status") {
                warn!("Application model has no `status` field; skipping summary fix");
                return Ok(());
            }
        }
        Err(RepofixError::SchemaNotFound(p)) => {
            warn!(path = %p.display(), "prisma schema not found; patching without verification");
        }
        Err(e) => return Err(e).context("failed to read prisma schema"),
    }

    let outcome = apply_to_file(&target, &summary::SummarySourceCounts, dry)
        .with_context(|| format!("failed to patch {}", target.display()))?;
    report_outcome(root, &target, &outcome, dry, json)
}

fn run_wire_tracker(root: &Path, dry: bool, all: bool, force: bool, json: bool) -> anyhow::Result<()> {
    if !dry {
        git::ensure_clean(root, force)?;
    }

    let cfg = Config::load(root).context("failed to load repofix.yaml")?;
    let ignore = cfg.ignore_dirs();

    let Some(tracker) = wire_tracker::find_tracker_router(root, &ignore) else {
        warn!("tracker.router.* not found; nothing to wire");
        return Ok(());
    };

    let candidates = wire_tracker::find_root_candidates(root, &ignore)?;
    if candidates.is_empty() {
        warn!("no root router candidates found");
        return Ok(());
    }

    let take = if all { candidates.len() } else { 1 };
    for candidate in candidates.iter().take(take) {
        let patch = wire_tracker::WireTracker {
            import_path: wire_tracker::relative_import(&candidate.path, &tracker),
        };
        let outcome = apply_to_file(&candidate.path, &patch, dry)
            .with_context(|| format!("failed to patch {}", candidate.path.display()))?;
        report_outcome(root, &candidate.path, &outcome, dry, json)?;
    }
    Ok(())
}

fn report_outcome(
    root: &Path,
    target: &Path,
    outcome: &Outcome,
    dry: bool,
    json: bool,
) -> anyhow::Result<()> {
    let file = rel_display(root, target);
    let (status, backup) = match outcome {
        Outcome::FileMissing => ("missing", None),
        Outcome::AlreadyApplied => ("already-applied", None),
        Outcome::Patched { backup } => ("patched", Some(rel_display(root, backup))),
        Outcome::WouldPatch { .. } => ("would-patch", None),
        Outcome::NoConfidentMatch => ("no-match", None),
    };

    if json {
        return print_json(&serde_json::json!({
            "file": file,
            "status": status,
            "dry": dry,
            "backup": backup,
        }));
    }

    match outcome {
        Outcome::FileMissing => warn!(%file, "target file missing; skipped"),
        Outcome::AlreadyApplied => println!("{file}: already finalized — no-op"),
        Outcome::Patched { backup } => {
            println!("{file}: patched (backup: {})", rel_display(root, backup))
        }
        Outcome::WouldPatch { .. } => println!("{file}: would patch (dry run)"),
        Outcome::NoConfidentMatch => println!("{file}: could not confidently patch — left as-is"),
    }
    Ok(())
}
