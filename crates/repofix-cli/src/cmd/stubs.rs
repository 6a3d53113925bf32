use anyhow::Context;
use clap::Args;
use repofix_core::config::Config;
use repofix_core::io::atomic_write;
use repofix_core::paths::file_stamp;
use repofix_core::stubs::{scan_stubs, suggest_deletes, StubScanOptions};
use repofix_core::git;
use std::path::Path;
use tracing::warn;

#[derive(Args)]
pub struct StubsArgs {
    /// Also write a CSV rendering of the findings
    #[arg(long)]
    pub csv: bool,

    /// Also write a Markdown rendering of the findings
    #[arg(long)]
    pub md: bool,

    /// Keep only these finding kinds (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip paths matching these glob patterns (repeatable)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Only scan files changed since this git ref
    #[arg(long)]
    pub since: Option<String>,

    /// Exit 2 when any finding remains after filtering
    #[arg(long)]
    pub fail_on_find: bool,

    /// Exit 2 when findings exceed this count (overrides repofix.yaml)
    #[arg(long)]
    pub threshold: Option<usize>,
}

pub fn run(root: &Path, args: &StubsArgs, json: bool) -> anyhow::Result<()> {
    let cfg = Config::load(root).context("failed to load repofix.yaml")?;

    let limit = args.since.as_deref().and_then(|r| git::changed_since(root, r));
    if args.since.is_some() && limit.is_none() {
        warn!("--since ref could not be resolved; scanning the whole tree");
    }

    let opts = StubScanOptions {
        ignore: args.ignore.clone(),
        limit_to: limit,
    };
    let mut report = scan_stubs(root, &cfg, &opts).context("stub scan failed")?;
    report.retain_kinds(&args.only);

    let stamp = file_stamp(chrono::Utc::now());
    let dir = root.join(&cfg.reports_dir);
    report
        .write_json_and_text(&dir, "stubs", &stamp)
        .context("failed to write stub reports")?;
    if args.csv {
        atomic_write(&dir.join(format!("stubs-{stamp}.csv")), report.to_csv().as_bytes())?;
    }
    if args.md {
        atomic_write(&dir.join(format!("stubs-{stamp}.md")), report.to_markdown().as_bytes())?;
    }

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
        let deletes = suggest_deletes(&report);
        if !deletes.is_empty() {
            println!("Suggested cleanup:");
            for cmd in deletes {
                println!("  {cmd}");
            }
        }
    }

    let threshold = args.threshold.or(cfg.stub_threshold);
    let tripped = (args.fail_on_find && !report.is_empty())
        || threshold.is_some_and(|t| report.len() > t);
    if tripped {
        eprintln!(
            "stub gate tripped: {} finding(s){}",
            report.len(),
            threshold.map(|t| format!(" (threshold {t})")).unwrap_or_default()
        );
        std::process::exit(2);
    }
    Ok(())
}
