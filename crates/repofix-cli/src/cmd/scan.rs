use anyhow::Context;
use repofix_core::config::Config;
use repofix_core::paths::{file_stamp, rel_display};
use repofix_core::{git, scan};
use std::path::Path;
use tracing::warn;

/// Project scan. Diagnostics only — always exits 0 so it can run in CI
/// without gating anything.
pub fn run(root: &Path, since: Option<&str>, json: bool) -> anyhow::Result<()> {
    let cfg = Config::load(root).context("failed to load repofix.yaml")?;

    let limit = since.and_then(|r| git::changed_since(root, r));
    if since.is_some() && limit.is_none() {
        warn!("--since ref could not be resolved; scanning the whole tree");
    }

    let report = scan::scan_project(root, &cfg, limit.as_ref()).context("scan failed")?;

    let stamp = file_stamp(chrono::Utc::now());
    let dir = root.join(&cfg.reports_dir);
    let (json_path, txt_path) = report
        .write_json_and_text(&dir, "scan", &stamp)
        .context("failed to write scan reports")?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
        println!(
            "Reports: {}  {}",
            rel_display(root, &json_path),
            rel_display(root, &txt_path)
        );
    }
    Ok(())
}
