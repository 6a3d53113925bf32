use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use repofix_core::health::{all_ok, probe_routes};
use std::time::Duration;

#[derive(Args)]
pub struct SmokeArgs {
    /// Dev-server host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Dev-server port
    #[arg(long, default_value = "3000")]
    pub port: u16,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "5")]
    pub timeout: u64,

    /// Application id used for the activity route
    #[arg(long, default_value = "demo")]
    pub id: String,

    /// Exit 1 when any probe fails
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: &SmokeArgs, json: bool) -> anyhow::Result<()> {
    let base = format!("http://{}:{}", args.host, args.port);
    let activity = format!("/tracker/activity?id={}", args.id);
    let routes: Vec<&str> = vec!["/", "/tracker", activity.as_str()];

    let probes = probe_routes(&base, &routes, Duration::from_secs(args.timeout))
        .context("failed to build http client")?;

    if json {
        print_json(&probes)?;
    } else {
        for p in &probes {
            let glyph = if p.ok { "✓" } else { "✖" };
            match (p.status, &p.error) {
                (Some(s), _) => println!("{glyph} {} — {s} ({} ms)", p.route, p.duration_ms),
                (None, Some(e)) => println!("{glyph} {} — {e}", p.route),
                (None, None) => println!("{glyph} {}", p.route),
            }
        }
    }

    if args.strict && !all_ok(&probes) {
        std::process::exit(1);
    }
    Ok(())
}
