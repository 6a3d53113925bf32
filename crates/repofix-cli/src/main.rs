mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{ci::CiSubcommand, fix::FixSubcommand, matrix::MatrixSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "repofix",
    about = "Patch, scan, and repair the CareerOS monorepo — idempotent source fixes with backups",
    version,
    propagate_version = true
)]
struct Cli {
    /// Target repo root (default: auto-detect from pnpm-workspace.yaml or .git/)
    #[arg(long, global = true, env = "REPOFIX_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the tree for test-hygiene problems and footguns
    Scan {
        /// Only scan files changed since this git ref
        #[arg(long)]
        since: Option<String>,
    },

    /// Find stub markers, bandaid casts, and placeholder spec files
    Stubs(cmd::stubs::StubsArgs),

    /// Apply an idempotent source patch
    Fix {
        #[command(subcommand)]
        subcommand: FixSubcommand,
    },

    /// CI housekeeping (.gitattributes, .gitignore, badge, branch protection)
    Ci {
        #[command(subcommand)]
        subcommand: CiSubcommand,
    },

    /// Vitest setup/config matrix runs and leaderboards
    Matrix {
        #[command(subcommand)]
        subcommand: MatrixSubcommand,
    },

    /// Read-only wiring diagnostics
    Doctor,

    /// Probe dev-server routes
    Smoke(cmd::smoke::SmokeArgs),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Scan { since } => cmd::scan::run(&root, since.as_deref(), cli.json),
        Commands::Stubs(args) => cmd::stubs::run(&root, &args, cli.json),
        Commands::Fix { subcommand } => cmd::fix::run(&root, subcommand, cli.json),
        Commands::Ci { subcommand } => cmd::ci::run(&root, subcommand, cli.json),
        Commands::Matrix { subcommand } => cmd::matrix::run(&root, subcommand, cli.json),
        Commands::Doctor => cmd::doctor::run(&root, cli.json),
        Commands::Smoke(args) => cmd::smoke::run(&args, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
