use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use repofix_core::recipes::ci::{finalize, CiOptions};
use repofix_core::github::{protect_branch, token_from_env, ProtectionRequest, DEFAULT_API_BASE};
use repofix_core::{git, RepofixError};
use std::path::Path;

#[derive(Subcommand)]
pub enum CiSubcommand {
    /// Normalize .gitattributes and .gitignore, add the README badge, and
    /// require the CI status check on the protected branch
    Finalize {
        /// Write changes (default is a dry run)
        #[arg(long)]
        apply: bool,

        /// Don't commit the touched files
        #[arg(long)]
        no_commit: bool,

        /// Skip the GitHub branch-protection call
        #[arg(long)]
        no_api: bool,

        /// GitHub owner (default: parsed from remote.origin.url)
        #[arg(long)]
        owner: Option<String>,

        /// GitHub repo (default: parsed from remote.origin.url)
        #[arg(long)]
        repo: Option<String>,

        /// Protected branch
        #[arg(long, default_value = "main")]
        branch: String,

        /// Required status check context
        #[arg(long, default_value = "ci")]
        check: String,
    },
}

pub fn run(root: &Path, sub: CiSubcommand, json: bool) -> anyhow::Result<()> {
    let CiSubcommand::Finalize {
        apply,
        no_commit,
        no_api,
        owner,
        repo,
        branch,
        check,
    } = sub;

    let opts = CiOptions {
        dry_run: !apply,
        commit: !no_commit,
    };
    let report = finalize(root, &opts).context("ci finalize failed")?;

    let mut protected = false;
    if !no_api && apply {
        let (owner, repo) = match (owner, repo) {
            (Some(o), Some(r)) => (o, r),
            _ => git::origin_owner_repo(root).ok_or(RepofixError::UnknownOrigin)?,
        };
        let token = token_from_env()?;
        let req = ProtectionRequest {
            owner,
            repo,
            branch: branch.clone(),
            contexts: vec![check],
        };
        protect_branch(DEFAULT_API_BASE, &token, &req)
            .with_context(|| format!("failed to protect branch {branch}"))?;
        protected = true;
    }

    if json {
        return print_json(&serde_json::json!({
            "dry_run": !apply,
            "actions": report.actions,
            "changed": report.changed_paths,
            "committed": report.committed,
            "protected": protected,
        }));
    }

    let prefix = if apply { "" } else { "[dry] " };
    for action in &report.actions {
        println!("{prefix}{action}");
    }
    if report.committed {
        println!("committed {} file(s)", report.changed_paths.len());
    }
    if protected {
        println!("branch protection set on {branch}");
    } else if !no_api && !apply {
        println!("{prefix}would set branch protection on {branch}");
    }
    Ok(())
}
