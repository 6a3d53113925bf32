//! GitHub REST calls used by `ci finalize`: branch protection on main.

use crate::error::{RepofixError, Result};
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Resolve the token from the environment, `GH_TOKEN` first.
pub fn token_from_env() -> Result<String> {
    std::env::var("GH_TOKEN")
        .or_else(|_| std::env::var("GITHUB_TOKEN"))
        .map_err(|_| RepofixError::MissingToken)
}

#[derive(Debug, Clone)]
pub struct ProtectionRequest {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Status check contexts required before merge, e.g. `["ci"]`.
    pub contexts: Vec<String>,
}

/// PUT the branch protection ruleset. `api_base` is the API origin,
/// overridable for tests.
pub fn protect_branch(api_base: &str, token: &str, req: &ProtectionRequest) -> Result<()> {
    let url = format!(
        "{}/repos/{}/{}/branches/{}/protection",
        api_base.trim_end_matches('/'),
        req.owner,
        req.repo,
        req.branch
    );
    let body = json!({
        "required_status_checks": {
            "strict": false,
            "contexts": req.contexts,
        },
        "enforce_admins": true,
        "required_pull_request_reviews": {
            "required_approving_review_count": 1,
        },
        "restrictions": null,
    });

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let resp = client
        .put(&url)
        .header("Accept", "application/vnd.github+json")
        .header("Authorization", format!("Bearer {token}"))
        .header("User-Agent", "repofix")
        .json(&body)
        .send()?;

    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let detail = resp.text().unwrap_or_default();
    Err(RepofixError::GithubApi(format!(
        "{} {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        detail.trim()
    )))
}
