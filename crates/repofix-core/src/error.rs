use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepofixError {
    #[error("not a git repository: {0}")]
    NotARepo(PathBuf),

    #[error("worktree has uncommitted changes: commit, stash, or pass --force")]
    DirtyWorktree,

    #[error("failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("prisma schema not found at {0}")]
    SchemaNotFound(PathBuf),

    #[error("no matrix runs found under {0}")]
    NoMatrixRuns(PathBuf),

    #[error("matrix run is missing {0}")]
    MissingRunArtifact(PathBuf),

    #[error("github api error: {0}")]
    GithubApi(String),

    #[error("GH_TOKEN or GITHUB_TOKEN must be set for branch protection")]
    MissingToken,

    #[error("could not determine github owner/repo: pass --owner and --repo")]
    UnknownOrigin,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, RepofixError>;
