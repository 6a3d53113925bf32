//! Optional `repofix.yaml` at the target repo root.
//!
//! Everything has a default; a missing file is equivalent to an empty one.

use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Extra directory names to skip during walks, merged with the built-ins.
    #[serde(default)]
    pub ignore_dirs: Vec<String>,

    /// Override for the reports directory (relative to root).
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,

    /// Override for the matrix run-log directory (relative to root).
    #[serde(default = "default_test_logs_dir")]
    pub test_logs_dir: String,

    /// `stubs` exits 2 when findings exceed this count (None = only with --fail-on-find).
    #[serde(default)]
    pub stub_threshold: Option<usize>,

    /// Command used by `matrix run` to execute the web test suite.
    #[serde(default = "default_test_command")]
    pub test_command: String,
}

fn default_reports_dir() -> String {
    paths::REPORTS_DIR.to_string()
}

fn default_test_logs_dir() -> String {
    paths::TEST_LOGS_DIR.to_string()
}

fn default_test_command() -> String {
    "pnpm -w vitest run --config web/vitest.config.ts".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_dirs: Vec::new(),
            reports_dir: default_reports_dir(),
            test_logs_dir: default_test_logs_dir(),
            stub_threshold: None,
            test_command: default_test_command(),
        }
    }
}

impl Config {
    /// Load `repofix.yaml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// All directory names to skip during walks.
    pub fn ignore_dirs(&self) -> Vec<&str> {
        let mut dirs: Vec<&str> = paths::IGNORE_DIRS.to_vec();
        dirs.extend(self.ignore_dirs.iter().map(|s| s.as_str()));
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.reports_dir, "tools/reports");
        assert!(cfg.stub_threshold.is_none());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("repofix.yaml"),
            "ignore_dirs: [storybook-static]\nstub_threshold: 5\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.stub_threshold, Some(5));
        assert!(cfg.ignore_dirs().contains(&"storybook-static"));
        assert!(cfg.ignore_dirs().contains(&"node_modules"));
        assert_eq!(cfg.test_logs_dir, "tools/test-logs");
    }
}
