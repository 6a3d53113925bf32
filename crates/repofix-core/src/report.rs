//! Finding accumulation and report serialization.
//!
//! Findings keep insertion order — no contract beyond "order of detection".

use crate::error::Result;
use crate::io::{atomic_write, ensure_dir};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One detected pattern occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub kind: String,
    /// Path relative to the target repo root, forward slashes.
    pub file: String,
    /// 1-based line, 0 when the finding is file-level.
    pub line: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub snippet: String,
}

#[derive(Debug, Default)]
pub struct Report {
    findings: Vec<Finding>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        kind: &str,
        file: impl Into<String>,
        line: usize,
        message: impl Into<String>,
        snippet: impl Into<String>,
    ) {
        self.findings.push(Finding {
            kind: kind.to_string(),
            file: file.into(),
            line,
            message: message.into(),
            snippet: snippet.into(),
        });
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Finding counts per kind, sorted by kind name.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        let mut by_kind = BTreeMap::new();
        for f in &self.findings {
            *by_kind.entry(f.kind.clone()).or_insert(0) += 1;
        }
        by_kind
    }

    /// Keep only findings whose kind is in `kinds` (empty list keeps all).
    pub fn retain_kinds(&mut self, kinds: &[String]) {
        if kinds.is_empty() {
            return;
        }
        self.findings.retain(|f| kinds.contains(&f.kind));
    }

    // -- Renderers ----------------------------------------------------------

    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Doc<'a> {
            summary: BTreeMap<String, usize>,
            results: &'a [Finding],
        }
        Ok(serde_json::to_string_pretty(&Doc {
            summary: self.summary(),
            results: &self.findings,
        })?)
    }

    pub fn to_text(&self) -> String {
        let mut txt = String::from("—— Scan Summary ——\n");
        for (kind, count) in self.summary() {
            txt.push_str(&format!("{kind:<12}: {count}\n"));
        }
        txt.push_str(&format!("\n—— Findings ({}) ——\n\n", self.findings.len()));
        for f in &self.findings {
            if f.line > 0 {
                txt.push_str(&format!("[{}] {}:{}\n  {}\n", f.kind, f.file, f.line, f.message));
            } else {
                txt.push_str(&format!("[{}] {}\n  {}\n", f.kind, f.file, f.message));
            }
            if !f.snippet.is_empty() {
                txt.push_str(&format!("---\n{}\n---\n", f.snippet));
            }
            txt.push('\n');
        }
        txt
    }

    pub fn to_csv(&self) -> String {
        let mut csv = String::from("kind,file,line,message,snippet\n");
        for f in &self.findings {
            csv.push_str(&format!(
                "{},{},{},{},{}\n",
                csv_cell(&f.kind),
                csv_cell(&f.file),
                f.line,
                csv_cell(&f.message),
                csv_cell(&f.snippet)
            ));
        }
        csv
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Scan report\n\n## Summary\n\n| kind | count |\n|---|---|\n");
        for (kind, count) in self.summary() {
            md.push_str(&format!("| {kind} | {count} |\n"));
        }
        md.push_str("\n## Findings\n\n| kind | file | line | message |\n|---|---|---|---|\n");
        for f in &self.findings {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                f.kind,
                f.file,
                f.line,
                f.message.replace('|', "\\|")
            ));
        }
        md
    }

    /// Write the JSON and text renderings under `dir` with prefix
    /// `<prefix>-<stamp>`. Returns the written paths.
    pub fn write_json_and_text(&self, dir: &Path, prefix: &str, stamp: &str) -> Result<(PathBuf, PathBuf)> {
        ensure_dir(dir)?;
        let json_path = dir.join(format!("{prefix}-{stamp}.json"));
        let txt_path = dir.join(format!("{prefix}-{stamp}.txt"));
        atomic_write(&json_path, self.to_json()?.as_bytes())?;
        atomic_write(&txt_path, self.to_text().as_bytes())?;
        Ok((json_path, txt_path))
    }
}

fn csv_cell(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Report {
        let mut r = Report::new();
        r.add("FOOTGUN", "web/specs/a.spec.tsx", 12, ".it.only() present", "it.only('x')");
        r.add("MARKER", "web/src/page.tsx", 3, "TODO found", "");
        r.add("FOOTGUN", "web/specs/b.spec.tsx", 7, ".describe.only() present", "");
        r
    }

    #[test]
    fn summary_counts_by_kind() {
        let r = sample();
        let s = r.summary();
        assert_eq!(s["FOOTGUN"], 2);
        assert_eq!(s["MARKER"], 1);
    }

    #[test]
    fn insertion_order_preserved() {
        let r = sample();
        let kinds: Vec<&str> = r.findings().iter().map(|f| f.kind.as_str()).collect();
        assert_eq!(kinds, ["FOOTGUN", "MARKER", "FOOTGUN"]);
    }

    #[test]
    fn retain_kinds_filters() {
        let mut r = sample();
        r.retain_kinds(&["MARKER".to_string()]);
        assert_eq!(r.len(), 1);
        let mut all = sample();
        all.retain_kinds(&[]);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn csv_escapes_commas_and_quotes() {
        let mut r = Report::new();
        r.add("SMELL", "a.ts", 1, "bad, \"quoted\"", "");
        let csv = r.to_csv();
        assert!(csv.contains("\"bad, \"\"quoted\"\"\""));
    }

    #[test]
    fn json_round_trips() {
        let r = sample();
        let json = r.to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["summary"]["FOOTGUN"], 2);
        assert_eq!(v["results"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn writes_report_pair() {
        let dir = TempDir::new().unwrap();
        let r = sample();
        let (json, txt) = r
            .write_json_and_text(dir.path(), "scan", "2026-08-27T00-00-00-000Z")
            .unwrap();
        assert!(json.exists());
        assert!(txt.exists());
        let body = std::fs::read_to_string(txt).unwrap();
        assert!(body.contains("—— Scan Summary ——"));
        assert!(body.contains("[FOOTGUN] web/specs/a.spec.tsx:12"));
    }

    #[test]
    fn markdown_has_summary_table() {
        let md = sample().to_markdown();
        assert!(md.contains("| FOOTGUN | 2 |"));
        assert!(md.contains("| web/src/page.tsx | 3 |"));
    }
}
