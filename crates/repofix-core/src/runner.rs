//! Subprocess execution and test-output parsing.
//!
//! A non-zero exit code is a data point, not an abort: matrix runs record
//! it and continue to the next variant. Only a failure to spawn at all is
//! surfaced as an error.

use crate::error::{RepofixError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::Duration;

/// Captured result of one shell invocation.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.code == 0 && !self.timed_out
    }

    /// stdout and stderr joined, for summary parsing and log files.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Run `command` through `sh -c` in `cwd`, capturing both streams.
///
/// Uses dedicated reader threads (avoiding pipe-buffer deadlocks) and a
/// waiter thread with `mpsc::recv_timeout` when a timeout is given. On
/// timeout the child is killed by PID and the output marked `timed_out`.
pub fn run_shell(command: &str, cwd: &Path, timeout: Option<Duration>) -> Result<RunOutput> {
    run_shell_with_env(command, cwd, timeout, &[])
}

/// Like [`run_shell`] but with extra environment variables.
pub fn run_shell_with_env(
    command: &str,
    cwd: &Path,
    timeout: Option<Duration>,
    env: &[(&str, &str)],
) -> Result<RunOutput> {
    let start = std::time::Instant::now();
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (k, v) in env {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().map_err(|e| RepofixError::SpawnFailed {
        command: command.to_string(),
        source: e,
    })?;

    let child_pid = child.id();
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> String {
        let mut buf = String::new();
        if let Some(mut r) = stdout_handle {
            use std::io::Read;
            let _ = r.read_to_string(&mut buf);
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || -> String {
        let mut buf = String::new();
        if let Some(mut r) = stderr_handle {
            use std::io::Read;
            let _ = r.read_to_string(&mut buf);
        }
        buf
    });

    let wait_result = match timeout {
        None => child.wait().map(Some),
        Some(timeout_dur) => {
            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(child.wait());
            });
            match rx.recv_timeout(timeout_dur) {
                Ok(result) => result.map(Some),
                Err(_) => {
                    // Timeout — kill by PID; reader threads see EOF and finish.
                    kill_process(child_pid);
                    Ok(None)
                }
            }
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();
    let duration_ms = start.elapsed().as_millis() as u64;

    match wait_result {
        Ok(Some(status)) => Ok(RunOutput {
            code: status.code().unwrap_or(1),
            stdout,
            stderr,
            duration_ms,
            timed_out: false,
        }),
        Ok(None) => Ok(RunOutput {
            code: 124,
            stdout,
            stderr,
            duration_ms,
            timed_out: true,
        }),
        Err(e) => Err(RepofixError::Io(e)),
    }
}

/// Terminate a process by PID using SIGKILL. Best-effort.
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// First output line that smells like an error, for quick console hints.
pub fn first_error_hint(output: &str) -> Option<&str> {
    let re = error_line_re();
    output.lines().find(|l| re.is_match(l)).map(str::trim)
}

fn error_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)error|failed|cannot|not found|referenceerror|typeerror").unwrap()
    })
}

// ---------------------------------------------------------------------------
// Vitest summary parsing
// ---------------------------------------------------------------------------

/// Counts scraped from a vitest run's human-readable summary.
///
/// `None` fields mean the line was never printed (e.g. the runner crashed
/// before the summary).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub files_passed: Option<u32>,
    pub files_failed: Option<u32>,
    pub files_total: Option<u32>,
    pub tests_passed: Option<u32>,
    pub tests_failed: Option<u32>,
    pub tests_total: Option<u32>,
    pub duration_ms: Option<u64>,
}

impl TestSummary {
    /// True when at least one totals line was found.
    pub fn has_totals(&self) -> bool {
        self.files_total.is_some() || self.tests_total.is_some()
    }
}

fn files_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "Test Files  38 passed (39)" / "Test Files  1 failed (39)"
    RE.get_or_init(|| {
        Regex::new(r"Test Files\s+(\d+)\s+(passed|failed)\s+\((\d+)\)").unwrap()
    })
}

fn tests_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "Tests  39 passed (40)" — anchored to avoid matching "Test Files".
    RE.get_or_init(|| Regex::new(r"(?m)^\s*Tests\s+(\d+)\s+(passed|failed)\s+\((\d+)\)").unwrap())
}

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Duration\s+([\d.]+)s").unwrap())
}

/// Best-effort parse of a vitest textual summary.
pub fn parse_test_summary(text: &str) -> TestSummary {
    let mut s = TestSummary::default();
    for caps in files_re().captures_iter(text) {
        let n: u32 = caps[1].parse().unwrap_or(0);
        let total: u32 = caps[3].parse().unwrap_or(0);
        s.files_total = Some(total);
        match &caps[2] {
            "passed" => s.files_passed = Some(n),
            _ => s.files_failed = Some(n),
        }
    }
    for caps in tests_re().captures_iter(text) {
        let n: u32 = caps[1].parse().unwrap_or(0);
        let total: u32 = caps[3].parse().unwrap_or(0);
        s.tests_total = Some(total);
        match &caps[2] {
            "passed" => s.tests_passed = Some(n),
            _ => s.tests_failed = Some(n),
        }
    }
    if let Some(caps) = duration_re().captures(text) {
        if let Ok(secs) = caps[1].parse::<f64>() {
            s.duration_ms = Some((secs * 1000.0).round() as u64);
        }
    }
    // Derive the missing failed count from the totals.
    if s.files_failed.is_none() {
        if let (Some(total), Some(passed)) = (s.files_total, s.files_passed) {
            s.files_failed = Some(total.saturating_sub(passed));
        }
    }
    if s.tests_failed.is_none() {
        if let (Some(total), Some(passed)) = (s.tests_total, s.tests_passed) {
            s.tests_failed = Some(total.saturating_sub(passed));
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_shell_captures_stdout() {
        let out = run_shell("echo hello", Path::new("/tmp"), None).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn run_shell_captures_stderr_and_code() {
        let out = run_shell("echo oops >&2; exit 3", Path::new("/tmp"), None).unwrap();
        assert_eq!(out.code, 3);
        assert!(!out.success());
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn run_shell_times_out() {
        let out = run_shell(
            "sleep 60",
            Path::new("/tmp"),
            Some(Duration::from_millis(150)),
        )
        .unwrap();
        assert!(out.timed_out);
        assert!(!out.success());
    }

    #[test]
    fn run_shell_env_passes_through() {
        let out = run_shell_with_env(
            "printf '%s' \"$NODE_OPTIONS\"",
            Path::new("/tmp"),
            None,
            &[("NODE_OPTIONS", "--max-old-space-size=6144")],
        )
        .unwrap();
        assert_eq!(out.stdout, "--max-old-space-size=6144");
    }

    #[test]
    fn parse_passed_summary() {
        let text = "\n Test Files  38 passed (39)\n      Tests  39 passed (40)\n   Duration  156.34s\n";
        let s = parse_test_summary(text);
        assert_eq!(s.files_passed, Some(38));
        assert_eq!(s.files_total, Some(39));
        assert_eq!(s.files_failed, Some(1));
        assert_eq!(s.tests_passed, Some(39));
        assert_eq!(s.tests_total, Some(40));
        assert_eq!(s.tests_failed, Some(1));
        assert_eq!(s.duration_ms, Some(156_340));
    }

    #[test]
    fn parse_failed_summary() {
        let text = " Test Files  2 failed (5)\n      Tests  7 failed (30)\n";
        let s = parse_test_summary(text);
        assert_eq!(s.files_failed, Some(2));
        assert_eq!(s.files_total, Some(5));
        assert_eq!(s.tests_failed, Some(7));
        assert_eq!(s.tests_total, Some(30));
        assert!(s.has_totals());
    }

    #[test]
    fn parse_empty_output() {
        let s = parse_test_summary("vitest exploded before printing anything");
        assert!(!s.has_totals());
        assert_eq!(s, TestSummary::default());
    }

    #[test]
    fn error_hint_finds_first_match() {
        let out = "all good\nReferenceError: React is not defined\nmore noise";
        assert_eq!(
            first_error_hint(out),
            Some("ReferenceError: React is not defined")
        );
        assert!(first_error_hint("clean output").is_none());
    }
}
