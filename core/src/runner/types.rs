use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// One subprocess invocation. Built once by the planner and never mutated by
/// the executor.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRequest {
    /// Label used in logs and rendered output (e.g. "pytest").
    pub tool: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Overrides layered on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub timeout_secs: u64,
    /// The caller asked for per-item details, so the tool should be asked to
    /// keep captured output in its report.
    pub detail_capture: bool,
}

impl ExecutionRequest {
    pub fn new(tool: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            detail_capture: false,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_detail_capture(mut self, on: bool) -> Self {
        self.detail_capture = on;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// `program arg1 arg2 ...`, for logs only.
    pub fn display_command(&self) -> String {
        let mut out = self.program.clone();
        for a in &self.args {
            out.push(' ');
            out.push_str(a);
        }
        out
    }
}

/// What came back from one [`ExecutionRequest`].
///
/// When `timed_out` is set the exit code is synthetic and the captured output
/// is whatever had been read before the tree was killed.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
    pub stdout_dropped_bytes: u64,
    pub stderr_dropped_bytes: u64,
    /// The tree-kill primitive was unavailable and only the direct child was
    /// terminated.
    pub tree_kill_degraded: bool,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    /// stdout followed by stderr, skipping whichever is empty.
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }
}
