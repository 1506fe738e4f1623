use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::report::{ToolKind, DEFAULT_MAX_FAILURES, DEFAULT_MAX_OUTPUT_LINES};
use crate::runner::DEFAULT_CAPTURE_BYTES;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Working directory for every tool. Unset means the caller's cwd.
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Tools run by a combined check, in section order.
    #[serde(default = "default_run_order")]
    pub run_order: Vec<ToolKind>,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_root: None,
            run_order: default_run_order(),
            executor: ExecutorConfig::default(),
            display: DisplayConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

fn default_run_order() -> Vec<ToolKind> {
    ToolKind::ALL.to_vec()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Per-stream capture limit; beyond it the oldest bytes are dropped.
    #[serde(default = "default_capture_bytes")]
    pub capture_bytes: usize,

    /// How long to wait for a killed tree to be reaped.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,

    /// How long to keep draining pipes after the child is gone.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,
}

fn default_capture_bytes() -> usize {
    DEFAULT_CAPTURE_BYTES
}

fn default_kill_grace_ms() -> u64 {
    2_000
}

fn default_drain_grace_ms() -> u64 {
    2_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            capture_bytes: default_capture_bytes(),
            kill_grace_ms: default_kill_grace_ms(),
            drain_grace_ms: default_drain_grace_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_max_failures")]
    pub max_failures: usize,

    #[serde(default = "default_max_output_lines")]
    pub max_output_lines: usize,

    /// Ask pytest to keep captured output when details are requested.
    #[serde(default = "default_true")]
    pub capture_on_details: bool,
}

fn default_max_failures() -> usize {
    DEFAULT_MAX_FAILURES
}

fn default_max_output_lines() -> usize {
    DEFAULT_MAX_OUTPUT_LINES
}

fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_failures: default_max_failures(),
            max_output_lines: default_max_output_lines(),
            capture_on_details: default_true(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub pytest: ToolConfig,

    #[serde(default)]
    pub mypy: ToolConfig,

    #[serde(default)]
    pub ruff: ToolConfig,
}

impl ToolsConfig {
    pub fn get(&self, kind: ToolKind) -> &ToolConfig {
        match kind {
            ToolKind::Test => &self.pytest,
            ToolKind::Type => &self.mypy,
            ToolKind::Style => &self.ruff,
        }
    }

    pub fn get_mut(&mut self, kind: ToolKind) -> &mut ToolConfig {
        match kind {
            ToolKind::Test => &mut self.pytest,
            ToolKind::Type => &mut self.mypy,
            ToolKind::Style => &mut self.ruff,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable name or path; defaults to the tool's usual name on PATH.
    #[serde(default)]
    pub program: Option<String>,

    /// Inserted before the arguments qcheck adds.
    #[serde(default)]
    pub args: Vec<String>,

    /// Paths checked when the call names none.
    #[serde(default)]
    pub target_dirs: Vec<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ToolConfig {
    pub fn program_or(&self, kind: ToolKind) -> String {
        self.program
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| kind.default_program().to_string())
    }

    pub fn timeout_or(&self, kind: ToolKind) -> u64 {
        self.timeout_secs.unwrap_or_else(|| default_timeout_secs(kind))
    }
}

/// Test suites get the longest budget; the linter the shortest.
pub fn default_timeout_secs(kind: ToolKind) -> u64 {
    match kind {
        ToolKind::Test => 600,
        ToolKind::Type => 180,
        ToolKind::Style => 60,
    }
}
