use serde::{Deserialize, Serialize};

use crate::config::DisplayConfig;

/// Runs with at most this many items are "focused": details are cheap and
/// almost always wanted.
pub const FOCUSED_RUN_THRESHOLD: usize = 3;

pub const DEFAULT_MAX_FAILURES: usize = 10;
pub const DEFAULT_MAX_OUTPUT_LINES: usize = 300;

/// How much the formatter may emit for one report. Passed by value through
/// every call; there is no process-wide default to mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPolicy {
    pub show_details: bool,
    pub max_failures: usize,
    pub max_output_lines: usize,
}

impl Default for DisplayPolicy {
    fn default() -> Self {
        Self {
            show_details: false,
            max_failures: DEFAULT_MAX_FAILURES,
            max_output_lines: DEFAULT_MAX_OUTPUT_LINES,
        }
    }
}

impl DisplayPolicy {
    pub fn from_config(cfg: &DisplayConfig, show_details: bool) -> Self {
        Self {
            show_details,
            max_failures: cfg.max_failures,
            max_output_lines: cfg.max_output_lines,
        }
    }

    pub fn with_details(mut self, show_details: bool) -> Self {
        self.show_details = show_details;
        self
    }
}
