use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LaunchError;
use crate::report::{
    render_report, render_timeout, AnalysisReport, DisplayPolicy, Summary, ToolKind,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCheckArgs {
    /// pytest `-m` expression.
    pub markers: Option<String>,
    /// Number of `-v` flags.
    pub verbosity: u8,
    pub extra_args: Vec<String>,
    pub env_vars: BTreeMap<String, String>,
    pub show_details: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeCheckArgs {
    pub strict: bool,
    pub disabled_codes: Vec<String>,
    /// Overrides the configured targets when non-empty.
    pub target_dirs: Vec<String>,
    pub show_details: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleCheckArgs {
    pub target_dirs: Vec<String>,
    pub show_details: bool,
}

/// Arguments for a combined run. `show_details` applies to every section and
/// replaces the per-tool flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllChecksArgs {
    pub test: TestCheckArgs,
    pub types: TypeCheckArgs,
    pub style: StyleCheckArgs,
    pub show_details: bool,
}

/// A parsed run, before rendering.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub report: AnalysisReport,
    pub timed_out: bool,
    pub timeout_secs: u64,
    pub exit_code: i32,
}

impl CheckOutcome {
    pub fn render(&self, policy: &DisplayPolicy) -> String {
        if self.timed_out {
            render_timeout(&self.report, self.timeout_secs, policy)
        } else {
            render_report(&self.report, policy)
        }
    }

    /// Nothing failed and the tool finished on its own.
    pub fn is_clean(&self) -> bool {
        !self.timed_out && self.report.is_clean()
    }
}

/// Per-tool results of a combined run, in configured order.
#[derive(Debug)]
pub struct AllChecksOutcome {
    pub sections: Vec<(ToolKind, Result<CheckOutcome, LaunchError>)>,
}

impl AllChecksOutcome {
    pub fn render(&self, policy: &DisplayPolicy) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.sections.len() + 1);
        let mut total = Summary::default();
        let mut timed_out = 0usize;
        let mut not_run = 0usize;

        for (kind, section) in &self.sections {
            match section {
                Ok(outcome) => {
                    total.add(&outcome.report.summary);
                    if outcome.timed_out {
                        timed_out += 1;
                    }
                    parts.push(outcome.render(policy));
                }
                Err(e) => {
                    not_run += 1;
                    parts.push(format!(
                        "{}: {e} ({})",
                        kind.default_program(),
                        e.hint()
                    ));
                }
            }
        }

        let mut aggregate = format!(
            "Total: {} checked, {} passed, {} failed, {} errors, {} skipped, {} warnings",
            total.collected, total.passed, total.failed, total.errors, total.skipped, total.warnings
        );
        if timed_out > 0 {
            aggregate.push_str(&format!(", {timed_out} timed out"));
        }
        if not_run > 0 {
            aggregate.push_str(&format!(", {not_run} not run"));
        }
        parts.push(aggregate);
        parts.join("\n\n")
    }

    pub fn is_clean(&self) -> bool {
        self.sections
            .iter()
            .all(|(_, s)| s.as_ref().is_ok_and(CheckOutcome::is_clean))
    }

    pub fn has_launch_errors(&self) -> bool {
        self.sections.iter().any(|(_, s)| s.is_err())
    }
}
