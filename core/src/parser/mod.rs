//! Turns raw tool output into an [`AnalysisReport`].
//!
//! Parsers never fail: output they cannot understand becomes a synthetic
//! failing record carrying the tail of the raw text.

mod fallback;
mod mypy;
mod pytest;
mod ruff;

pub use fallback::{tail_lines, FALLBACK_TAIL_LINES};

use crate::report::{AnalysisReport, ToolKind};
use crate::runner::ExecutionResult;

pub fn parse(result: &ExecutionResult, kind: ToolKind) -> AnalysisReport {
    match kind {
        ToolKind::Test => pytest::parse(result),
        ToolKind::Type => mypy::parse(result),
        ToolKind::Style => ruff::parse(result),
    }
}
