mod format;
mod model;
mod policy;

pub use format::{
    render_report, render_timeout, should_show_details, summary_line, DETAILS_HINT,
};
pub use model::{
    AnalysisReport, DiagnosticRecord, Location, Outcome, ReportedCounts, Severity, Summary,
    ToolKind,
};
pub use policy::{
    DisplayPolicy, DEFAULT_MAX_FAILURES, DEFAULT_MAX_OUTPUT_LINES, FOCUSED_RUN_THRESHOLD,
};
