use crate::report::{DiagnosticRecord, Outcome, ToolKind};
use crate::runner::ExecutionResult;

/// How much raw output a synthetic record carries.
pub const FALLBACK_TAIL_LINES: usize = 40;

pub fn tail_lines(s: &str, n: usize) -> String {
    let lines: Vec<&str> = s.trim_end().lines().collect();
    let start = lines.len().saturating_sub(n);
    let mut out = String::new();
    if start > 0 {
        out.push_str(&format!("[... {start} earlier lines omitted]\n"));
    }
    out.push_str(&lines[start..].join("\n"));
    out
}

/// Stand-in for output that could not be understood. Always counts as a
/// failure so an unreadable run is never reported as clean.
pub fn parse_failure(kind: ToolKind, reason: &str, result: &ExecutionResult) -> DiagnosticRecord {
    tracing::warn!(
        target: "qcheck.parser",
        tool = kind.default_program(),
        exit_code = result.exit_code,
        reason,
        "parse fallback triggered"
    );
    DiagnosticRecord::new(
        kind,
        Outcome::Failed,
        format!("could not parse {} output: {reason}", kind.default_program()),
    )
    .with_identifier("parse-error")
    .with_detail(tail_lines(&result.combined_output(), FALLBACK_TAIL_LINES))
}

/// The tool stopped before it could examine anything (usage error, bad
/// config, crash during startup).
pub fn setup_failure(kind: ToolKind, result: &ExecutionResult) -> DiagnosticRecord {
    let raw = result.combined_output();
    let headline = raw
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output");
    DiagnosticRecord::collection_error(
        kind,
        format!(
            "{} exited with code {} before producing results: {headline}",
            kind.default_program(),
            result.exit_code
        ),
    )
    .with_detail(tail_lines(&raw, FALLBACK_TAIL_LINES))
}

/// The tool signalled failure but no failing record was recovered.
pub fn unexplained_failure(kind: ToolKind, result: &ExecutionResult) -> DiagnosticRecord {
    parse_failure(
        kind,
        &format!(
            "exit code {} but no failing results were recognised",
            result.exit_code
        ),
        result,
    )
}
