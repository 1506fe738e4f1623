use serde::Deserialize;

use crate::report::{AnalysisReport, DiagnosticRecord, Location, Outcome, Severity, ToolKind};
use crate::runner::ExecutionResult;

use super::fallback;

/// `ruff check` exits 2 on bad configuration or an internal error.
const EXIT_USAGE: i32 = 2;

#[derive(Debug, Deserialize)]
struct RuffFinding {
    #[serde(default)]
    code: Option<String>,
    message: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    location: Option<RuffPosition>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    fix: Option<RuffFix>,
}

#[derive(Debug, Deserialize)]
struct RuffPosition {
    row: u32,
    column: u32,
}

#[derive(Debug, Deserialize)]
struct RuffFix {
    #[serde(default)]
    message: Option<String>,
}

pub fn parse(result: &ExecutionResult) -> AnalysisReport {
    let kind = ToolKind::Style;
    let raw = result.stdout.trim();

    if raw.is_empty() {
        let records = match result.exit_code {
            0 => Vec::new(),
            _ if result.timed_out => Vec::new(),
            EXIT_USAGE => vec![fallback::setup_failure(kind, result)],
            _ => vec![fallback::parse_failure(kind, "empty JSON output", result)],
        };
        return AnalysisReport::from_records(kind, records);
    }

    let findings: Vec<RuffFinding> = match serde_json::from_str(raw) {
        Ok(f) => f,
        Err(e) => {
            let rec = if result.exit_code == EXIT_USAGE {
                fallback::setup_failure(kind, result)
            } else {
                fallback::parse_failure(kind, &format!("invalid JSON: {e}"), result)
            };
            return AnalysisReport::from_records(kind, vec![rec]);
        }
    };

    // ruff exits 1 for any finding, warnings included
    let mut records: Vec<DiagnosticRecord> = findings.into_iter().map(to_record).collect();
    if !result.timed_out && result.exit_code != 0 && records.is_empty() {
        records.push(fallback::unexplained_failure(kind, result));
    }
    AnalysisReport::from_records(kind, records)
}

fn to_record(f: RuffFinding) -> DiagnosticRecord {
    // pycodestyle warnings (W*) are the only non-failing family
    let warning = f.code.as_deref().is_some_and(|c| c.starts_with('W'));
    let (outcome, severity) = if warning {
        (Outcome::Reported, Severity::Warning)
    } else {
        (Outcome::Error, Severity::Error)
    };

    let mut location = Location::new(f.filename);
    if let Some(pos) = f.location {
        location.line = Some(pos.row);
        location.column = Some(pos.column);
    }

    let mut rec = DiagnosticRecord::new(ToolKind::Style, outcome, f.message)
        .with_severity(severity)
        .with_location(location);
    if let Some(code) = f.code {
        rec = rec.with_identifier(code);
    }
    let detail = match (f.fix.and_then(|x| x.message), f.url) {
        (Some(fix), Some(url)) => Some(format!("fix: {fix}\nsee {url}")),
        (Some(fix), None) => Some(format!("fix: {fix}")),
        (None, Some(url)) => Some(format!("see {url}")),
        (None, None) => None,
    };
    match detail {
        Some(d) => rec.with_detail(d),
        None => rec,
    }
}
