use lazy_static::lazy_static;
use regex::Regex;

use crate::report::{
    AnalysisReport, DiagnosticRecord, Location, Outcome, ReportedCounts, Severity, ToolKind,
};
use crate::runner::ExecutionResult;

use super::fallback;

lazy_static! {
    static ref DIAG_RE: Regex = Regex::new(
        r"^(?P<path>(?:[A-Za-z]:)?[^:]+):(?:(?P<line>\d+):(?:(?P<col>\d+):)?)? (?P<sev>error|warning|note): (?P<msg>.*?)(?:\s+\[(?P<code>[\w-]+)\])?$"
    )
    .unwrap();
    static ref FOUND_RE: Regex = Regex::new(
        r"^Found (\d+) errors? in (\d+) files?(?: \(checked (\d+) source files?\))?"
    )
    .unwrap();
    static ref SUCCESS_RE: Regex =
        Regex::new(r"^Success: no issues found in (\d+) source files?").unwrap();
}

/// mypy fails with 2 on a crash or bad invocation.
const EXIT_USAGE: i32 = 2;

pub fn parse(result: &ExecutionResult) -> AnalysisReport {
    let kind = ToolKind::Type;
    let mut records: Vec<DiagnosticRecord> = Vec::new();
    let mut checked: Option<usize> = None;
    let mut reported_errors: Option<usize> = None;

    for line in result.stdout.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if let Some(caps) = FOUND_RE.captures(line) {
            reported_errors = caps[1].parse().ok();
            // blocking errors replace the suffix with "(errors prevented further checking)"
            checked = caps.get(3).and_then(|m| m.as_str().parse().ok());
            continue;
        }
        if let Some(caps) = SUCCESS_RE.captures(line) {
            reported_errors = Some(0);
            checked = caps[1].parse().ok();
            continue;
        }
        if let Some(caps) = DIAG_RE.captures(line) {
            let sev = &caps["sev"];
            // notes continue the diagnostic above them
            if sev == "note" {
                if let Some(prev) = records.last_mut().filter(|r| r.outcome == Outcome::Error) {
                    let body = match prev.detail.take() {
                        Some(d) => format!("{d}\n{}", &caps["msg"]),
                        None => caps["msg"].to_string(),
                    };
                    prev.detail = Some(body);
                    continue;
                }
            }
            let (outcome, severity) = match sev {
                "error" => (Outcome::Error, Severity::Error),
                "warning" => (Outcome::Reported, Severity::Warning),
                _ => (Outcome::Reported, Severity::Note),
            };
            let mut location = Location::at(&caps["path"], int(caps.name("line")));
            location.column = int(caps.name("col"));
            let mut rec = DiagnosticRecord::new(kind, outcome, &caps["msg"])
                .with_severity(severity)
                .with_location(location);
            if let Some(code) = caps.name("code") {
                rec = rec.with_identifier(code.as_str());
            }
            records.push(rec);
            continue;
        }
        // source excerpts and carets under a diagnostic
        if line.starts_with(' ') {
            if let Some(prev) = records.last_mut().filter(|r| !r.low_confidence) {
                let body = match prev.detail.take() {
                    Some(d) => format!("{d}\n{line}"),
                    None => line.to_string(),
                };
                prev.detail = Some(body);
                continue;
            }
        }
        records.push(
            DiagnosticRecord::new(kind, Outcome::Reported, line.trim())
                .with_severity(Severity::Note)
                .low_confidence(),
        );
    }

    let failing = records.iter().filter(|r| r.outcome == Outcome::Error).count();
    if !result.timed_out && result.exit_code != 0 && failing == 0 {
        let extra = if result.exit_code == EXIT_USAGE {
            fallback::setup_failure(kind, result)
        } else {
            fallback::unexplained_failure(kind, result)
        };
        records.push(extra);
    }

    let report = AnalysisReport::from_records(kind, records).with_checked_units(checked);
    match reported_errors {
        Some(n) => report.with_reported(ReportedCounts {
            errors: Some(n),
            ..ReportedCounts::default()
        }),
        None => report,
    }
}

fn int(m: Option<regex::Match<'_>>) -> Option<u32> {
    m.and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::testing::result;

    #[test]
    fn parses_errors_with_codes_and_columns() {
        let out = "\
src/app/models.py:12:5: error: Incompatible return value type (got \"int\", expected \"str\")  [return-value]
src/app/views.py:40: error: Name \"reqest\" is not defined  [name-defined]
src/app/views.py:40: note: Did you mean \"request\"?
Found 2 errors in 2 files (checked 14 source files)
";
        let report = parse(&result(1, out, ""));
        assert_eq!(report.summary.errors, 2);
        assert_eq!(report.checked_units, Some(14));
        assert_eq!(report.reported.unwrap().errors, Some(2));

        let first = &report.records[0];
        assert_eq!(first.location.to_string(), "src/app/models.py:12:5");
        assert_eq!(first.identifier.as_deref(), Some("return-value"));
        assert_eq!(
            first.message,
            "Incompatible return value type (got \"int\", expected \"str\")"
        );

        let second = &report.records[1];
        assert_eq!(second.detail.as_deref(), Some("Did you mean \"request\"?"));
    }

    #[test]
    fn blocking_error_tally_is_recognised() {
        let out = "\
pkg/a.py:1: error: invalid syntax  [syntax]
Found 1 error in 1 file (errors prevented further checking)
";
        let report = parse(&result(2, out, ""));
        assert_eq!(report.records.len(), 1);
        assert!(!report.records[0].low_confidence);
        assert_eq!(report.records[0].identifier.as_deref(), Some("syntax"));
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.checked_units, None);
        assert_eq!(report.reported.unwrap().errors, Some(1));
    }

    #[test]
    fn success_line_sets_checked_units() {
        let report = parse(&result(0, "Success: no issues found in 7 source files\n", ""));
        assert!(report.records.is_empty());
        assert!(report.is_clean());
        assert_eq!(report.checked_units, Some(7));
    }

    #[test]
    fn unknown_lines_are_kept_with_low_confidence() {
        let out = "mypy: some unexpected banner\nSuccess: no issues found in 1 source file\n";
        let report = parse(&result(0, out, ""));
        assert_eq!(report.records.len(), 1);
        assert!(report.records[0].low_confidence);
        assert!(report.is_clean());
    }

    #[test]
    fn crash_becomes_collection_error() {
        let report = parse(&result(2, "", "mypy: can't read file 'nope': No such file or directory\n"));
        let ce: Vec<_> = report.collection_errors().collect();
        assert_eq!(ce.len(), 1);
        assert!(ce[0].message.contains("can't read file"));
        assert!(!report.is_clean());
    }

    #[test]
    fn windows_drive_paths() {
        let report = parse(&result(1, "C:\\src\\a.py:3: error: Bad  [misc]\n", ""));
        assert_eq!(report.records[0].location.path, "C:\\src\\a.py");
        assert_eq!(report.records[0].location.line, Some(3));
    }
}
