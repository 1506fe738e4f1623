//! pytest text report (`-rA --tb=short`).
//!
//! Outcomes come from the "short test summary info" section; detail bodies
//! come from the `FAILURES` and `ERRORS` sections and are matched back to
//! records by test name.

use lazy_static::lazy_static;
use regex::Regex;

use crate::report::{AnalysisReport, DiagnosticRecord, Location, Outcome, ReportedCounts, ToolKind};
use crate::runner::ExecutionResult;

use super::fallback;

lazy_static! {
    static ref SECTION_RE: Regex = Regex::new(r"^={3,}\s*(.*?)\s*={3,}$").unwrap();
    static ref ENTRY_RE: Regex = Regex::new(r"^_{3,}\s+(.+?)\s+_{3,}$").unwrap();
    static ref SKIPPED_RE: Regex = Regex::new(r"^SKIPPED \[(\d+)\] (.+?):(\d+): ?(.*)$").unwrap();
    static ref COUNT_RE: Regex = Regex::new(
        r"(\d+) (passed|failed|errors?|skipped|xfailed|xpassed|deselected|warnings?)"
    )
    .unwrap();
    static ref DURATION_RE: Regex = Regex::new(r"\bin \d+(?:\.\d+)?s\b").unwrap();
    static ref TRACE_LINE_RE: Regex = Regex::new(r"^(\S+?\.py):(\d+):").unwrap();
}

const EXIT_OK: i32 = 0;
const EXIT_TESTS_FAILED: i32 = 1;
const EXIT_NO_TESTS: i32 = 5;

/// One `____ title ____` entry, in report order.
struct Body {
    key: String,
    text: String,
    used: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Bodies,
    ShortSummary,
    Other,
}

pub fn parse(result: &ExecutionResult) -> AnalysisReport {
    let kind = ToolKind::Test;
    let mut records: Vec<DiagnosticRecord> = Vec::new();
    let mut bodies: Vec<Body> = Vec::new();
    let mut reported: Option<ReportedCounts> = None;

    let mut section = Section::Preamble;
    let mut entry: Option<(String, Vec<&str>)> = None;

    for line in result.stdout.lines() {
        if let Some(caps) = SECTION_RE.captures(line) {
            flush_entry(&mut entry, &mut bodies);
            let title = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            section = match title {
                "FAILURES" | "ERRORS" => Section::Bodies,
                "short test summary info" => Section::ShortSummary,
                _ => {
                    if let Some(counts) = parse_counts(title) {
                        reported = Some(counts);
                    }
                    Section::Other
                }
            };
            continue;
        }

        match section {
            Section::Bodies => {
                if let Some(caps) = ENTRY_RE.captures(line) {
                    flush_entry(&mut entry, &mut bodies);
                    entry = Some((body_key(&caps[1]), Vec::new()));
                } else if let Some((_, body)) = entry.as_mut() {
                    body.push(line);
                }
            }
            Section::ShortSummary => {
                if !parse_outcome_line(line, &mut records) {
                    if let Some(counts) = parse_counts(line) {
                        reported = Some(counts);
                    }
                }
            }
            Section::Preamble | Section::Other => {
                // `-q` prints the final tally without `=` borders
                if let Some(counts) = parse_counts(line) {
                    reported = Some(counts);
                }
            }
        }
    }
    flush_entry(&mut entry, &mut bodies);

    attach_bodies(&mut records, &mut bodies);

    if records.is_empty() {
        return empty_run(result, reported);
    }

    let mut report = AnalysisReport::from_records(kind, records);
    if result.exit_code == EXIT_TESTS_FAILED
        && report.summary.failing() == 0
        && !result.timed_out
    {
        let mut records = report.records;
        records.push(fallback::unexplained_failure(kind, result));
        report = AnalysisReport::from_records(kind, records);
    }
    match reported {
        Some(counts) => report.with_reported(counts),
        None => report,
    }
}

fn empty_run(result: &ExecutionResult, reported: Option<ReportedCounts>) -> AnalysisReport {
    let kind = ToolKind::Test;
    let blank = result.combined_output().trim().is_empty();
    let report = match result.exit_code {
        _ if result.timed_out => AnalysisReport::empty(kind),
        EXIT_NO_TESTS => AnalysisReport::empty(kind),
        EXIT_OK if blank || reported.is_some() => AnalysisReport::empty(kind),
        2..=4 => AnalysisReport::from_records(kind, vec![fallback::setup_failure(kind, result)]),
        _ if blank => AnalysisReport::empty(kind),
        _ => AnalysisReport::from_records(
            kind,
            vec![fallback::parse_failure(
                kind,
                "no test outcomes found in the report",
                result,
            )],
        ),
    };
    match reported {
        Some(counts) => report.with_reported(counts),
        None => report,
    }
}

fn flush_entry(entry: &mut Option<(String, Vec<&str>)>, bodies: &mut Vec<Body>) {
    let Some((key, lines)) = entry.take() else {
        return;
    };
    let text = lines.join("\n").trim_end().to_string();
    if text.trim().is_empty() {
        return;
    }
    bodies.push(Body {
        key,
        text,
        used: false,
    });
}

/// Key for a `____ title ____` header, comparable with [`record_key`].
fn body_key(title: &str) -> String {
    if let Some(path) = title.strip_prefix("ERROR collecting ") {
        return format!("collect:{}", path.trim());
    }
    for prefix in ["ERROR at setup of ", "ERROR at teardown of ", "ERROR at call of "] {
        if let Some(name) = title.strip_prefix(prefix) {
            return name.trim().to_string();
        }
    }
    title.trim().to_string()
}

/// `tests/a.py::TestX::test_y[1]` -> `TestX.test_y[1]`; bare paths are
/// collection targets.
fn record_key(node: &str) -> String {
    match node.split_once("::") {
        Some((_, rest)) => rest.replace("::", "."),
        None => format!("collect:{node}"),
    }
}

fn parse_outcome_line(line: &str, records: &mut Vec<DiagnosticRecord>) -> bool {
    let kind = ToolKind::Test;

    if let Some(caps) = SKIPPED_RE.captures(line) {
        let n: usize = caps[1].parse().unwrap_or(1);
        let location = Location::at(&caps[2], caps[3].parse().ok());
        for _ in 0..n.max(1) {
            records.push(
                DiagnosticRecord::new(kind, Outcome::Skipped, caps[4].trim())
                    .with_location(location.clone()),
            );
        }
        return true;
    }

    let Some((tag, rest)) = line.split_once(' ') else {
        return false;
    };
    let outcome = match tag {
        "PASSED" | "XPASS" => Outcome::Passed,
        "FAILED" => Outcome::Failed,
        "ERROR" => Outcome::Error,
        "XFAIL" => Outcome::Skipped,
        _ => return false,
    };
    let (node, message) = match rest.split_once(" - ") {
        Some((node, msg)) => (node.trim(), msg.trim()),
        None => (rest.trim(), ""),
    };
    if node.is_empty() {
        return false;
    }
    let path = node.split("::").next().unwrap_or(node);

    let rec = if outcome == Outcome::Error && !node.contains("::") {
        DiagnosticRecord::collection_error(kind, message).with_location(Location::new(path))
    } else {
        DiagnosticRecord::new(kind, outcome, message)
            .with_location(Location::new(path))
            .with_identifier(node)
    };
    records.push(rec);
    true
}

fn attach_bodies(records: &mut [DiagnosticRecord], bodies: &mut [Body]) {
    for rec in records.iter_mut() {
        if !matches!(rec.outcome, Outcome::Failed | Outcome::Error) {
            continue;
        }
        let key = match &rec.identifier {
            Some(node) => record_key(node),
            None => record_key(&rec.location.path),
        };
        let Some(body) = take_body(bodies, &key, &rec.location.path) else {
            continue;
        };
        if rec.location.line.is_none() {
            rec.location.line = failing_line(&body, &rec.location.path);
        }
        if rec.message.is_empty() {
            if let Some(e) = body.lines().rev().find_map(|l| l.strip_prefix("E ")) {
                rec.message = e.trim().to_string();
            }
        }
        rec.detail = Some(body);
    }
}

/// Headers carry only the test name, so same-named tests in different
/// files are told apart by the frames in their bodies. Setup and teardown
/// errors of one test are joined.
fn take_body(bodies: &mut [Body], key: &str, path: &str) -> Option<String> {
    let own = |b: &Body| !b.used && b.key == key && mentions_path(&b.text, path);
    if !bodies.iter().any(own) {
        let first = bodies.iter_mut().find(|b| !b.used && b.key == key)?;
        first.used = true;
        return Some(first.text.clone());
    }
    let mut parts: Vec<String> = Vec::new();
    for b in bodies.iter_mut().filter(|b| own(b)) {
        b.used = true;
        parts.push(b.text.clone());
    }
    Some(parts.join("\n"))
}

fn mentions_path(text: &str, path: &str) -> bool {
    text.lines()
        .filter_map(|l| TRACE_LINE_RE.captures(l))
        .any(|c| &c[1] == path)
}

/// Last `path:line:` frame in the test file itself.
fn failing_line(body: &str, path: &str) -> Option<u32> {
    body.lines()
        .rev()
        .filter_map(|l| TRACE_LINE_RE.captures(l))
        .find(|c| &c[1] == path)
        .and_then(|c| c[2].parse().ok())
}

fn parse_counts(line: &str) -> Option<ReportedCounts> {
    if !DURATION_RE.is_match(line) {
        return None;
    }
    if line.contains("no tests ran") {
        return Some(ReportedCounts {
            passed: Some(0),
            failed: Some(0),
            errors: Some(0),
            skipped: Some(0),
        });
    }
    let mut counts = ReportedCounts::default();
    let mut seen = false;
    for caps in COUNT_RE.captures_iter(line) {
        let n: usize = caps[1].parse().ok()?;
        seen = true;
        let add = |slot: &mut Option<usize>| *slot = Some(slot.unwrap_or(0) + n);
        match &caps[2] {
            "passed" | "xpassed" => add(&mut counts.passed),
            "failed" => add(&mut counts.failed),
            "error" | "errors" => add(&mut counts.errors),
            "skipped" | "xfailed" => add(&mut counts.skipped),
            _ => {}
        }
    }
    if !seen {
        return None;
    }
    // a tally only mentions non-zero outcomes
    for slot in [
        &mut counts.passed,
        &mut counts.failed,
        &mut counts.errors,
        &mut counts.skipped,
    ] {
        slot.get_or_insert(0);
    }
    Some(counts)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::testing::result;

    const MIXED: &str = "\
============================= test session starts ==============================
platform linux -- Python 3.11.4, pytest-7.4.0, pluggy-1.2.0
rootdir: /work/project
collected 4 items

tests/test_math.py .F.s                                                  [100%]

=================================== FAILURES ===================================
__________________________________ test_div ___________________________________
tests/test_math.py:14: in test_div
    assert divide(4, 2) == 3
E   assert 2.0 == 3
E    +  where 2.0 = divide(4, 2)
----------------------------- Captured stdout call -----------------------------
dividing 4 by 2
=========================== short test summary info ============================
PASSED tests/test_math.py::test_add
PASSED tests/test_math.py::test_sub
SKIPPED [1] tests/test_math.py:20: needs gpu
FAILED tests/test_math.py::test_div - assert 2.0 == 3
=================== 1 failed, 2 passed, 1 skipped in 0.05s ====================
";

    #[test]
    fn parses_outcomes_bodies_and_lines() {
        let report = parse(&result(1, MIXED, ""));
        assert_eq!(report.summary.collected, 4);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);

        let failed: Vec<_> = report.issues().collect();
        assert_eq!(failed.len(), 1);
        let f = failed[0];
        assert_eq!(f.identifier.as_deref(), Some("tests/test_math.py::test_div"));
        assert_eq!(f.location.line, Some(14));
        assert_eq!(f.message, "assert 2.0 == 3");
        let detail = f.detail.as_deref().unwrap();
        assert!(detail.contains("dividing 4 by 2"));
        assert!(detail.contains("Captured stdout call"));

        let reported = report.reported.unwrap();
        assert_eq!(reported.failed, Some(1));
        assert_eq!(reported.passed, Some(2));
        assert_eq!(reported.errors, Some(0));
    }

    #[test]
    fn class_methods_and_setup_errors_match_bodies() {
        let out = "\
==================================== ERRORS ====================================
_______________________ ERROR at setup of TestDb.test_q ________________________
tests/test_db.py:8: in conn
    raise RuntimeError(\"no db\")
E   RuntimeError: no db
=========================== short test summary info ============================
ERROR tests/test_db.py::TestDb::test_q - RuntimeError: no db
========================= 1 error in 0.02s =========================
";
        let report = parse(&result(1, out, ""));
        assert_eq!(report.summary.errors, 1);
        assert!(!report.has_collection_errors());
        let rec = report.issues().next().unwrap();
        assert!(rec.detail.as_deref().unwrap().contains("no db"));
        assert_eq!(rec.location.line, Some(8));
    }

    #[test]
    fn same_test_name_in_two_files_keeps_bodies_apart() {
        let out = "\
=================================== FAILURES ===================================
__________________________________ test_load ___________________________________
tests/test_a.py:5: in test_load
    assert load() == 1
E   assert 0 == 1
----------------------------- Captured stdout call -----------------------------
from A
__________________________________ test_load ___________________________________
tests/test_b.py:9: in test_load
    assert load() == 2
E   assert 0 == 2
----------------------------- Captured stdout call -----------------------------
from B
=========================== short test summary info ============================
FAILED tests/test_b.py::test_load - assert 0 == 2
FAILED tests/test_a.py::test_load - assert 0 == 1
========================= 2 failed in 0.03s =========================
";
        let report = parse(&result(1, out, ""));
        let failed: Vec<_> = report.issues().collect();
        assert_eq!(failed.len(), 2);

        let b = failed[0];
        assert_eq!(b.location.path, "tests/test_b.py");
        assert_eq!(b.location.line, Some(9));
        let detail = b.detail.as_deref().unwrap();
        assert!(detail.contains("from B"));
        assert!(!detail.contains("from A"));

        let a = failed[1];
        assert_eq!(a.location.line, Some(5));
        let detail = a.detail.as_deref().unwrap();
        assert!(detail.contains("from A"));
        assert!(!detail.contains("from B"));
    }

    #[test]
    fn setup_and_teardown_errors_join_for_one_test() {
        let out = "\
==================================== ERRORS ====================================
_____________________ ERROR at setup of test_conn ______________________
tests/test_db.py:4: in db
E   RuntimeError: setup broke
_____________________ ERROR at teardown of test_conn ______________________
tests/test_db.py:7: in db
E   RuntimeError: teardown broke
=========================== short test summary info ============================
ERROR tests/test_db.py::test_conn - RuntimeError: setup broke
========================= 1 error in 0.02s =========================
";
        let report = parse(&result(1, out, ""));
        let rec = report.issues().next().unwrap();
        let detail = rec.detail.as_deref().unwrap();
        assert!(detail.contains("setup broke"));
        assert!(detail.contains("teardown broke"));
    }

    #[test]
    fn collection_errors_are_tagged() {
        let out = "\
==================================== ERRORS ====================================
____________________ ERROR collecting tests/test_broken.py _____________________
ImportError while importing test module '/work/tests/test_broken.py'.
E   ModuleNotFoundError: No module named 'foo'
=========================== short test summary info ============================
ERROR tests/test_broken.py
!!!!!!!!!!!!!!!!!!!! Interrupted: 1 error during collection !!!!!!!!!!!!!!!!!!!!
=============================== 1 error in 0.08s ===============================
";
        let report = parse(&result(2, out, ""));
        assert_eq!(report.summary.collected, 0);
        let ce: Vec<_> = report.collection_errors().collect();
        assert_eq!(ce.len(), 1);
        assert_eq!(ce[0].location.path, "tests/test_broken.py");
        assert_eq!(ce[0].message, "ModuleNotFoundError: No module named 'foo'");
        assert!(ce[0].detail.as_deref().unwrap().contains("ImportError"));
    }

    #[test]
    fn no_tests_collected_is_empty() {
        let out = "collected 0 items\n\n============================ no tests ran in 0.01s =============================\n";
        let report = parse(&result(5, out, ""));
        assert_eq!(report.summary.collected, 0);
        assert!(report.records.is_empty());
    }

    #[test]
    fn usage_error_becomes_collection_error() {
        let report = parse(&result(4, "", "ERROR: file or directory not found: tests/nope\n"));
        let ce: Vec<_> = report.collection_errors().collect();
        assert_eq!(ce.len(), 1);
        assert!(ce[0].message.contains("file or directory not found"));
    }

    #[test]
    fn garbage_output_falls_back_to_failure() {
        let report = parse(&result(1, "Traceback (most recent call last):\n  boom\n", ""));
        assert_eq!(report.summary.failed, 1);
        let rec = &report.records[0];
        assert!(rec.message.starts_with("could not parse pytest output"));
        assert!(rec.detail.as_deref().unwrap().contains("boom"));
    }

    #[test]
    fn grouped_skips_expand_to_one_record_each() {
        let out = "\
=========================== short test summary info ============================
SKIPPED [3] tests/test_io.py:5: slow
=========================== 3 skipped in 0.01s ============================
";
        let report = parse(&result(0, out, ""));
        assert_eq!(report.summary.skipped, 3);
        assert_eq!(report.summary.collected, 3);
    }

    #[test]
    fn quiet_tally_is_recognised() {
        let counts = parse_counts("2 failed, 10 passed, 1 warning in 1.23s").unwrap();
        assert_eq!(counts.failed, Some(2));
        assert_eq!(counts.passed, Some(10));
        assert_eq!(counts.skipped, Some(0));
        assert!(parse_counts("collected 12 items").is_none());
    }

    #[test]
    fn failing_exit_without_failures_is_not_clean() {
        let out = "\
=========================== short test summary info ============================
PASSED tests/test_a.py::test_ok
";
        let report = parse(&result(1, out, ""));
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.failed, 1);
        assert!(!report.is_clean());
    }
}
