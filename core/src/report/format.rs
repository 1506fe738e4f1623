//! Bounded rendering of an [`AnalysisReport`] for an LLM caller.
//!
//! Output is a list of lines joined with `\n`. Every collection error keeps
//! its header line; bodies and everything else are bounded by the
//! [`DisplayPolicy`]. The function is pure, so the same report and policy
//! always give the same bytes.

use super::model::{AnalysisReport, DiagnosticRecord, Severity, ToolKind};
use super::policy::{DisplayPolicy, FOCUSED_RUN_THRESHOLD};

const INDENT: &str = "    ";

pub const DETAILS_HINT: &str =
    "Hint: re-run with show_details=true to see each result with its captured output.";

/// Whether per-item detail bodies (captured output, tracebacks) are worth
/// their cost for this report.
pub fn should_show_details(report: &AnalysisReport, policy: &DisplayPolicy) -> bool {
    if !policy.show_details {
        return false;
    }
    if report.summary.collected <= FOCUSED_RUN_THRESHOLD {
        return true;
    }
    report.summary.failing() <= policy.max_failures
}

pub fn render_report(report: &AnalysisReport, policy: &DisplayPolicy) -> String {
    let mut lines: Vec<String> = Vec::new();

    if report.summary.collected == 0 && !report.has_collection_errors() {
        lines.push(nothing_to_report_line(report));
        return lines.join("\n");
    }

    lines.push(summary_line(report));
    push_collection_errors(&mut lines, report, policy.max_output_lines);

    if policy.show_details {
        // Too many failures for full bodies still gets the bounded one-line
        // listing, so the caller can see which items failed.
        let with_bodies = should_show_details(report, policy);
        push_entries(&mut lines, report, policy, with_bodies);
    } else if (1..=FOCUSED_RUN_THRESHOLD).contains(&report.summary.collected)
        && lines.len() < policy.max_output_lines
    {
        lines.push(DETAILS_HINT.to_string());
    }

    lines.join("\n")
}

/// Rendering for a run that hit its timeout. Whatever collection errors could
/// be recovered from the partial output are still shown.
pub fn render_timeout(report: &AnalysisReport, timeout_secs: u64, policy: &DisplayPolicy) -> String {
    let mut lines = vec![format!(
        "{}: analysis timed out after {}s",
        report.label, timeout_secs
    )];
    push_collection_errors(&mut lines, report, policy.max_output_lines);
    if lines.len() < policy.max_output_lines {
        lines.push(
            "Partial output was discarded; narrow the selection or raise the timeout.".to_string(),
        );
    }
    lines.join("\n")
}

pub fn summary_line(report: &AnalysisReport) -> String {
    let s = &report.summary;
    let status = if report.has_collection_errors() {
        "ERROR"
    } else if s.failing() > 0 {
        "FAILED"
    } else {
        "PASSED"
    };
    match report.tool {
        ToolKind::Test => format!(
            "{}: {} | {} collected, {} passed, {} failed, {} errors, {} skipped",
            report.label, status, s.collected, s.passed, s.failed, s.errors, s.skipped
        ),
        ToolKind::Type | ToolKind::Style => {
            let mut line = format!(
                "{}: {} | {} findings, {} errors, {} warnings",
                report.label,
                status,
                s.collected,
                s.failing(),
                s.warnings
            );
            if let Some(n) = report.checked_units {
                line.push_str(&format!(" (checked {n} files)"));
            }
            line
        }
    }
}

fn nothing_to_report_line(report: &AnalysisReport) -> String {
    match (report.tool, report.checked_units) {
        (ToolKind::Test, _) => format!("{}: no tests collected, nothing to report.", report.label),
        (_, Some(n)) => format!(
            "{}: no issues found in {} files, nothing to report.",
            report.label, n
        ),
        (_, None) => format!("{}: no issues found, nothing to report.", report.label),
    }
}

/// Headers are never dropped. Bodies get what the line budget has left once
/// the remaining headers and one trailing line are set aside.
fn push_collection_errors(lines: &mut Vec<String>, report: &AnalysisReport, max_lines: usize) {
    let errors: Vec<&DiagnosticRecord> = report.collection_errors().collect();
    for (i, rec) in errors.iter().enumerate() {
        let mut head = String::from("COLLECTION ERROR");
        if !rec.location.is_empty() {
            head.push(' ');
            head.push_str(&rec.location.to_string());
        }
        head.push_str(": ");
        head.push_str(first_line(&rec.message));
        lines.push(head);

        let Some(detail) = &rec.detail else {
            continue;
        };
        let body: Vec<String> = body_lines(detail).collect();
        let headers_after = errors.len() - i - 1;
        let room = max_lines.saturating_sub(lines.len() + headers_after + 1);
        if body.len() <= room {
            lines.extend(body);
        } else if room > 0 {
            let shown = room - 1;
            let hidden = body.len() - shown;
            lines.extend(body.into_iter().take(shown));
            lines.push(format!("{INDENT}[... {hidden} more lines]"));
        }
    }
}

fn push_entries(
    lines: &mut Vec<String>,
    report: &AnalysisReport,
    policy: &DisplayPolicy,
    with_bodies: bool,
) {
    let issues: Vec<&DiagnosticRecord> = report.issues().collect();
    if issues.is_empty() {
        return;
    }

    // One line stays in reserve for the truncation marker or remainder line.
    let budget = policy.max_output_lines.saturating_sub(1);
    let mut heads = 0usize;
    let mut truncated = false;

    'entries: for (i, rec) in issues.iter().take(policy.max_failures).enumerate() {
        let mut entry = vec![entry_head(i + 1, rec)];
        if with_bodies {
            if let Some(detail) = &rec.detail {
                entry.extend(body_lines(detail));
            }
        }
        for (j, line) in entry.into_iter().enumerate() {
            if lines.len() >= budget {
                truncated = true;
                break 'entries;
            }
            if j == 0 {
                heads += 1;
            }
            lines.push(line);
        }
    }

    let noun = report.tool.issue_noun();
    let remaining = issues.len() - heads;
    if truncated {
        if remaining > 0 {
            lines.push(format!(
                "[output truncated at {} lines: {} more {} not shown]",
                policy.max_output_lines, remaining, noun
            ));
        } else {
            lines.push(format!(
                "[output truncated at {} lines]",
                policy.max_output_lines
            ));
        }
    } else if remaining > 0 {
        lines.push(format!("... and {remaining} more {noun}"));
    }
}

fn entry_head(idx: usize, rec: &DiagnosticRecord) -> String {
    let mut head = format!("{idx}. {}", entry_tag(rec));
    match (rec.tool, &rec.identifier) {
        (ToolKind::Test, Some(node)) => {
            head.push(' ');
            head.push_str(node);
            if let Some(line) = rec.location.line {
                head.push_str(&format!(" (line {line})"));
            }
        }
        (_, ident) => {
            if !rec.location.is_empty() {
                head.push(' ');
                head.push_str(&rec.location.to_string());
            }
            if let Some(code) = ident {
                head.push_str(&format!(" [{code}]"));
            }
        }
    }
    let msg = first_line(&rec.message);
    if !msg.is_empty() {
        head.push_str(": ");
        head.push_str(msg);
    }
    head
}

fn entry_tag(rec: &DiagnosticRecord) -> &'static str {
    if rec.low_confidence {
        return "UNPARSED";
    }
    match rec.tool {
        ToolKind::Test => rec.outcome.tag(),
        ToolKind::Type | ToolKind::Style => match rec.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        },
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("").trim()
}

fn body_lines(detail: &str) -> impl Iterator<Item = String> + '_ {
    detail
        .trim_end()
        .lines()
        .map(|l| format!("{INDENT}{}", l.trim_end()))
}
