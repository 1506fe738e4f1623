use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Test,
    Type,
    Style,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::Test, ToolKind::Type, ToolKind::Style];

    /// Name of the tool run for this kind unless configured otherwise.
    pub fn default_program(self) -> &'static str {
        match self {
            ToolKind::Test => "pytest",
            ToolKind::Type => "mypy",
            ToolKind::Style => "ruff",
        }
    }

    /// Noun used for the things this kind produces ("and 5 more failures").
    pub fn issue_noun(self) -> &'static str {
        match self {
            ToolKind::Test => "failures",
            ToolKind::Type | ToolKind::Style => "issues",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolKind::Test => "test",
            ToolKind::Type => "type",
            ToolKind::Style => "style",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// What a single record means for the run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Error,
    Skipped,
    /// A finding that does not fail the run: warning, note, or an output line
    /// the parser could not classify.
    Reported,
}

impl Outcome {
    pub fn tag(self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Failed => "FAILED",
            Outcome::Error => "ERROR",
            Outcome::Skipped => "SKIPPED",
            Outcome::Reported => "NOTE",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(path: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            path: path.into(),
            line,
            column: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
            if let Some(col) = self.column {
                write!(f, ":{col}")?;
            }
        }
        Ok(())
    }
}

/// One normalized test result, type error or lint finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    pub tool: ToolKind,
    pub severity: Severity,
    pub outcome: Outcome,
    pub location: Location,
    /// Test node id or rule code.
    pub identifier: Option<String>,
    pub message: String,
    /// Captured output, traceback or other long text, when the tool gave one.
    pub detail: Option<String>,
    pub collection_error: bool,
    /// Kept verbatim because it did not match the tool's expected format.
    pub low_confidence: bool,
}

impl DiagnosticRecord {
    pub fn new(tool: ToolKind, outcome: Outcome, message: impl Into<String>) -> Self {
        let severity = match outcome {
            Outcome::Failed | Outcome::Error => Severity::Error,
            Outcome::Passed | Outcome::Skipped | Outcome::Reported => Severity::Note,
        };
        Self {
            tool,
            severity,
            outcome,
            location: Location::default(),
            identifier: None,
            message: message.into(),
            detail: None,
            collection_error: false,
            low_confidence: false,
        }
    }

    /// A setup-time failure that prevented the tool from producing results.
    pub fn collection_error(tool: ToolKind, message: impl Into<String>) -> Self {
        let mut rec = Self::new(tool, Outcome::Error, message);
        rec.collection_error = true;
        rec
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_identifier(mut self, id: impl Into<String>) -> Self {
        self.identifier = Some(id.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if !detail.trim().is_empty() {
            self.detail = Some(detail);
        }
        self
    }

    pub fn low_confidence(mut self) -> Self {
        self.low_confidence = true;
        self
    }

    /// Records that deserve a line in the detail section.
    pub fn is_issue(&self) -> bool {
        !self.collection_error
            && matches!(
                self.outcome,
                Outcome::Failed | Outcome::Error | Outcome::Reported
            )
    }
}

/// Counts derived from the record list, never copied from the tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub collected: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub warnings: usize,
}

impl Summary {
    pub fn from_records(records: &[DiagnosticRecord]) -> Self {
        let mut s = Summary::default();
        for r in records {
            if !r.collection_error {
                s.collected += 1;
            }
            match r.outcome {
                Outcome::Passed => s.passed += 1,
                Outcome::Failed => s.failed += 1,
                Outcome::Error => s.errors += 1,
                Outcome::Skipped => s.skipped += 1,
                Outcome::Reported => {}
            }
            if r.severity == Severity::Warning {
                s.warnings += 1;
            }
        }
        s
    }

    pub fn failing(&self) -> usize {
        self.failed + self.errors
    }

    pub fn add(&mut self, other: &Summary) {
        self.collected += other.collected;
        self.passed += other.passed;
        self.failed += other.failed;
        self.errors += other.errors;
        self.skipped += other.skipped;
        self.warnings += other.warnings;
    }
}

/// Counts a tool printed about its own run. Only used to spot disagreements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportedCounts {
    pub passed: Option<usize>,
    pub failed: Option<usize>,
    pub errors: Option<usize>,
    pub skipped: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub tool: ToolKind,
    pub label: String,
    pub summary: Summary,
    pub records: Vec<DiagnosticRecord>,
    /// Source files the tool says it checked.
    pub checked_units: Option<usize>,
    pub reported: Option<ReportedCounts>,
}

impl AnalysisReport {
    pub fn from_records(tool: ToolKind, records: Vec<DiagnosticRecord>) -> Self {
        let summary = Summary::from_records(&records);
        Self {
            tool,
            label: tool.default_program().to_string(),
            summary,
            records,
            checked_units: None,
            reported: None,
        }
    }

    pub fn empty(tool: ToolKind) -> Self {
        Self::from_records(tool, Vec::new())
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_checked_units(mut self, n: Option<usize>) -> Self {
        self.checked_units = n;
        self
    }

    /// Attach what the tool claimed and log every count that disagrees with
    /// the recomputed summary. The recomputed value is kept.
    pub fn with_reported(mut self, reported: ReportedCounts) -> Self {
        let checks = [
            ("passed", reported.passed, self.summary.passed),
            ("failed", reported.failed, self.summary.failed),
            ("errors", reported.errors, self.summary.errors),
            ("skipped", reported.skipped, self.summary.skipped),
        ];
        for (field, claimed, computed) in checks {
            if let Some(claimed) = claimed {
                if claimed != computed {
                    tracing::warn!(
                        target: "qcheck.parser",
                        tool = %self.label,
                        field,
                        claimed,
                        computed,
                        "tool-reported count disagrees with parsed records; using parsed value"
                    );
                }
            }
        }
        self.reported = Some(reported);
        self
    }

    pub fn collection_errors(&self) -> impl Iterator<Item = &DiagnosticRecord> {
        self.records.iter().filter(|r| r.collection_error)
    }

    pub fn has_collection_errors(&self) -> bool {
        self.records.iter().any(|r| r.collection_error)
    }

    pub fn issues(&self) -> impl Iterator<Item = &DiagnosticRecord> {
        self.records.iter().filter(|r| r.is_issue())
    }

    pub fn is_clean(&self) -> bool {
        self.summary.failing() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(outcome: Outcome) -> DiagnosticRecord {
        DiagnosticRecord::new(ToolKind::Test, outcome, "m")
    }

    #[test]
    fn summary_is_recomputed_from_records() {
        let records = vec![
            rec(Outcome::Passed),
            rec(Outcome::Passed),
            rec(Outcome::Failed),
            rec(Outcome::Skipped),
            DiagnosticRecord::collection_error(ToolKind::Test, "boom"),
        ];
        let report = AnalysisReport::from_records(ToolKind::Test, records);
        assert_eq!(report.summary.collected, 4);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.collection_errors().count(), 1);
        assert_eq!(report.issues().count(), 1);
    }

    #[test]
    fn reported_counts_never_override_computed() {
        let report = AnalysisReport::from_records(ToolKind::Test, vec![rec(Outcome::Failed)])
            .with_reported(ReportedCounts {
                failed: Some(7),
                passed: Some(3),
                ..ReportedCounts::default()
            });
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.passed, 0);
        assert_eq!(report.reported.unwrap().failed, Some(7));
    }

    #[test]
    fn warnings_count_by_severity() {
        let records = vec![
            DiagnosticRecord::new(ToolKind::Style, Outcome::Reported, "w")
                .with_severity(Severity::Warning),
            DiagnosticRecord::new(ToolKind::Style, Outcome::Error, "e"),
        ];
        let s = Summary::from_records(&records);
        assert_eq!(s.warnings, 1);
        assert_eq!(s.failing(), 1);
    }

    #[test]
    fn location_display() {
        let mut loc = Location::at("src/a.py", Some(3));
        assert_eq!(loc.to_string(), "src/a.py:3");
        loc.column = Some(7);
        assert_eq!(loc.to_string(), "src/a.py:3:7");
        assert_eq!(Location::new("x.py").to_string(), "x.py");
    }
}
