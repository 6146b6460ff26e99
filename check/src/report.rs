//! Analyzer report parsing.
//!
//! Two report shapes are recognised. A report starting with `Error:` means
//! the analyzer itself failed (bad config, crash) and becomes a single
//! error covering the whole document. Anything else is scanned line by
//! line for entries of the form
//!
//! ```text
//!   3:10  error  Missing semicolon  semi
//! ```
//!
//! and lines that do not match (file headers, summaries, blanks) are
//! skipped.

use std::sync::LazyLock;

use regex::Regex;

use flint_types::{Diagnostic, Document, Severity};

/// Prefix the analyzer uses when it fails before checking anything.
const TOOL_FAILURE_PREFIX: &str = "Error:";

/// `row:col  severity  message  rule`. The message may contain single
/// spaces, so the rule is split off by a run of two or more.
static REPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<row>\d+):(?P<col>\d+)\s+(?P<severity>error|warning)\s+(?P<message>.+?)\s{2,}(?P<rule>\S+)$",
    )
    .expect("valid report line regex")
});

/// One matched report line, before position resolution.
#[derive(Debug, PartialEq, Eq)]
struct RawReportLine<'a> {
    row: usize,
    col: usize,
    severity: &'a str,
    message: &'a str,
    rule: &'a str,
}

impl<'a> RawReportLine<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let caps = REPORT_LINE.captures(line)?;
        Some(Self {
            row: caps.name("row")?.as_str().parse().ok()?,
            col: caps.name("col")?.as_str().parse().ok()?,
            severity: caps.name("severity")?.as_str(),
            message: caps.name("message")?.as_str(),
            rule: caps.name("rule")?.as_str(),
        })
    }

    fn into_diagnostic(self, document: &Document) -> Diagnostic {
        let region = document.token_region(self.row, self.col);
        let end = region.end.min(document.len());
        let severity = Severity::from_keyword(self.severity);
        Diagnostic::new(
            severity,
            region.start..end,
            format!("{}: {} [{}]", severity.label(), self.message, self.rule),
            Some(self.rule.to_string()),
        )
    }
}

/// Parse a captured report against the document it was produced for.
///
/// Diagnostics come back in report order.
#[must_use]
pub fn parse_report(report: &str, document: &Document) -> Vec<Diagnostic> {
    if report.starts_with(TOOL_FAILURE_PREFIX) {
        let first_line = report.lines().next().unwrap_or(report);
        return vec![Diagnostic::new(
            Severity::Error,
            0..document.len(),
            first_line.to_string(),
            None,
        )];
    }

    report
        .lines()
        .filter_map(|line| {
            let parsed = RawReportLine::parse(line);
            if parsed.is_none() && !line.trim().is_empty() {
                tracing::trace!(line, "Skipping unrecognised report line");
            }
            parsed
        })
        .map(|raw| raw.into_diagnostic(document))
        .collect()
}
