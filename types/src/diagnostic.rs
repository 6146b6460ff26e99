use std::ops::Range;

use serde::Serialize;

/// Severity of a reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Map an analyzer's severity keyword. Only `warning` is a warning;
    /// everything else is treated as an error.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Self {
        if keyword == "warning" {
            Self::Warning
        } else {
            Self::Error
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// One issue anchored to a byte range of the checked document.
///
/// Fields are private; external consumers read via accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    start: usize,
    end: usize,
    severity: Severity,
    message: String,
    /// Analyzer rule that produced the issue (e.g. "no-unused-vars").
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
}

impl Diagnostic {
    /// An `end` before `start` collapses to an empty range at `start`.
    #[must_use]
    pub fn new(
        severity: Severity,
        range: Range<usize>,
        message: String,
        rule: Option<String>,
    ) -> Self {
        Self {
            start: range.start,
            end: range.end.max(range.start),
            severity,
            message,
            rule,
        }
    }

    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        self.rule.as_deref()
    }
}
