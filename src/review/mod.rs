//! AI-assisted code review of staged changes.

pub mod coordinator;
pub mod filter;
pub mod parse;
pub mod prompt;

use std::fmt;

use serde::Serialize;

pub use coordinator::{ReviewCoordinator, ReviewDecision};
pub use filter::{DEFAULT_REVIEW_EXTENSIONS, filter_diff};
pub use parse::parse_review;
pub use prompt::build_review_prompt;

/// Category of a review finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Smell,
    Bug,
    Style,
    Performance,
    Security,
}

impl FindingKind {
    /// Parse a label as written by a backend (`BUG`, `perf`, `code_smell`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "smell" | "code_smell" | "code-smell" => Some(FindingKind::Smell),
            "bug" => Some(FindingKind::Bug),
            "style" => Some(FindingKind::Style),
            "perf" | "performance" => Some(FindingKind::Performance),
            "security" | "sec" => Some(FindingKind::Security),
            _ => None,
        }
    }

    /// Severity assigned when the backend does not state one.
    pub fn default_severity(self) -> Severity {
        match self {
            FindingKind::Bug | FindingKind::Security => Severity::Error,
            FindingKind::Smell => Severity::Warning,
            FindingKind::Style | FindingKind::Performance => Severity::Info,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FindingKind::Smell => "smell",
            FindingKind::Bug => "bug",
            FindingKind::Style => "style",
            FindingKind::Performance => "performance",
            FindingKind::Security => "security",
        };
        write!(f, "{}", label)
    }
}

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "info" | "low" => Some(Severity::Info),
            "warning" | "warn" | "medium" => Some(Severity::Warning),
            "error" | "high" | "critical" => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewFinding {
    pub kind: FindingKind,
    pub description: String,
    pub suggestion: Option<String>,
    pub severity: Severity,
}

/// Parsed result of one review call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewOutcome {
    pub has_issues: bool,
    pub findings: Vec<ReviewFinding>,
    pub summary: String,
}

impl ReviewOutcome {
    pub fn clean() -> Self {
        Self {
            has_issues: false,
            findings: Vec::new(),
            summary: "Code looks clean.".to_string(),
        }
    }

    pub fn from_findings(findings: Vec<ReviewFinding>) -> Self {
        if findings.is_empty() {
            return Self::clean();
        }
        Self {
            has_issues: true,
            summary: format!("Found {} issue(s)", findings.len()),
            findings,
        }
    }

    /// Highest severity among the findings; `Info` when there are none.
    pub fn max_severity(&self) -> Severity {
        self.findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Info)
    }

    pub fn has_kind(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }

    /// Whether any finding is at or above `threshold`.
    pub fn has_blocking_issues(&self, threshold: Severity) -> bool {
        self.findings.iter().any(|f| f.severity >= threshold)
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_issues {
            return write!(f, "Code review: no issues found.");
        }
        write!(f, "Code review: {}", self.summary)?;
        for finding in &self.findings {
            write!(
                f,
                "\n  [{}/{}] {}",
                finding.kind, finding.severity, finding.description
            )?;
            if let Some(suggestion) = &finding.suggestion {
                write!(f, "\n      suggestion: {}", suggestion)?;
            }
        }
        Ok(())
    }
}
