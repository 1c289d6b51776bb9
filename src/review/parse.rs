//! Parsing of review backend responses into [`ReviewOutcome`].
//!
//! Accepted shapes, tried in order:
//! 1. empty, or starting with `OK` → clean
//! 2. a JSON object with a `findings` array
//! 3. bullet lines `- [BUG] description | suggestion`, optionally after a
//!    `---CODE_REVIEW---` marker
//!
//! Anything else is treated as clean; a review that cannot be understood is
//! never allowed to block a commit on its own.

use serde::Deserialize;
use tracing::debug;

use super::{FindingKind, ReviewFinding, ReviewOutcome, Severity};
use crate::llm::extract_json;

/// Separates a combined commit/review response from the review section.
pub const REVIEW_MARKER: &str = "---CODE_REVIEW---";

/// Descriptions this short are noise.
const MIN_DESCRIPTION_CHARS: usize = 4;

#[derive(Debug, Deserialize)]
struct FindingsEnvelope {
    findings: Vec<RawFinding>,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    #[serde(alias = "type")]
    kind: String,
    description: String,
    #[serde(default)]
    suggestion: Option<String>,
    #[serde(default)]
    severity: Option<String>,
}

pub fn parse_review(response: &str) -> ReviewOutcome {
    let section = match response.split_once(REVIEW_MARKER) {
        Some((_, review)) => review.trim(),
        None => response.trim(),
    };

    if section.is_empty() || is_ok(section) {
        return ReviewOutcome::clean();
    }

    if let Some(findings) = parse_json(section) {
        return ReviewOutcome::from_findings(findings);
    }

    let findings = parse_lines(section);
    if findings.is_empty() {
        debug!("Review response had no recognisable findings, treating as clean");
    }
    ReviewOutcome::from_findings(findings)
}

fn is_ok(section: &str) -> bool {
    match section.to_uppercase().strip_prefix("OK") {
        // "OKAY, but..." is not a verdict
        Some(rest) => rest.chars().next().is_none_or(|c| !c.is_alphanumeric()),
        None => false,
    }
}

fn parse_json(section: &str) -> Option<Vec<ReviewFinding>> {
    if !section.contains('{') {
        return None;
    }
    let json = extract_json(section);
    let envelope: FindingsEnvelope = match serde_json::from_str(&json) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!("Review response is not a findings object: {}", e);
            return None;
        }
    };

    Some(
        envelope
            .findings
            .into_iter()
            .filter_map(|raw| {
                let kind = FindingKind::from_label(&raw.kind).unwrap_or(FindingKind::Smell);
                let severity = raw
                    .severity
                    .as_deref()
                    .and_then(Severity::from_label)
                    .unwrap_or_else(|| kind.default_severity());
                finding(kind, raw.description.trim(), raw.suggestion.as_deref(), severity)
            })
            .collect(),
    )
}

fn parse_lines(section: &str) -> Vec<ReviewFinding> {
    section
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let line = line.strip_prefix('-').or_else(|| line.strip_prefix('*'))?.trim();
            let rest = line.strip_prefix('[')?;
            let (label, body) = rest.split_once(']')?;
            let kind = FindingKind::from_label(label)?;

            let (description, suggestion) = match body.split_once('|') {
                Some((d, s)) => (d.trim(), Some(s)),
                None => (body.trim(), None),
            };
            finding(kind, description, suggestion, kind.default_severity())
        })
        .collect()
}

fn finding(
    kind: FindingKind,
    description: &str,
    suggestion: Option<&str>,
    severity: Severity,
) -> Option<ReviewFinding> {
    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        return None;
    }
    Some(ReviewFinding {
        kind,
        description: description.to_string(),
        suggestion: suggestion
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        severity,
    })
}
