//! Post-processing and validation of generated commit messages.
//!
//! Backends return free text. Before it can be committed it goes through
//! [`normalize`] (strip reasoning blocks, fences and leading prose, fix
//! escaped newlines, lower-case the description) and then
//! [`CommitMessage::parse`], which enforces the conventional commit grammar.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::MessageError;

/// Commit types accepted in the header.
pub const COMMIT_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "chore", "build", "ci", "revert",
];

/// Minimum description length when the header carries `!`.
pub const MIN_BREAKING_DESCRIPTION: usize = 10;

/// Minimum payload length of a `BREAKING CHANGE:` footer.
pub const MIN_BREAKING_FOOTER: usize = 5;

const BREAKING_FOOTER: &str = "BREAKING CHANGE:";

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^()\r\n]+)\))?(?P<breaking>!)?: (?P<desc>\S.*)$")
        .expect("Invalid header regex")
});

/// Reasoning delimiters some models emit before their answer.
const REASONING_TAGS: &[(&str, &str)] = &[("<think>", "</think>"), ("<thinking>", "</thinking>")];

/// A message that satisfies the conventional commit grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    text: String,
    commit_type: String,
    scope: Option<String>,
    breaking: bool,
}

impl CommitMessage {
    /// Validate already-normalized text.
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MessageError::Empty);
        }

        let header = text.lines().next().unwrap_or_default().trim_end();
        let caps = HEADER_RE
            .captures(header)
            .ok_or_else(|| MessageError::MalformedHeader(header.to_string()))?;

        let commit_type = caps["type"].to_lowercase();
        if !COMMIT_TYPES.contains(&commit_type.as_str()) {
            return Err(MessageError::UnknownType(caps["type"].to_string()));
        }

        let breaking = caps.name("breaking").is_some();
        let description = caps["desc"].trim();
        if breaking && description.chars().count() < MIN_BREAKING_DESCRIPTION {
            return Err(MessageError::BreakingDescriptionTooShort {
                min: MIN_BREAKING_DESCRIPTION,
                actual: description.chars().count(),
            });
        }

        let mut footer_breaking = false;
        for line in text.lines().skip(1) {
            if let Some(payload) = line.trim_start().strip_prefix(BREAKING_FOOTER) {
                let payload = payload.trim();
                if payload.chars().count() < MIN_BREAKING_FOOTER {
                    return Err(MessageError::BreakingFooterTooShort {
                        min: MIN_BREAKING_FOOTER,
                        actual: payload.chars().count(),
                    });
                }
                footer_breaking = true;
            }
        }

        Ok(Self {
            text: text.to_string(),
            commit_type,
            scope: caps.name("scope").map(|m| m.as_str().to_string()),
            breaking: breaking || footer_breaking,
        })
    }

    /// Normalize raw backend output, then validate it.
    pub fn from_generated(raw: &str) -> Result<Self, MessageError> {
        Self::parse(&normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn header(&self) -> &str {
        self.text.lines().next().unwrap_or_default()
    }

    pub fn commit_type(&self) -> &str {
        &self.commit_type
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn is_breaking(&self) -> bool {
        self.breaking
    }
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Clean up raw backend output. Never fails; validation happens afterwards.
pub fn normalize(raw: &str) -> String {
    let text = strip_reasoning(raw);
    let text = strip_code_fences(&text);
    let text = text.replace("\\r\\n", "\n").replace("\\n", "\n");
    let text = drop_leading_prose(&text);

    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }

    let mut result = lines.join("\n");
    if let Some(header) = lines.first() {
        let fixed = lowercase_description(header);
        result.replace_range(..header.len(), &fixed);
    }
    result
}

fn strip_reasoning(raw: &str) -> String {
    let mut text = raw.to_string();
    for (open, close) in REASONING_TAGS {
        while let Some(start) = text.find(open) {
            match text[start..].find(close) {
                Some(rel) => text.replace_range(start..start + rel + close.len(), ""),
                // Unterminated block: everything after the tag is reasoning.
                None => text.truncate(start),
            }
        }
    }
    text
}

fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop everything before the first line that looks like a commit header.
///
/// When no line matches, the text is returned unchanged so the validator can
/// report what the backend actually said.
fn drop_leading_prose(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    match lines.iter().position(|line| is_header_line(line.trim())) {
        Some(idx) => lines[idx..].join("\n"),
        None => text.to_string(),
    }
}

fn is_header_line(line: &str) -> bool {
    HEADER_RE
        .captures(line)
        .is_some_and(|caps| COMMIT_TYPES.contains(&caps["type"].to_lowercase().as_str()))
}

/// Lower-case the first letter of the description.
///
/// Words whose remaining letters are not all lower-case ("API", "README",
/// "GitHub") are kept as proper nouns or acronyms.
fn lowercase_description(header: &str) -> String {
    let Some(caps) = HEADER_RE.captures(header) else {
        return header.to_string();
    };
    let Some(desc) = caps.name("desc") else {
        return header.to_string();
    };

    let first_word = desc.as_str().split_whitespace().next().unwrap_or_default();
    let mut chars = first_word.chars();
    let Some(first) = chars.next() else {
        return header.to_string();
    };
    if !first.is_alphabetic() || !first.is_uppercase() {
        return header.to_string();
    }
    let rest: String = chars.collect();
    if rest.chars().any(|c| c.is_uppercase()) {
        return header.to_string();
    }

    let start = desc.start();
    let mut fixed = String::with_capacity(header.len());
    fixed.push_str(&header[..start]);
    fixed.extend(first.to_lowercase());
    fixed.push_str(&header[start + first.len_utf8()..]);
    fixed
}
