//! Text sanitizers applied to repository content before it is embedded in a prompt.
//!
//! Diffs are untrusted input: a changed line can contain terminal escapes or
//! text addressed to the model. These helpers neutralise both without losing
//! the information a reviewer needs.

/// Phrases that try to override the instructions around them.
const INJECTION_PATTERNS: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous instructions",
    "ignore the above",
    "disregard previous instructions",
    "disregard the above",
    "forget your instructions",
    "new instructions:",
    "system prompt:",
    "you are now",
];

const FILTERED: &str = "[filtered]";

/// Maximum run of consecutive blank lines kept.
const MAX_BLANK_LINES: usize = 2;

/// Drop control characters other than newline and tab.
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\n' || c == '\t' || c == '\x1b' || !c.is_control())
        .collect()
}

/// Strip ANSI CSI sequences (`ESC [ ... final`) and lone escapes.
pub fn remove_ansi_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            // Parameters and intermediates, then one final byte in @..~
            for next in chars.by_ref() {
                if ('@'..='~').contains(&next) {
                    break;
                }
            }
        }
    }
    out
}

/// Replace known instruction-override phrases, case-insensitively.
pub fn filter_injection_patterns(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in INJECTION_PATTERNS {
        loop {
            let lower = result.to_lowercase();
            // Lower-casing can change byte lengths outside ASCII; only replace
            // when the offsets still line up with the original.
            let Some(idx) = lower.find(pattern) else {
                break;
            };
            let end = idx + pattern.len();
            if lower.len() != result.len()
                || !result.is_char_boundary(idx)
                || !result.is_char_boundary(end)
            {
                break;
            }
            result.replace_range(idx..end, FILTERED);
        }
    }
    result
}

/// Collapse long runs of blank lines and trailing spaces.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = Vec::new();
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > MAX_BLANK_LINES {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }
    out.join("\n")
}

/// Run every sanitizer and cap the result at `max_len` bytes.
pub fn sanitize_diff(text: &str, max_len: usize) -> String {
    let result = remove_control_chars(text);
    let result = remove_ansi_escapes(&result);
    let result = filter_injection_patterns(&result);
    let mut result = normalize_whitespace(&result);

    if result.len() > max_len {
        let mut end = max_len;
        while end > 0 && !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
    }
    result
}
