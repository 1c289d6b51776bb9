//! Prompt construction for code review.

use crate::llm::prompt::sanitize_diff;

const MAX_DIFF_SANITIZED_LENGTH: usize = 30_000;

const DEFAULT_INSTRUCTIONS: &str = r#"You are reviewing a staged change before it is committed.

Look for:
- Potential bugs or logic errors
- Security concerns (injection, secrets, unsafe input handling)
- Code smells (duplication, long functions, unclear naming)
- Performance issues
- Missing error handling

Only report issues you are confident about. Style preferences are low priority."#;

const OUTPUT_FORMAT: &str = r#"## Output Format
If the change looks fine, respond with exactly:
OK - Code looks clean.

Otherwise respond with either a JSON object:
{"findings": [{"type": "bug", "description": "...", "suggestion": "..."}]}

or one line per issue:
- [TYPE] description | suggestion

where TYPE is one of SMELL, BUG, STYLE, PERF, SECURITY."#;

/// Build the review prompt. `custom_prompt` replaces the default instructions;
/// the output format section is always appended so the response stays parseable.
pub fn build_review_prompt(diff: &str, custom_prompt: Option<&str>) -> String {
    let instructions = custom_prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_INSTRUCTIONS);
    let sanitized_diff = sanitize_diff(diff, MAX_DIFF_SANITIZED_LENGTH);

    format!("{instructions}\n\n## Diff\n```\n{sanitized_diff}\n```\n\n{OUTPUT_FORMAT}")
}
