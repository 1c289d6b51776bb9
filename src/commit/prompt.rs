//! Prompt construction for commit message generation.

use crate::llm::prompt::sanitize_diff;

/// Maximum length for sanitized diff text.
const MAX_DIFF_SANITIZED_LENGTH: usize = 30_000;

/// Build the prompt asking a backend for one conventional commit message.
///
/// `language` is the natural language of the description and body; the
/// type and scope stay in English so the grammar check applies regardless.
pub fn build_commit_prompt(diff: &str, language: &str) -> String {
    let sanitized_diff = sanitize_diff(diff, MAX_DIFF_SANITIZED_LENGTH);

    format!(
        r#"You are generating a Git commit message following the Conventional Commits specification.

## Diff
```
{sanitized_diff}
```

## Header Rules (STRICT)
- Format: `type(scope): description` or `type: description`
- Type: one of feat, fix, docs, style, refactor, perf, test, chore, build, ci, revert
- Scope: optional; the module or area affected, in lowercase
- Add `!` after the type/scope only for incompatible changes, and then describe the change in at least 10 characters
- Description: imperative mood, lowercase first letter unless it is a proper noun or acronym, no period at the end
- Exactly one space after the colon

## Body Rules
- Optional. Separate from the header with one blank line.
- Explain why the change was made; the diff already shows what changed.
- Wrap lines at 72 characters.
- For incompatible changes add a footer `BREAKING CHANGE: <what breaks>`.

## Language
Write the description and body in: {language}

## Output Format
Respond with ONLY the commit message. No markdown, no code fences, no explanation."#
    )
}
