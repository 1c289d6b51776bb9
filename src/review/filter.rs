//! Restrict a unified diff to the files worth reviewing.

/// Code extensions reviewed when the project does not configure its own list.
pub const DEFAULT_REVIEW_EXTENSIONS: &[&str] = &[
    ".rs", ".py", ".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs", ".go", ".java", ".kt", ".c", ".h",
    ".cc", ".cpp", ".hpp", ".cs", ".rb", ".php", ".swift", ".scala", ".sh", ".sql", ".vue",
    ".svelte",
];

const FILE_HEADER: &str = "diff --git ";

/// Keep only the `diff --git` blocks whose path ends with one of `extensions`.
///
/// Matching is case-insensitive; extensions may be given with or without the
/// leading dot. Text before the first block header is dropped.
pub fn filter_diff(diff: &str, extensions: &[String]) -> String {
    let extensions: Vec<String> = extensions
        .iter()
        .map(|e| {
            let e = e.trim().to_lowercase();
            if e.starts_with('.') { e } else { format!(".{e}") }
        })
        .collect();

    let mut kept = String::new();
    for block in split_blocks(diff) {
        let Some(path) = block_path(block) else {
            continue;
        };
        let path = path.to_lowercase();
        if extensions.iter().any(|ext| path.ends_with(ext.as_str())) {
            kept.push_str(block);
        }
    }
    kept
}

/// Default extension list as owned strings.
pub fn default_extensions() -> Vec<String> {
    DEFAULT_REVIEW_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn split_blocks(diff: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = diff
        .match_indices(FILE_HEADER)
        .map(|(idx, _)| idx)
        .filter(|&idx| idx == 0 || diff.as_bytes()[idx - 1] == b'\n')
        .collect();
    if starts.is_empty() {
        return Vec::new();
    }
    starts.push(diff.len());
    starts.windows(2).map(|w| &diff[w[0]..w[1]]).collect()
}

/// The post-image path from a `diff --git a/x b/y` header.
fn block_path(block: &str) -> Option<&str> {
    let header = block.lines().next()?;
    let rest = header.strip_prefix(FILE_HEADER)?;
    let idx = rest.rfind(" b/")?;
    Some(&rest[idx + 3..])
}
