//! Change-set inspection and fast-path classification.
//!
//! Some change sets need no model at all: pure deletions, documentation-only
//! edits, and files the project marks as "no generation". For those the
//! pipeline synthesizes a deterministic message instead of calling a backend.

use std::fmt;

use crate::config::FastPathConfig;
use crate::error::VcsError;
use crate::git::Vcs;

/// Extensions treated as documentation.
const DOC_EXTENSIONS: &[&str] = &[".md", ".mdx"];

/// Above this many files, the synthesized message reports a count instead of names.
const MAX_LISTED_FILES: usize = 3;

/// A snapshot of the index for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// All staged paths, deletions included.
    pub files: Vec<String>,
    /// Staged deletions.
    pub deleted: Vec<String>,
    /// Staged paths that are not deletions.
    pub remaining: Vec<String>,
    pub is_deletion_only: bool,
    pub is_doc_only: bool,
}

/// Which deterministic message a change set qualifies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastPath {
    DeletionOnly,
    Bypass,
    DocOnly,
}

impl fmt::Display for FastPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FastPath::DeletionOnly => write!(f, "deletion-only"),
            FastPath::Bypass => write!(f, "no-generation pattern"),
            FastPath::DocOnly => write!(f, "documentation-only"),
        }
    }
}

impl ChangeSet {
    /// Build the snapshot from the staged and deleted path lists.
    pub fn from_lists(mut files: Vec<String>, mut deleted: Vec<String>) -> Self {
        files.sort();
        files.dedup();
        deleted.sort();
        deleted.dedup();

        let remaining: Vec<String> = files
            .iter()
            .filter(|f| !deleted.contains(f))
            .cloned()
            .collect();

        let is_deletion_only = !deleted.is_empty() && remaining.is_empty();
        let is_doc_only = !remaining.is_empty() && remaining.iter().all(|f| is_doc_path(f));

        Self {
            files,
            deleted,
            remaining,
            is_deletion_only,
            is_doc_only,
        }
    }

    /// Query the index. `paths` narrows the inspection; empty means everything staged.
    pub fn inspect(vcs: &dyn Vcs, paths: &[String]) -> Result<Self, VcsError> {
        let staged = vcs.list_staged(paths)?;
        let deleted = vcs.list_deleted(paths)?;
        Ok(Self::from_lists(staged, deleted))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The fast path this change set takes, if any.
    ///
    /// Deletions win over bypass patterns, which win over documentation.
    pub fn fast_path(&self, config: &FastPathConfig) -> Option<FastPath> {
        if self.is_deletion_only {
            return Some(FastPath::DeletionOnly);
        }
        if is_bypass(
            &self.files,
            &config.no_generation_extensions,
            &config.no_generation_paths,
        ) {
            return Some(FastPath::Bypass);
        }
        if self.is_doc_only {
            return Some(FastPath::DocOnly);
        }
        None
    }

    /// Deterministic message for a fast path.
    pub fn synthesize_message(&self, path: FastPath) -> String {
        match path {
            FastPath::DeletionOnly => describe("chore: remove", &self.deleted),
            FastPath::Bypass => describe("chore: update", &self.files),
            FastPath::DocOnly => describe("docs: update", &self.remaining),
        }
    }
}

/// Whether every file matches a configured extension or path prefix.
///
/// Matching is case-insensitive and treats `\` and `/` alike.
pub fn is_bypass(files: &[String], extensions: &[String], paths: &[String]) -> bool {
    if files.is_empty() || (extensions.is_empty() && paths.is_empty()) {
        return false;
    }

    let extensions: Vec<String> = extensions
        .iter()
        .map(|e| {
            let e = e.trim().to_lowercase();
            if e.starts_with('.') { e } else { format!(".{e}") }
        })
        .collect();
    let prefixes: Vec<String> = paths
        .iter()
        .map(|p| normalize_path(p))
        .filter(|p| !p.is_empty())
        .collect();

    files.iter().all(|file| {
        let file = normalize_path(file);
        extensions.iter().any(|ext| file.ends_with(ext.as_str()))
            || prefixes.iter().any(|prefix| matches_prefix(&file, prefix))
    })
}

/// Lower-case, forward slashes, no leading `./`.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/").to_lowercase();
    while let Some(stripped) = normalized.strip_prefix("./") {
        normalized = stripped.to_string();
    }
    normalized
}

fn matches_prefix(file: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    file == prefix || file.starts_with(&format!("{prefix}/"))
}

fn is_doc_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    DOC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn describe(prefix: &str, files: &[String]) -> String {
    if files.len() > MAX_LISTED_FILES {
        format!("{prefix} {} files", files.len())
    } else {
        format!("{prefix} {}", files.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_deletion_only_requires_no_remaining_files() {
        let set = ChangeSet::from_lists(paths(&["a.txt", "b.txt"]), paths(&["a.txt", "b.txt"]));
        assert!(set.is_deletion_only);

        let mixed = ChangeSet::from_lists(paths(&["a.txt", "b.txt"]), paths(&["a.txt"]));
        assert!(!mixed.is_deletion_only);
        assert_eq!(mixed.remaining, paths(&["b.txt"]));
    }

    #[test]
    fn test_empty_change_set_is_neither_deletion_nor_doc() {
        let set = ChangeSet::from_lists(Vec::new(), Vec::new());
        assert!(set.is_empty());
        assert!(!set.is_deletion_only);
        assert!(!set.is_doc_only);
    }

    #[test]
    fn test_doc_only_ignores_deleted_paths() {
        let set = ChangeSet::from_lists(
            paths(&["README.md", "docs/guide.MDX", "old.rs"]),
            paths(&["old.rs"]),
        );
        assert!(set.is_doc_only);
        assert!(!set.is_deletion_only);
    }

    #[test]
    fn test_three_deletions_are_listed_by_name() {
        let set = ChangeSet::from_lists(
            paths(&["c.txt", "a.txt", "b.txt"]),
            paths(&["b.txt", "c.txt", "a.txt"]),
        );
        let config = FastPathConfig::default();
        let path = set.fast_path(&config).unwrap();
        assert_eq!(path, FastPath::DeletionOnly);
        assert_eq!(set.synthesize_message(path), "chore: remove a.txt, b.txt, c.txt");
    }

    #[test]
    fn test_single_deletion_message() {
        let set = ChangeSet::from_lists(paths(&["old.rs"]), paths(&["old.rs"]));
        assert_eq!(
            set.synthesize_message(FastPath::DeletionOnly),
            "chore: remove old.rs"
        );
    }

    #[test]
    fn test_many_deletions_report_a_count() {
        let files = paths(&["a", "b", "c", "d", "e"]);
        let set = ChangeSet::from_lists(files.clone(), files);
        assert_eq!(
            set.synthesize_message(FastPath::DeletionOnly),
            "chore: remove 5 files"
        );
    }

    #[test]
    fn test_deletion_message_is_deterministic() {
        let first = ChangeSet::from_lists(paths(&["z.rs", "y.rs"]), paths(&["z.rs", "y.rs"]));
        let second = ChangeSet::from_lists(paths(&["y.rs", "z.rs"]), paths(&["y.rs", "z.rs"]));
        assert_eq!(
            first.synthesize_message(FastPath::DeletionOnly),
            second.synthesize_message(FastPath::DeletionOnly)
        );
    }

    #[test]
    fn test_doc_only_message() {
        let set = ChangeSet::from_lists(paths(&["README.md"]), Vec::new());
        let path = set.fast_path(&FastPathConfig::default()).unwrap();
        assert_eq!(path, FastPath::DocOnly);
        assert_eq!(set.synthesize_message(path), "docs: update README.md");
    }

    #[test]
    fn test_code_change_has_no_fast_path() {
        let set = ChangeSet::from_lists(paths(&["src/main.rs", "README.md"]), Vec::new());
        assert_eq!(set.fast_path(&FastPathConfig::default()), None);
    }

    #[test]
    fn test_bypass_by_extension_is_case_insensitive() {
        let files = paths(&["assets/Logo.PNG", "assets/icon.png"]);
        assert!(is_bypass(&files, &paths(&["png"]), &[]));
        assert!(is_bypass(&files, &paths(&[".PNG"]), &[]));
        assert!(!is_bypass(&files, &paths(&[".svg"]), &[]));
    }

    #[test]
    fn test_bypass_by_path_prefix_normalizes_separators() {
        let files = paths(&["vendor\\lib\\a.js", "./vendor/b.js"]);
        assert!(is_bypass(&files, &[], &paths(&["Vendor/"])));
        // "vendored/" must not match the "vendor" prefix
        assert!(!is_bypass(&paths(&["vendored/x.js"]), &[], &paths(&["vendor"])));
    }

    #[test]
    fn test_bypass_requires_every_file_to_match() {
        let files = paths(&["package-lock.json", "src/app.ts"]);
        assert!(!is_bypass(&files, &paths(&["package-lock.json"]), &[]));
    }

    #[test]
    fn test_bypass_without_patterns_is_false() {
        assert!(!is_bypass(&paths(&["a.lock"]), &[], &[]));
    }

    #[test]
    fn test_bypass_wins_over_doc_only() {
        let config = FastPathConfig {
            no_generation_extensions: Vec::new(),
            no_generation_paths: paths(&["docs"]),
        };
        let set = ChangeSet::from_lists(paths(&["docs/a.md"]), Vec::new());
        assert_eq!(set.fast_path(&config), Some(FastPath::Bypass));
        assert_eq!(set.synthesize_message(FastPath::Bypass), "chore: update docs/a.md");
    }
}
