//! Classification of git's textual error output.
//!
//! git reports "nothing to do" conditions through the same non-zero exit as
//! genuine failures, so the only way to tell them apart is the message text.
//! Every phrase match lives here so the heuristic has exactly one home.

/// What a failed git invocation actually meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsErrorKind {
    /// The commit had no changes to record.
    NothingToCommit,
    /// Another git process holds `index.lock`.
    IndexLocked,
    /// The pathspec matched no file (already processed or removed).
    MissingPath,
    /// The repository has no commits yet, so HEAD cannot be resolved.
    NoHead,
    Other,
}

impl VcsErrorKind {
    /// Outcomes that mean "skip this file" rather than "this file failed".
    pub fn is_benign(self) -> bool {
        matches!(
            self,
            VcsErrorKind::NothingToCommit | VcsErrorKind::IndexLocked | VcsErrorKind::MissingPath
        )
    }
}

/// Classify combined stdout/stderr of a failed git command.
pub fn classify_vcs_error(output: &str) -> VcsErrorKind {
    let lower = output.to_lowercase();

    if lower.contains("nothing to commit")
        || lower.contains("no changes added to commit")
        || lower.contains("nothing added to commit")
    {
        return VcsErrorKind::NothingToCommit;
    }

    if lower.contains("index.lock") || lower.contains("another git process") {
        return VcsErrorKind::IndexLocked;
    }

    if lower.contains("pathspec") && lower.contains("did not match") {
        return VcsErrorKind::MissingPath;
    }

    if lower.contains("ambiguous argument 'head'")
        || lower.contains("bad revision 'head'")
        || lower.contains("does not have any commits yet")
    {
        return VcsErrorKind::NoHead;
    }

    VcsErrorKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_to_commit_phrases() {
        let outputs = [
            "On branch main\nnothing to commit, working tree clean",
            "no changes added to commit (use \"git add\" and/or \"git commit -a\")",
            "nothing added to commit but untracked files present",
        ];
        for output in outputs {
            assert_eq!(
                classify_vcs_error(output),
                VcsErrorKind::NothingToCommit,
                "Failed to classify: {}",
                output
            );
        }
    }

    #[test]
    fn test_index_lock_contention() {
        let output = "fatal: Unable to create '/repo/.git/index.lock': File exists.\n\n\
                      Another git process seems to be running in this repository";
        assert_eq!(classify_vcs_error(output), VcsErrorKind::IndexLocked);
    }

    #[test]
    fn test_missing_pathspec() {
        let output = "fatal: pathspec 'gone.txt' did not match any files";
        assert_eq!(classify_vcs_error(output), VcsErrorKind::MissingPath);
    }

    #[test]
    fn test_unborn_head() {
        let output = "fatal: ambiguous argument 'HEAD': unknown revision or path not in the working tree.";
        assert_eq!(classify_vcs_error(output), VcsErrorKind::NoHead);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(
            classify_vcs_error("NOTHING TO COMMIT"),
            VcsErrorKind::NothingToCommit
        );
    }

    #[test]
    fn test_genuine_failures_are_other() {
        let outputs = [
            "error: gpg failed to sign the data",
            "fatal: not a git repository (or any of the parent directories): .git",
            "",
        ];
        for output in outputs {
            assert_eq!(classify_vcs_error(output), VcsErrorKind::Other);
        }
    }

    #[test]
    fn test_benign_kinds() {
        assert!(VcsErrorKind::NothingToCommit.is_benign());
        assert!(VcsErrorKind::IndexLocked.is_benign());
        assert!(VcsErrorKind::MissingPath.is_benign());
        assert!(!VcsErrorKind::NoHead.is_benign());
        assert!(!VcsErrorKind::Other.is_benign());
    }
}
