//! Version-control adapter.
//!
//! The core only ever talks to git through the [`Vcs`] trait: list and diff
//! the index, stage or unstage one path, and commit. [`GitCli`] is the real
//! implementation; tests substitute in-memory fakes.

pub mod classify;
pub mod cli;

use std::path::PathBuf;

pub use classify::{VcsErrorKind, classify_vcs_error};
pub use cli::GitCli;

use crate::error::VcsError;

/// Parameters for a commit.
#[derive(Debug, Clone, Copy)]
pub struct CommitRequest<'a> {
    pub message: &'a str,
    /// When non-empty, only these paths are committed (`git commit --only`),
    /// leaving anything else in the index untouched.
    pub pathspec: &'a [String],
    /// Passed through to `git commit --date`.
    pub date: Option<&'a str>,
}

/// The staged-changes / commit / reset primitives the pipeline relies on.
///
/// Path-list arguments are pathspecs; an empty slice means the whole index.
pub trait Vcs {
    /// Files with pending changes under `path` (modified, staged, untracked),
    /// sorted and deduplicated.
    fn list_changed(&self, path: &str) -> Result<Vec<String>, VcsError>;

    /// Whether `file` has any pending change, staged or not.
    fn has_pending_changes(&self, file: &str) -> Result<bool, VcsError>;

    fn list_staged(&self, paths: &[String]) -> Result<Vec<String>, VcsError>;

    /// Staged paths whose change is a deletion.
    fn list_deleted(&self, paths: &[String]) -> Result<Vec<String>, VcsError>;

    fn diff_staged(&self, paths: &[String]) -> Result<String, VcsError>;

    fn stage(&self, path: &str) -> Result<(), VcsError>;

    fn unstage(&self, path: &str) -> Result<(), VcsError>;

    /// Create a commit and return git's one-line summary of it.
    fn commit(&self, request: &CommitRequest<'_>) -> Result<String, VcsError>;

    /// The repository's private metadata directory (`.git`).
    fn git_dir(&self) -> Result<PathBuf, VcsError>;
}
