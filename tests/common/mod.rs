//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use git2::{IndexAddOption, Repository, Signature};

use scrivener::error::{GenerationError, OperatorError, VcsError};
use scrivener::git::CommitRequest;
use scrivener::{Backend, Operator, ReviewAction, ReviewOutcome, Vcs};

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory, with an
    /// identity configured so the git binary can commit.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
            config.set_bool("commit.gpgsign", false).unwrap();
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.dir.path().join(rel)).expect("Failed to remove file");
    }

    /// Stage everything in the working tree and commit it with libgit2.
    pub fn commit_all(&self, message: &str) {
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let mut index = self.repo.index().expect("Failed to get index");
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .expect("Failed to add files");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit");
    }

    /// Subjects of every commit reachable from HEAD, newest first.
    pub fn log_subjects(&self) -> Vec<String> {
        let mut walk = self.repo.revwalk().expect("Failed to create revwalk");
        walk.push_head().expect("Failed to push HEAD");
        walk.map(|oid| {
            let commit = self.repo.find_commit(oid.unwrap()).unwrap();
            commit.summary().unwrap_or_default().to_string()
        })
        .collect()
    }

    /// Paths touched by the HEAD commit.
    pub fn head_files(&self) -> Vec<String> {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        let tree = head.tree().unwrap();
        let parent_tree = head.parent(0).ok().map(|p| p.tree().unwrap());
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .unwrap();
        diff.deltas()
            .filter_map(|d| {
                d.new_file()
                    .path()
                    .or_else(|| d.old_file().path())
                    .map(|p| p.to_string_lossy().to_string())
            })
            .collect()
    }

    pub fn git_dir(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    /// Run the git binary in the repository, panicking on failure.
    pub fn git(&self, args: &[&str]) {
        let output = std::process::Command::new("git")
            .arg("-C")
            .arg(self.dir.path())
            .args(args)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// In-memory index: `pending` are working-tree changes, `staged` is the index.
#[derive(Default)]
pub struct MemoryVcs {
    pub pending: Mutex<BTreeSet<String>>,
    pub staged: Mutex<BTreeSet<String>>,
    pub deleted: BTreeSet<String>,
    pub diffs: BTreeMap<String, String>,
    pub commits: Mutex<Vec<(String, Vec<String>)>>,
    /// Files whose commit fails with this git output.
    pub commit_failures: BTreeMap<String, String>,
    /// Files whose `git add` fails with this git output.
    pub stage_failures: BTreeMap<String, String>,
    /// Files that `git add` accepts without anything reaching the index.
    pub unstageable: BTreeSet<String>,
    /// Staged files that disappear from the index after this many reads,
    /// as if another process committed them.
    pub vanish_after: Mutex<BTreeMap<String, usize>>,
    pub git_dir: PathBuf,
    pub diff_reads: AtomicUsize,
}

impl MemoryVcs {
    pub fn new(git_dir: &Path) -> Self {
        Self {
            git_dir: git_dir.to_path_buf(),
            ..Default::default()
        }
    }

    /// A pending change to `file` whose staged diff will be `diff`.
    pub fn with_change(mut self, file: &str, diff: &str) -> Self {
        self.pending.lock().unwrap().insert(file.to_string());
        self.diffs.insert(file.to_string(), diff.to_string());
        self
    }

    pub fn with_deletion(mut self, file: &str) -> Self {
        self.deleted.insert(file.to_string());
        self.with_change(file, "")
    }

    /// Put `file` straight into the index.
    pub fn staged_now(self, file: &str) -> Self {
        self.staged.lock().unwrap().insert(file.to_string());
        self
    }

    pub fn with_commit_failure(mut self, file: &str, output: &str) -> Self {
        self.commit_failures
            .insert(file.to_string(), output.to_string());
        self
    }

    pub fn with_stage_failure(mut self, file: &str, output: &str) -> Self {
        self.stage_failures
            .insert(file.to_string(), output.to_string());
        self
    }

    pub fn with_unstageable(mut self, file: &str) -> Self {
        self.unstageable.insert(file.to_string());
        self
    }

    pub fn with_vanishing_stage(self, file: &str, reads: usize) -> Self {
        self.vanish_after
            .lock()
            .unwrap()
            .insert(file.to_string(), reads);
        self
    }

    pub fn staged_files(&self) -> Vec<String> {
        self.staged.lock().unwrap().iter().cloned().collect()
    }

    pub fn committed(&self) -> Vec<(String, Vec<String>)> {
        self.commits.lock().unwrap().clone()
    }

    fn in_scope(&self, file: &str, paths: &[String]) -> bool {
        paths.is_empty() || paths.iter().any(|p| p == file)
    }
}

impl Vcs for MemoryVcs {
    fn list_changed(&self, _path: &str) -> Result<Vec<String>, VcsError> {
        let mut files: BTreeSet<String> = self.pending.lock().unwrap().clone();
        files.extend(self.staged.lock().unwrap().iter().cloned());
        Ok(files.into_iter().collect())
    }

    fn has_pending_changes(&self, file: &str) -> Result<bool, VcsError> {
        Ok(self.pending.lock().unwrap().contains(file) || self.staged.lock().unwrap().contains(file))
    }

    fn list_staged(&self, paths: &[String]) -> Result<Vec<String>, VcsError> {
        {
            let mut vanish = self.vanish_after.lock().unwrap();
            let mut staged = self.staged.lock().unwrap();
            for (file, reads) in vanish.iter_mut() {
                if !staged.contains(file) || !self.in_scope(file, paths) {
                    continue;
                }
                if *reads == 0 {
                    staged.remove(file);
                    self.pending.lock().unwrap().remove(file);
                } else {
                    *reads -= 1;
                }
            }
        }
        Ok(self
            .staged
            .lock()
            .unwrap()
            .iter()
            .filter(|f| self.in_scope(f, paths))
            .cloned()
            .collect())
    }

    fn list_deleted(&self, paths: &[String]) -> Result<Vec<String>, VcsError> {
        Ok(self
            .list_staged(paths)?
            .into_iter()
            .filter(|f| self.deleted.contains(f))
            .collect())
    }

    fn diff_staged(&self, paths: &[String]) -> Result<String, VcsError> {
        self.diff_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .list_staged(paths)?
            .iter()
            .filter_map(|f| self.diffs.get(f).cloned())
            .collect::<Vec<_>>()
            .join(""))
    }

    fn stage(&self, path: &str) -> Result<(), VcsError> {
        if let Some(output) = self.stage_failures.get(path) {
            return Err(VcsError::CommandFailed {
                operation: "add".to_string(),
                output: output.clone(),
            });
        }
        if self.unstageable.contains(path) {
            return Ok(());
        }
        if self.pending.lock().unwrap().remove(path) {
            self.staged.lock().unwrap().insert(path.to_string());
        }
        Ok(())
    }

    fn unstage(&self, path: &str) -> Result<(), VcsError> {
        if self.staged.lock().unwrap().remove(path) {
            self.pending.lock().unwrap().insert(path.to_string());
        }
        Ok(())
    }

    fn commit(&self, request: &CommitRequest<'_>) -> Result<String, VcsError> {
        let files = self.list_staged(request.pathspec)?;
        if let Some(output) = files.iter().find_map(|f| self.commit_failures.get(f)) {
            return Err(VcsError::CommandFailed {
                operation: "commit".to_string(),
                output: output.clone(),
            });
        }
        if files.is_empty() {
            return Err(VcsError::CommandFailed {
                operation: "commit".to_string(),
                output: "nothing to commit, working tree clean".to_string(),
            });
        }

        let mut staged = self.staged.lock().unwrap();
        for f in &files {
            staged.remove(f);
        }
        let subject = request.message.lines().next().unwrap_or_default().to_string();
        self.commits
            .lock()
            .unwrap()
            .push((request.message.to_string(), files));
        Ok(format!("abc1234 {}", subject))
    }

    fn git_dir(&self) -> Result<PathBuf, VcsError> {
        Ok(self.git_dir.clone())
    }
}

/// Backend returning canned text and counting calls.
pub struct FakeBackend {
    pub name: String,
    pub message: Result<String, String>,
    pub review: String,
    pub message_calls: AtomicUsize,
    pub review_calls: AtomicUsize,
    /// Diff text seen by each `generate_message` call.
    pub seen_diffs: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(message: &str) -> Self {
        Self {
            name: "fake".to_string(),
            message: Ok(message.to_string()),
            review: "OK".to_string(),
            message_calls: AtomicUsize::new(0),
            review_calls: AtomicUsize::new(0),
            seen_diffs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        let mut backend = Self::new("");
        backend.message = Err(reason.to_string());
        backend
    }

    pub fn with_review(mut self, review: &str) -> Self {
        self.review = review.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn message_calls(&self) -> usize {
        self.message_calls.load(Ordering::SeqCst)
    }

    pub fn review_calls(&self) -> usize {
        self.review_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_message(
        &self,
        diff: &str,
        _model: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_diffs.lock().unwrap().push(diff.to_string());
        self.message.clone().map_err(|message| GenerationError::Backend {
            backend: self.name.clone(),
            message,
        })
    }

    async fn generate_review(
        &self,
        _diff: &str,
        _model: Option<&str>,
        _custom_prompt: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.review_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.review.clone())
    }
}

/// Operator that answers from a script and records every prompt.
pub struct ScriptedOperator {
    pub confirm: bool,
    pub action: ReviewAction,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    pub fn new(confirm: bool, action: ReviewAction) -> Self {
        Self {
            confirm,
            action,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl Operator for ScriptedOperator {
    fn confirm(&self, prompt: &str) -> Result<bool, OperatorError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.confirm)
    }

    fn choose_review_action(&self, _outcome: &ReviewOutcome) -> Result<ReviewAction, OperatorError> {
        self.prompts.lock().unwrap().push("review action".to_string());
        Ok(self.action)
    }
}

/// A one-file unified diff with `body` as its added lines.
pub fn diff_for(file: &str, body: &str) -> String {
    let added: String = body.lines().map(|l| format!("+{}\n", l)).collect();
    format!(
        "diff --git a/{file} b/{file}\n--- a/{file}\n+++ b/{file}\n@@ -0,0 +1 @@\n{added}"
    )
}
