//! Batch mode: one commit per changed file.
//!
//! Files are processed in sorted-path order, one at a time. Each file is
//! locked, staged alone, run through the [`CommitPipeline`] and committed
//! with a pathspec-scoped commit, so concurrent `scrivener flow` processes
//! on the same repository never sweep up each other's staged files.
//!
//! Nothing here returns an error for a single file: every outcome becomes a
//! [`ProcessResult`], and one file's failure never stops the batch.

pub mod lock;

use std::fmt;

use tracing::{debug, info, warn};

pub use lock::{FileLock, LockManager, LockRecord, lock_is_stale, pid_alive};

use crate::commit::{CommitPipeline, PipelineOptions};
use crate::config::Config;
use crate::error::{PipelineError, VcsError};
use crate::git::{CommitRequest, Vcs};

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub file: String,
    pub success: bool,
    pub skipped: bool,
    /// Commit summary on success, otherwise the reason.
    pub message: String,
}

impl ProcessResult {
    pub fn committed(file: &str, summary: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            success: true,
            skipped: false,
            message: summary.into(),
        }
    }

    pub fn skipped(file: &str, reason: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            success: false,
            skipped: true,
            message: reason.into(),
        }
    }

    pub fn failed(file: &str, reason: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            success: false,
            skipped: false,
            message: reason.into(),
        }
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success {
            "ok"
        } else if self.skipped {
            "skipped"
        } else {
            "failed"
        };
        write!(f, "[{}] {}: {}", status, self.file, self.message)
    }
}

/// Totals across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[ProcessResult]) -> Self {
        results.iter().fold(Self::default(), |mut acc, r| {
            if r.success {
                acc.success += 1;
            } else if r.skipped {
                acc.skipped += 1;
            } else {
                acc.failed += 1;
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.success + self.failed + self.skipped
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} committed | {} failed | {} skipped",
            self.success, self.failed, self.skipped
        )
    }
}

/// Changed files under `path`, sorted, capped at `count` (0 = all).
pub fn collect_files(vcs: &dyn Vcs, path: &str, count: usize) -> Result<Vec<String>, VcsError> {
    let mut files = vcs.list_changed(path)?;
    files.sort();
    files.dedup();
    if count > 0 {
        files.truncate(count);
    }
    Ok(files)
}

/// Asked before each commit with the file and its proposed message.
pub type ConfirmFn<'a> = &'a dyn Fn(&str, &str) -> bool;

pub struct BatchOrchestrator<'a> {
    config: &'a Config,
    vcs: &'a dyn Vcs,
    pipeline: CommitPipeline<'a>,
    locks: LockManager,
    confirm: Option<ConfirmFn<'a>>,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(
        config: &'a Config,
        vcs: &'a dyn Vcs,
        pipeline: CommitPipeline<'a>,
    ) -> Result<Self, VcsError> {
        let locks = LockManager::new(&vcs.git_dir()?);
        Ok(Self {
            config,
            vcs,
            pipeline,
            locks,
            confirm: None,
        })
    }

    pub fn with_confirm(mut self, confirm: ConfirmFn<'a>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    /// Process `files` in sorted order, reporting each outcome as it lands.
    pub async fn run(
        &self,
        files: &[String],
        options: &PipelineOptions,
        on_result: Option<&dyn Fn(&ProcessResult)>,
    ) -> Vec<ProcessResult> {
        let mut ordered = files.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut results = Vec::with_capacity(ordered.len());
        for file in &ordered {
            let result = self.process_file(file, options).await;
            if let Some(report) = on_result {
                report(&result);
            }
            results.push(result);
        }
        results
    }

    /// Lock, stage, generate and commit one file.
    pub async fn process_file(&self, file: &str, options: &PipelineOptions) -> ProcessResult {
        match self.vcs.has_pending_changes(file) {
            Ok(true) => {}
            Ok(false) => return ProcessResult::skipped(file, "no pending changes"),
            Err(e) => return ProcessResult::failed(file, e.to_string()),
        }

        let lock = match self.locks.acquire(file) {
            Ok(Some(lock)) => lock,
            Ok(None) => return ProcessResult::skipped(file, "locked by another process"),
            Err(e) => return ProcessResult::failed(file, e.to_string()),
        };

        let result = self.process_locked(file, options).await;

        if let Err(e) = self.locks.release(lock) {
            warn!("{}", e);
        }
        result
    }

    async fn process_locked(&self, file: &str, options: &PipelineOptions) -> ProcessResult {
        // Another process may have committed it between the check and the lock.
        match self.vcs.has_pending_changes(file) {
            Ok(true) => {}
            Ok(false) => return ProcessResult::skipped(file, "already committed"),
            Err(e) => return ProcessResult::failed(file, e.to_string()),
        }

        let scope = [file.to_string()];

        // Index entries already present (`git rm`, `git add -p`) are used as
        // they are and left in place on every exit path.
        let pre_staged = match self.vcs.list_staged(&scope) {
            Ok(staged) => !staged.is_empty(),
            Err(e) => return ProcessResult::failed(file, e.to_string()),
        };

        if pre_staged {
            debug!("{} is already staged, keeping its index entry", file);
        } else if let Err(e) = self.vcs.stage(file) {
            if e.kind().is_benign() {
                return ProcessResult::skipped(file, e.to_string());
            }
            return ProcessResult::failed(file, e.to_string());
        }

        match self.vcs.list_staged(&scope) {
            Ok(staged) if staged.is_empty() => {
                self.rollback(file, pre_staged);
                return ProcessResult::skipped(file, "nothing staged");
            }
            Ok(_) => {}
            Err(e) => {
                self.rollback(file, pre_staged);
                return ProcessResult::failed(file, e.to_string());
            }
        }

        let output = match self.pipeline.run(&scope, options).await {
            Ok(output) => output,
            Err(PipelineError::NoStagedChanges) => {
                self.rollback(file, pre_staged);
                return ProcessResult::skipped(file, "no staged changes");
            }
            Err(e) => {
                self.rollback(file, pre_staged);
                return ProcessResult::failed(file, e.to_string());
            }
        };

        if !options.skip_confirmation
            && let Some(confirm) = self.confirm
            && !confirm(file, output.message.as_str())
        {
            self.rollback(file, pre_staged);
            return ProcessResult::failed(file, "cancelled by user");
        }

        let request = CommitRequest {
            message: output.message.as_str(),
            pathspec: &scope,
            date: self.config.commit.date.as_deref(),
        };
        match self.vcs.commit(&request) {
            Ok(summary) => {
                info!("Committed {}", file);
                ProcessResult::committed(file, summary.trim())
            }
            Err(e) if e.kind().is_benign() => {
                debug!("Commit of {} skipped: {}", file, e);
                self.rollback(file, pre_staged);
                ProcessResult::skipped(file, e.to_string())
            }
            Err(e) => {
                self.rollback(file, pre_staged);
                ProcessResult::failed(file, e.to_string())
            }
        }
    }

    /// Put the index back the way it was for `file`. A file that was staged
    /// before the run keeps its entry.
    fn rollback(&self, file: &str, pre_staged: bool) {
        if pre_staged {
            return;
        }
        if let Err(e) = self.vcs.unstage(file) {
            warn!("Could not unstage {}: {}", file, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(kind: u8, name: &str) -> ProcessResult {
        match kind % 3 {
            0 => ProcessResult::committed(name, "abc1234 feat: x"),
            1 => ProcessResult::skipped(name, "locked"),
            _ => ProcessResult::failed(name, "boom"),
        }
    }

    #[test]
    fn test_summary_counts_every_result_once() {
        for n in 0..20u8 {
            let results: Vec<_> = (0..n)
                .map(|i| result(i.wrapping_mul(7) ^ n, &format!("f{i}")))
                .collect();
            let summary = BatchSummary::from_results(&results);
            assert_eq!(summary.total(), n as usize);
        }
    }

    #[test]
    fn test_summary_display() {
        let results = vec![
            ProcessResult::committed("a", "abc feat: a"),
            ProcessResult::committed("b", "def feat: b"),
            ProcessResult::failed("c", "boom"),
        ];
        assert_eq!(
            BatchSummary::from_results(&results).to_string(),
            "2 committed | 1 failed | 0 skipped"
        );
    }

    #[test]
    fn test_result_display() {
        assert_eq!(
            ProcessResult::skipped("src/a.rs", "locked by another process").to_string(),
            "[skipped] src/a.rs: locked by another process"
        );
    }
}
