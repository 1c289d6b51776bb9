//! [`Vcs`] implementation that shells out to the system `git` binary.
//!
//! Using the binary rather than libgit2 for writes inherits the user's git
//! config, hooks, signing setup and credential store.

use std::collections::BTreeSet;
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use git2::Repository;
use tracing::debug;

use super::{CommitRequest, Vcs, VcsErrorKind};
use crate::error::VcsError;

/// The `git` binary, run from the repository's working tree root.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
    git_dir: PathBuf,
}

impl GitCli {
    /// Locate the repository containing `start`.
    pub fn discover(start: &Path) -> Result<Self, VcsError> {
        let repo = Repository::discover(start).map_err(VcsError::NotARepository)?;
        let root = repo
            .workdir()
            .ok_or(VcsError::BareRepository)?
            .to_path_buf();
        let git_dir = repo.path().to_path_buf();
        Ok(Self { root, git_dir })
    }

    /// Working tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_git(&self, args: &[&str], operation: &str) -> Result<String, VcsError> {
        self.run_git_with_env(args, operation, &[])
    }

    fn run_git_with_env(
        &self,
        args: &[&str],
        operation: &str,
        envs: &[(&str, String)],
    ) -> Result<String, VcsError> {
        debug!("git {}", args.join(" "));

        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.root).args(args);
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| VcsError::Spawn {
                operation: operation.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(VcsError::CommandFailed {
                operation: operation.to_string(),
                output: format!("{}{}", stderr, stdout).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn name_list(&self, base: &[&str], paths: &[String], operation: &str) -> Result<Vec<String>, VcsError> {
        let args = with_pathspec(base, paths);
        let stdout = self.run_git(&args, operation)?;
        Ok(lines(&stdout))
    }
}

impl Vcs for GitCli {
    fn list_changed(&self, path: &str) -> Result<Vec<String>, VcsError> {
        let scope = vec![path.to_string()];
        let mut files = BTreeSet::new();

        files.extend(self.name_list(&["diff", "--name-only"], &scope, "diff")?);
        files.extend(self.name_list(&["diff", "--cached", "--name-only"], &scope, "diff --cached")?);
        files.extend(self.name_list(
            &["ls-files", "--others", "--exclude-standard"],
            &scope,
            "ls-files",
        )?);

        Ok(files.into_iter().collect())
    }

    fn has_pending_changes(&self, file: &str) -> Result<bool, VcsError> {
        let stdout = self.run_git(&["status", "--porcelain", "--", file], "status")?;
        Ok(stdout.lines().any(|line| line.len() >= 2 && !line[..2].trim().is_empty()))
    }

    fn list_staged(&self, paths: &[String]) -> Result<Vec<String>, VcsError> {
        self.name_list(&["diff", "--cached", "--name-only"], paths, "diff --cached")
    }

    fn list_deleted(&self, paths: &[String]) -> Result<Vec<String>, VcsError> {
        self.name_list(
            &["diff", "--cached", "--name-only", "--diff-filter=D"],
            paths,
            "diff --cached",
        )
    }

    fn diff_staged(&self, paths: &[String]) -> Result<String, VcsError> {
        let args = with_pathspec(&["diff", "--cached"], paths);
        self.run_git(&args, "diff --cached")
    }

    fn stage(&self, path: &str) -> Result<(), VcsError> {
        self.run_git(&["add", "--", path], "add").map(|_| ())
    }

    fn unstage(&self, path: &str) -> Result<(), VcsError> {
        match self.run_git(&["reset", "-q", "HEAD", "--", path], "reset") {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == VcsErrorKind::NoHead => self
                .run_git(&["rm", "--cached", "-q", "--", path], "rm --cached")
                .map(|_| ()),
            Err(e) => Err(e),
        }
    }

    fn commit(&self, request: &CommitRequest<'_>) -> Result<String, VcsError> {
        let mut args = vec!["commit", "-m", request.message];
        if let Some(date) = request.date {
            args.push("--date");
            args.push(date);
        }
        if !request.pathspec.is_empty() {
            args.push("--only");
        }
        let args = with_pathspec(&args, request.pathspec);

        let envs: Vec<(&str, String)> = gpg_tty()
            .map(|tty| vec![("GPG_TTY", tty)])
            .unwrap_or_default();
        self.run_git_with_env(&args, "commit", &envs)?;

        let summary = self.run_git(&["log", "-1", "--pretty=format:%h %s"], "log")?;
        Ok(summary.trim().to_string())
    }

    fn git_dir(&self) -> Result<PathBuf, VcsError> {
        Ok(self.git_dir.clone())
    }
}

/// Append `-- <paths>` to `base` when any paths are given.
fn with_pathspec<'a>(base: &[&'a str], paths: &'a [String]) -> Vec<&'a str> {
    let mut args = base.to_vec();
    if !paths.is_empty() {
        args.push("--");
        args.extend(paths.iter().map(String::as_str));
    }
    args
}

fn lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Terminal for gpg-agent pinentry, so signed commits can prompt.
///
/// Keeps an existing `GPG_TTY`; otherwise asks `tty` when stdin is a terminal.
fn gpg_tty() -> Option<String> {
    if let Ok(existing) = env::var("GPG_TTY")
        && !existing.is_empty()
    {
        return Some(existing);
    }

    if !std::io::stdin().is_terminal() {
        return None;
    }

    let output = Command::new("tty")
        .stdin(Stdio::inherit())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let tty = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!tty.is_empty()).then_some(tty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_pathspec_appends_separator() {
        let paths = vec!["a.txt".to_string(), "dir/b.rs".to_string()];
        let args = with_pathspec(&["diff", "--cached"], &paths);
        assert_eq!(args, vec!["diff", "--cached", "--", "a.txt", "dir/b.rs"]);
    }

    #[test]
    fn test_with_pathspec_empty_means_whole_index() {
        let args = with_pathspec(&["diff", "--cached"], &[]);
        assert_eq!(args, vec!["diff", "--cached"]);
    }

    #[test]
    fn test_lines_skips_blank_entries() {
        assert_eq!(lines("a.txt\n\n  b.txt  \n"), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_gpg_tty_keeps_existing_value() {
        temp_env::with_var("GPG_TTY", Some("/tmp/existing-tty"), || {
            assert_eq!(gpg_tty().as_deref(), Some("/tmp/existing-tty"));
        });
    }

    #[test]
    fn test_discover_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitCli::discover(dir.path());
        assert!(matches!(result, Err(VcsError::NotARepository(_))));
    }
}
