//! External static checks (linters, type checkers, test runners).
//!
//! The pipeline only asks one question of the results: did any blocking
//! tool fail? How a tool runs is the runner's business.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::config::{CheckScope, ToolConfig};
use crate::error::CheckError;

/// Outcome of one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub tool: String,
    pub success: bool,
    pub blocking: bool,
    pub skipped: bool,
    /// Combined output, for display on failure.
    pub output: String,
}

impl CheckResult {
    pub fn skipped(tool: &str, blocking: bool) -> Self {
        Self {
            tool: tool.to_string(),
            success: true,
            blocking,
            skipped: true,
            output: String::new(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait CheckRunner: Send + Sync {
    /// Run every tool in `scope`. `files` restricts extension-filtered tools
    /// and is substituted for a trailing `.` in `pass_files` tools.
    fn run_checks(&self, scope: CheckScope, files: &[String]) -> Result<Vec<CheckResult>, CheckError>;
}

/// Whether any tool that ran, failed, and is blocking.
pub fn has_blocking_failure(results: &[CheckResult]) -> bool {
    results
        .iter()
        .any(|r| !r.skipped && !r.success && r.blocking)
}

/// Names of the tools behind [`has_blocking_failure`].
pub fn blocking_failures(results: &[CheckResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| !r.skipped && !r.success && r.blocking)
        .map(|r| r.tool.clone())
        .collect()
}

/// Runs the configured `[[checks.tools]]` commands in the repository root.
#[derive(Debug, Clone)]
pub struct CommandCheckRunner {
    root: PathBuf,
    tools: Vec<ToolConfig>,
}

impl CommandCheckRunner {
    pub fn new(root: impl Into<PathBuf>, tools: Vec<ToolConfig>) -> Self {
        Self {
            root: root.into(),
            tools,
        }
    }

    fn run_tool(&self, tool: &ToolConfig, files: &[String]) -> Result<CheckResult, CheckError> {
        let relevant = relevant_files(tool, files);
        if tool.extensions.is_some() && relevant.is_empty() {
            debug!("Skipping {}: no matching files", tool.name);
            return Ok(CheckResult::skipped(&tool.name, tool.blocking));
        }

        let args = tool_args(tool, &relevant)?;
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| CheckError::EmptyCommand(tool.name.clone()))?;

        info!("Running check {}", tool.name);
        let output = Command::new(program)
            .args(rest)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output();

        let result = match output {
            Ok(output) => CheckResult {
                tool: tool.name.clone(),
                success: output.status.success(),
                blocking: tool.blocking,
                skipped: false,
                output: format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                )
                .trim()
                .to_string(),
            },
            // A tool that cannot start counts as failed, not as a runner error.
            Err(e) => CheckResult {
                tool: tool.name.clone(),
                success: false,
                blocking: tool.blocking,
                skipped: false,
                output: format!("failed to run {}: {}", program, e),
            },
        };
        Ok(result)
    }
}

impl CheckRunner for CommandCheckRunner {
    fn run_checks(&self, scope: CheckScope, files: &[String]) -> Result<Vec<CheckResult>, CheckError> {
        self.tools
            .iter()
            .filter(|tool| scope.includes(tool.kind))
            .map(|tool| self.run_tool(tool, files))
            .collect()
    }
}

fn relevant_files(tool: &ToolConfig, files: &[String]) -> Vec<String> {
    let Some(extensions) = &tool.extensions else {
        return files.to_vec();
    };
    files
        .iter()
        .filter(|f| {
            let lower = f.to_lowercase();
            extensions
                .iter()
                .any(|ext| lower.ends_with(&ext.to_lowercase()))
        })
        .cloned()
        .collect()
}

fn tool_args(tool: &ToolConfig, files: &[String]) -> Result<Vec<String>, CheckError> {
    if tool.command.is_empty() {
        return Err(CheckError::EmptyCommand(tool.name.clone()));
    }
    let mut args = tool.command.clone();
    if tool.pass_files && !files.is_empty() && args.last().is_some_and(|a| a == ".") {
        args.pop();
        args.extend(files.iter().cloned());
    }
    Ok(args)
}
