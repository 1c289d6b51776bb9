//! Error types for scrivener modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

use crate::git::classify::{VcsErrorKind, classify_vcs_error};

/// Errors from git subprocess operations.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Failed to run git {operation}: {source}")]
    Spawn {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} failed: {output}")]
    CommandFailed { operation: String, output: String },

    #[error("Not a git repository: {0}")]
    NotARepository(#[source] git2::Error),

    #[error("Bare repositories are not supported")]
    BareRepository,
}

impl VcsError {
    /// Classify the failure so callers can tell "nothing to do" from real errors.
    pub fn kind(&self) -> VcsErrorKind {
        match self {
            VcsError::CommandFailed { output, .. } => classify_vcs_error(output),
            _ => VcsErrorKind::Other,
        }
    }
}

/// Errors from Claude CLI operations.
#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("Claude Code CLI not found. Install with: npm install -g @anthropic-ai/claude-code")]
    NotInstalled,

    #[error("Claude Code CLI failed to execute: {0}")]
    ExecutionFailed(String),

    #[error("Failed to spawn Claude process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Claude process timed out after {0} seconds")]
    Timeout(u64),

    #[error("Claude CLI exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<ClaudeError>),
}

/// Errors from Codex CLI operations.
#[derive(Error, Debug)]
pub enum CodexError {
    #[error(
        "Codex CLI not found. Install with: npm install -g @openai/codex (then run `codex` or set CODEX_API_KEY)"
    )]
    NotInstalled,

    #[error("Failed to spawn Codex process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Codex process timed out after {0} seconds")]
    Timeout(u64),

    #[error("Codex CLI exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<CodexError>),
}

/// Any failure from a generation or review backend.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Claude(#[from] ClaudeError),

    #[error(transparent)]
    Codex(#[from] CodexError),

    #[error("{backend} returned an empty response")]
    EmptyResponse { backend: String },

    #[error("{backend} failed: {message}")]
    Backend { backend: String, message: String },
}

/// A generated message that does not satisfy the conventional commit grammar.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MessageError {
    #[error("Generated commit message is empty")]
    Empty,

    #[error("Commit header does not match `<type>[(scope)][!]: <description>`: {0:?}")]
    MalformedHeader(String),

    #[error("Unknown commit type '{0}'")]
    UnknownType(String),

    #[error("Breaking change description must be at least {min} characters, got {actual}")]
    BreakingDescriptionTooShort { min: usize, actual: usize },

    #[error("BREAKING CHANGE footer must be at least {min} characters, got {actual}")]
    BreakingFooterTooShort { min: usize, actual: usize },
}

/// Errors from the external check runner.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Check tool '{0}' has an empty command")]
    EmptyCommand(String),
}

/// Errors from interactive operator prompts.
#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Interactive prompt failed: {0}")]
    Interaction(String),
}

/// Errors from the advisory lock manager (contention is not an error).
#[derive(Error, Debug)]
pub enum LockError {
    #[error("Failed to create lock directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write lock file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove lock file {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from loading `.scrivener.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by the single-change commit pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No staged changes found. Use 'git add <file>' before generating a commit message.")]
    NoStagedChanges,

    #[error(
        "Diff has {size} characters, above the {max} limit. Split the change into smaller commits."
    )]
    DiffTooLarge { size: usize, max: usize },

    #[error("Blocking checks failed: {}", failed.join(", "))]
    ChecksFailed { failed: Vec<String> },

    #[error("Commit blocked by code review: {0}")]
    ReviewBlocked(String),

    #[error("Commit message generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Invalid commit format: {0}")]
    InvalidCommitFormat(#[from] MessageError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Operator(#[from] OperatorError),

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error("Configuration error: {0}")]
    Config(String),
}
