//! scrivener - conventional commit messages from staged changes.
//!
//! # Overview
//!
//! scrivener inspects what is staged, optionally runs external checks and an
//! AI code review, asks a generation backend (Claude or Codex CLI) for a
//! conventional commit message and validates it before committing. In batch
//! mode (`scrivener flow`) it commits each changed file separately, guarded
//! by advisory per-file locks so several invocations can share a repository.

pub mod checks;
pub mod claude;
pub mod codex;
pub mod commit;
pub mod config;
pub mod error;
pub mod flow;
pub mod git;
pub mod llm;
pub mod operator;
pub mod review;

// Re-export commonly used types
pub use commit::{CommitMessage, CommitPipeline, PipelineOptions, PipelineOutput, Stage};
pub use config::Config;
pub use error::{ConfigError, GenerationError, LockError, MessageError, PipelineError, VcsError};
pub use flow::{BatchOrchestrator, BatchSummary, ProcessResult};
pub use git::{GitCli, Vcs};
pub use llm::{Backend, CliBackend, Provider};
pub use operator::{DialoguerOperator, FixedOperator, Operator, ReviewAction};
pub use review::{FindingKind, ReviewOutcome, Severity};
