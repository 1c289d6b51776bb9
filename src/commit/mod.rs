//! From staged changes to a validated conventional commit message.

pub mod changeset;
pub mod guard;
pub mod message;
pub mod pipeline;
pub mod prompt;

pub use changeset::{ChangeSet, FastPath};
pub use guard::{DiffGuard, DiffVerdict};
pub use message::CommitMessage;
pub use pipeline::{CommitPipeline, PipelineOptions, PipelineOutput, Stage};
pub use prompt::build_commit_prompt;
