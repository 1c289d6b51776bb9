//! Claude CLI integration.

pub mod subprocess;

pub use subprocess::{check_claude_installed, run_claude};
