//! Backend abstraction, prompt sanitizing and response helpers.

pub mod backend;
pub mod json;
pub mod prompt;
pub mod retry;

pub use backend::{Backend, CliBackend, Provider};
pub use json::extract_json;
