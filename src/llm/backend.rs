//! Generation and review backends.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::retry::retry_with_backoff;
use crate::claude;
use crate::codex;
use crate::commit::prompt::build_commit_prompt;
use crate::error::{ClaudeError, CodexError, GenerationError};
use crate::review::build_review_prompt;

/// Supported CLI providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Claude,
    Codex,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Claude => "Claude",
            Provider::Codex => "Codex",
        }
    }

    /// Variable the provider's CLI reads its API key from.
    pub fn credential_env(&self) -> &'static str {
        match self {
            Provider::Claude => "ANTHROPIC_API_KEY",
            Provider::Codex => "CODEX_API_KEY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "claude" => Some(Provider::Claude),
            "codex" => Some(Provider::Codex),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can write a commit message or review a diff.
///
/// Implementations build their own prompts; callers hand over the diff only.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Human-readable name for logs and errors.
    fn name(&self) -> &str;

    /// Raw commit message text for `diff`. Not yet normalized or validated.
    async fn generate_message(
        &self,
        diff: &str,
        model: Option<&str>,
    ) -> Result<String, GenerationError>;

    /// Raw review text for `diff`, ready for [`crate::review::parse_review`].
    async fn generate_review(
        &self,
        diff: &str,
        model: Option<&str>,
        custom_prompt: Option<&str>,
    ) -> Result<String, GenerationError>;
}

/// [`Backend`] that shells out to the Claude or Codex CLI.
///
/// Credentials are fixed at construction and applied to the child process
/// only, so a primary and a judge backend can coexist with different keys.
#[derive(Clone)]
pub struct CliBackend {
    provider: Provider,
    language: String,
    name: String,
    envs: Vec<(String, String)>,
}

impl fmt::Debug for CliBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliBackend")
            .field("provider", &self.provider)
            .field("language", &self.language)
            .field("has_credential", &!self.envs.is_empty())
            .finish()
    }
}

impl CliBackend {
    pub fn new(provider: Provider, language: impl Into<String>) -> Self {
        Self {
            provider,
            language: language.into(),
            name: provider.as_str().to_string(),
            envs: Vec::new(),
        }
    }

    /// Pass `api_key` to the CLI under the provider's credential variable.
    pub fn with_credential(mut self, api_key: impl Into<String>) -> Self {
        self.envs
            .push((self.provider.credential_env().to_string(), api_key.into()));
        self
    }

    /// Override the display name (e.g. "Claude (judge)").
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Verify the provider's CLI is installed.
    pub async fn check_installed(&self) -> Result<(), GenerationError> {
        match self.provider {
            Provider::Claude => claude::check_claude_installed().await?,
            Provider::Codex => codex::check_codex_installed().await?,
        }
        Ok(())
    }

    async fn complete(&self, prompt: &str, model: Option<&str>) -> Result<String, GenerationError> {
        debug!("{} prompt length: {} chars", self.name, prompt.len());

        let output = match self.provider {
            Provider::Claude => retry_with_backoff(
                || claude::run_claude(prompt, model, &self.envs),
                claude_is_transient,
                |e| ClaudeError::RetriesExhausted(Box::new(e)),
            )
            .await
            .map_err(GenerationError::from)?,
            Provider::Codex => retry_with_backoff(
                || codex::run_codex(prompt, model, &self.envs),
                codex_is_transient,
                |e| CodexError::RetriesExhausted(Box::new(e)),
            )
            .await
            .map_err(GenerationError::from)?,
        };
        Ok(output)
    }
}

#[async_trait]
impl Backend for CliBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_message(
        &self,
        diff: &str,
        model: Option<&str>,
    ) -> Result<String, GenerationError> {
        let prompt = build_commit_prompt(diff, &self.language);
        let output = self.complete(&prompt, model).await?;
        if output.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                backend: self.name.clone(),
            });
        }
        Ok(output)
    }

    async fn generate_review(
        &self,
        diff: &str,
        model: Option<&str>,
        custom_prompt: Option<&str>,
    ) -> Result<String, GenerationError> {
        // An empty review is a clean one; `parse_review` decides.
        let prompt = build_review_prompt(diff, custom_prompt);
        self.complete(&prompt, model).await
    }
}

/// A missing CLI will not appear between attempts.
fn claude_is_transient(err: &ClaudeError) -> bool {
    !matches!(err, ClaudeError::NotInstalled)
}

fn codex_is_transient(err: &CodexError) -> bool {
    !matches!(err, CodexError::NotInstalled)
}
