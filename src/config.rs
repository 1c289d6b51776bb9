//! Project configuration stored in `.scrivener.toml` at the repository root.
//!
//! One [`Config`] value is built at startup and passed by reference to every
//! component. Missing fields take the defaults below; a missing file means
//! all defaults.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::llm::Provider;
use crate::review::filter::default_extensions;

pub const CONFIG_FILE_NAME: &str = ".scrivener.toml";

const PROVIDER_ENV: &str = "SCRIVENER_PROVIDER";
const MODEL_ENV: &str = "SCRIVENER_MODEL";
const MAX_DIFF_ENV: &str = "SCRIVENER_MAX_DIFF_SIZE";
const WARN_DIFF_ENV: &str = "SCRIVENER_WARN_DIFF_SIZE";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub diff: DiffConfig,
    pub fast_path: FastPathConfig,
    pub review: ReviewConfig,
    pub checks: ChecksConfig,
    pub commit: CommitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: Provider,
    pub model: Option<String>,
    /// Natural language for descriptions and bodies.
    pub language: String,
    /// Name of the environment variable holding the backend API key.
    pub api_key_env: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Claude,
            model: None,
            language: "en".to_string(),
            api_key_env: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiffConfig {
    /// Above this many characters a diff draws an advisory.
    pub warn_size: usize,
    /// Above this many characters a diff needs explicit confirmation.
    pub max_size: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            warn_size: 2500,
            max_size: 3000,
        }
    }
}

/// Files that never need a generated message.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FastPathConfig {
    pub no_generation_extensions: Vec<String>,
    pub no_generation_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReviewConfig {
    pub enabled: bool,
    /// Bug findings stop the run until the operator decides.
    pub blocking: bool,
    /// Overrides the built-in list of reviewed extensions.
    pub extensions: Option<Vec<String>>,
    /// Path, relative to the repository root, of a custom review prompt.
    pub prompt_file: Option<String>,
    pub judge: Option<JudgeConfig>,
    /// Contents of `prompt_file`, read by [`Config::load`].
    #[serde(skip)]
    pub custom_prompt: Option<String>,
}

impl ReviewConfig {
    pub fn extensions(&self) -> Vec<String> {
        match &self.extensions {
            Some(exts) if !exts.is_empty() => exts.clone(),
            _ => default_extensions(),
        }
    }
}

/// Independent backend used to arbitrate disputed bug findings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JudgeConfig {
    pub provider: Provider,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CheckScope {
    #[default]
    Full,
    Lint,
    Test,
    Typecheck,
}

impl CheckScope {
    /// Whether a tool of `kind` runs for this scope.
    pub fn includes(self, kind: CheckScope) -> bool {
        self == CheckScope::Full || self == kind
    }
}

impl std::fmt::Display for CheckScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CheckScope::Full => "full",
            CheckScope::Lint => "lint",
            CheckScope::Test => "test",
            CheckScope::Typecheck => "typecheck",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChecksConfig {
    pub enabled: bool,
    pub scope: CheckScope,
    pub tools: Vec<ToolConfig>,
}

/// One external check, e.g. `cargo clippy`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    pub name: String,
    pub command: Vec<String>,
    #[serde(default = "default_tool_kind")]
    pub kind: CheckScope,
    #[serde(default = "default_true")]
    pub blocking: bool,
    /// Replace a trailing `.` target with the staged files.
    #[serde(default)]
    pub pass_files: bool,
    /// Only run when a staged file has one of these extensions.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

fn default_tool_kind() -> CheckScope {
    CheckScope::Lint
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommitConfig {
    /// Passed to `git commit --date`.
    pub date: Option<String>,
}

impl Config {
    /// Load `.scrivener.toml` from `root`, apply environment overrides,
    /// read the custom review prompt and validate.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(&root.join(CONFIG_FILE_NAME))?;
        config.apply_env_overrides();

        if let Some(rel) = &config.review.prompt_file {
            let path = root.join(rel);
            let prompt = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            config.review.custom_prompt = Some(prompt);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse one file. A missing file yields the defaults.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `SCRIVENER_*` overrides. Invalid values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_value(PROVIDER_ENV) {
            match Provider::parse(&value) {
                Some(provider) => self.generation.provider = provider,
                None => warn!("Invalid {} value '{}', ignoring", PROVIDER_ENV, value),
            }
        }
        if let Some(value) = env_value(MODEL_ENV) {
            self.generation.model = Some(value);
        }
        let max_override = env_size(MAX_DIFF_ENV);
        let warn_override = env_size(WARN_DIFF_ENV);
        if let Some(size) = max_override {
            self.diff.max_size = size;
        }
        match warn_override {
            Some(size) => self.diff.warn_size = size,
            // Lowering only the limit pulls the warning threshold down with it.
            None if max_override.is_some() && self.diff.warn_size > self.diff.max_size => {
                debug!(
                    "Clamping diff.warn_size {} to {} from {}",
                    self.diff.warn_size, self.diff.max_size, MAX_DIFF_ENV
                );
                self.diff.warn_size = self.diff.max_size;
            }
            None => {}
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diff.max_size == 0 {
            return Err(ConfigError::Invalid("diff.max_size must be > 0".to_string()));
        }
        if self.diff.warn_size > self.diff.max_size {
            return Err(ConfigError::Invalid(format!(
                "diff.warn_size ({}) must not exceed diff.max_size ({})",
                self.diff.warn_size, self.diff.max_size
            )));
        }
        for tool in &self.checks.tools {
            if tool.command.first().is_none_or(|c| c.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "checks.tools '{}' must have a non-empty command",
                    tool.name
                )));
            }
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_size(name: &str) -> Option<usize> {
    let value = env_value(name)?;
    match value.parse::<usize>() {
        Ok(size) => Some(size),
        Err(_) => {
            warn!("Invalid {} value '{}', ignoring", name, value);
            None
        }
    }
}
