//! Codex CLI spawning.

use std::env;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::CodexError;

/// Default timeout for Codex subprocess execution (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

const TIMEOUT_ENV_VAR: &str = "SCRIVENER_CODEX_TIMEOUT";

fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => v.parse::<u64>().map(Duration::from_secs).unwrap_or_else(|_| {
            warn!(
                "Invalid {} value '{}', using default {}s",
                TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
            );
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        }),
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// Check if Codex CLI is installed and accessible.
pub async fn check_codex_installed() -> Result<(), CodexError> {
    if which::which("codex").is_err() {
        return Err(CodexError::NotInstalled);
    }

    let version_check = Command::new("codex")
        .arg("--version")
        .output()
        .await
        .map_err(CodexError::SpawnFailed)?;

    if !version_check.status.success() {
        return Err(CodexError::NotInstalled);
    }

    Ok(())
}

fn codex_args(prompt: &str, model: Option<&str>) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if let Some(model) = model {
        args.push("-m".to_string());
        args.push(model.to_string());
    }
    args.push(prompt.to_string());
    args
}

/// Run `codex exec [-m model] <prompt>` and return its stdout.
pub async fn run_codex(
    prompt: &str,
    model: Option<&str>,
    envs: &[(String, String)],
) -> Result<String, CodexError> {
    let timeout_duration = get_timeout();
    let timeout_secs = timeout_duration.as_secs();

    debug!("Running codex (model: {})", model.unwrap_or("default"));

    let mut cmd = Command::new("codex");
    cmd.args(codex_args(prompt, model))
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = timeout(timeout_duration, cmd.output())
        .await
        .map_err(|_| CodexError::Timeout(timeout_secs))?
        .map_err(CodexError::SpawnFailed)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        return Err(CodexError::NonZeroExit { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
