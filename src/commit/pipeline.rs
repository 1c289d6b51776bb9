//! The single-change commit pipeline.
//!
//! From "changes are staged" to a validated message:
//!
//! 1. fast-path classification (no backend, no checks, no review)
//! 2. external checks, failing fast before any paid call
//! 3. diff size guard
//! 4. review, possibly escalated to the judge
//! 5. generation and validation
//!
//! The pipeline never commits. The caller does, after confirmation or under
//! the batch orchestrator's lock.

use std::fmt;

use tracing::{debug, info};

use super::changeset::ChangeSet;
use super::guard::DiffGuard;
use super::message::CommitMessage;
use crate::checks::{CheckRunner, blocking_failures};
use crate::config::{CheckScope, Config};
use crate::error::PipelineError;
use crate::git::Vcs;
use crate::llm::Backend;
use crate::operator::Operator;
use crate::review::{ReviewCoordinator, ReviewOutcome};

/// Points in the pipeline reported to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Inspecting,
    Checking,
    Reviewing,
    Escalating,
    Generating,
    Validating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Inspecting => "Inspecting staged changes",
            Stage::Checking => "Running checks",
            Stage::Reviewing => "Reviewing code",
            Stage::Escalating => "Asking the judge",
            Stage::Generating => "Generating commit message",
            Stage::Validating => "Validating message",
        };
        f.write_str(label)
    }
}

/// Per-run switches, mostly from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Never prompt; advisories are logged instead.
    pub skip_confirmation: bool,
    /// Run external checks for this scope. `None` disables them.
    pub check: Option<CheckScope>,
    /// Run the review stage.
    pub review: bool,
}

impl PipelineOptions {
    /// Options implied by the configuration alone.
    pub fn from_config(config: &Config) -> Self {
        Self {
            skip_confirmation: false,
            check: config.checks.enabled.then_some(config.checks.scope),
            review: config.review.enabled,
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub message: CommitMessage,
    /// `None` when review did not run.
    pub review: Option<ReviewOutcome>,
}

pub struct CommitPipeline<'a> {
    config: &'a Config,
    vcs: &'a dyn Vcs,
    backend: &'a dyn Backend,
    judge: Option<&'a dyn Backend>,
    checks: Option<&'a dyn CheckRunner>,
    operator: &'a dyn Operator,
    progress: Option<&'a dyn Fn(Stage)>,
}

impl<'a> CommitPipeline<'a> {
    pub fn new(
        config: &'a Config,
        vcs: &'a dyn Vcs,
        backend: &'a dyn Backend,
        operator: &'a dyn Operator,
    ) -> Self {
        Self {
            config,
            vcs,
            backend,
            judge: None,
            checks: None,
            operator,
            progress: None,
        }
    }

    pub fn with_judge(mut self, judge: &'a dyn Backend) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn with_checks(mut self, checks: &'a dyn CheckRunner) -> Self {
        self.checks = Some(checks);
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn Fn(Stage)) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report(&self, stage: Stage) {
        if let Some(progress) = self.progress {
            progress(stage);
        }
    }

    /// Produce a validated message for what is staged under `paths`
    /// (everything staged when empty).
    pub async fn run(
        &self,
        paths: &[String],
        options: &PipelineOptions,
    ) -> Result<PipelineOutput, PipelineError> {
        self.report(Stage::Inspecting);
        let changes = ChangeSet::inspect(self.vcs, paths)?;
        if changes.is_empty() {
            return Err(PipelineError::NoStagedChanges);
        }

        if let Some(path) = changes.fast_path(&self.config.fast_path) {
            info!("Fast path ({}), skipping generation", path);
            let message = CommitMessage::parse(&changes.synthesize_message(path))?;
            return Ok(PipelineOutput {
                message,
                review: None,
            });
        }

        if let Some(scope) = options.check {
            self.run_checks(scope, &changes.files)?;
        }

        // Read once; everything below works on this exact text.
        let diff = self.vcs.diff_staged(paths)?;
        DiffGuard::from_config(&self.config.diff).validate(
            &diff,
            options.skip_confirmation,
            self.operator,
        )?;

        let mut generator = self.backend;
        let mut model = self.config.generation.model.as_deref();
        let mut review = None;

        if options.review {
            let decision = self
                .reviewer()
                .review(&diff, options.skip_confirmation)
                .await?;
            if decision.use_judge
                && let Some(judge) = self.judge
            {
                generator = judge;
                model = self.judge_model();
            }
            review = Some(decision.outcome);
        }

        self.report(Stage::Generating);
        debug!("Generating message with {}", generator.name());
        let raw = generator.generate_message(&diff, model).await?;

        self.report(Stage::Validating);
        let message = CommitMessage::from_generated(&raw)?;

        Ok(PipelineOutput { message, review })
    }

    fn run_checks(&self, scope: CheckScope, files: &[String]) -> Result<(), PipelineError> {
        let Some(runner) = self.checks else {
            debug!("Checks requested but no runner configured");
            return Ok(());
        };

        self.report(Stage::Checking);
        let results = runner.run_checks(scope, files)?;
        let failed = blocking_failures(&results);
        if !failed.is_empty() {
            return Err(PipelineError::ChecksFailed { failed });
        }
        Ok(())
    }

    fn reviewer(&self) -> ReviewCoordinator<'a> {
        let coordinator = ReviewCoordinator::new(
            &self.config.review,
            self.backend,
            self.config.generation.model.as_deref(),
            self.operator,
        )
        .with_progress(self.progress);

        match self.judge {
            Some(judge) => coordinator.with_judge(judge, self.judge_model()),
            None => coordinator,
        }
    }

    fn judge_model(&self) -> Option<&'a str> {
        self.config
            .review
            .judge
            .as_ref()
            .and_then(|j| j.model.as_deref())
    }
}
