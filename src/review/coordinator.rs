//! Review gating and escalation.
//!
//! ```text
//! Idle -> Reviewing -> Clean
//!                   -> Flagged -> Continuing | Stopped | Escalating
//! Escalating -> JudgeClean | JudgeFlaggedBug | JudgeFlaggedSecurity
//! ```
//!
//! Security findings stop the run wherever they appear. Nothing the operator
//! or the judge says can downgrade them.

use tracing::{info, warn};

use super::{FindingKind, ReviewOutcome, filter_diff, parse_review};
use crate::commit::pipeline::Stage;
use crate::config::ReviewConfig;
use crate::error::PipelineError;
use crate::llm::Backend;
use crate::operator::{Operator, ReviewAction};

/// What the pipeline should do after review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDecision {
    pub outcome: ReviewOutcome,
    /// The judge arbitrated, so it also writes the commit message.
    pub use_judge: bool,
}

impl ReviewDecision {
    fn primary(outcome: ReviewOutcome) -> Self {
        Self {
            outcome,
            use_judge: false,
        }
    }
}

pub struct ReviewCoordinator<'a> {
    config: &'a ReviewConfig,
    primary: &'a dyn Backend,
    primary_model: Option<&'a str>,
    judge: Option<(&'a dyn Backend, Option<&'a str>)>,
    operator: &'a dyn Operator,
    progress: Option<&'a dyn Fn(Stage)>,
}

impl<'a> ReviewCoordinator<'a> {
    pub fn new(
        config: &'a ReviewConfig,
        primary: &'a dyn Backend,
        primary_model: Option<&'a str>,
        operator: &'a dyn Operator,
    ) -> Self {
        Self {
            config,
            primary,
            primary_model,
            judge: None,
            operator,
            progress: None,
        }
    }

    pub fn with_judge(mut self, judge: &'a dyn Backend, model: Option<&'a str>) -> Self {
        self.judge = Some((judge, model));
        self
    }

    pub fn with_progress(mut self, progress: Option<&'a dyn Fn(Stage)>) -> Self {
        self.progress = progress;
        self
    }

    fn report(&self, stage: Stage) {
        if let Some(progress) = self.progress {
            progress(stage);
        }
    }

    /// Review `diff` and decide whether the commit may go ahead.
    pub async fn review(
        &self,
        diff: &str,
        skip_confirmation: bool,
    ) -> Result<ReviewDecision, PipelineError> {
        let filtered = filter_diff(diff, &self.config.extensions());
        if filtered.trim().is_empty() {
            info!("No reviewable files in diff, skipping review");
            return Ok(ReviewDecision::primary(ReviewOutcome::clean()));
        }

        self.report(Stage::Reviewing);
        let raw = self
            .primary
            .generate_review(&filtered, self.primary_model, self.custom_prompt())
            .await?;
        let outcome = parse_review(&raw);

        if !outcome.has_issues {
            return Ok(ReviewDecision::primary(outcome));
        }

        if outcome.has_kind(FindingKind::Security) {
            return Err(blocked(&outcome, FindingKind::Security));
        }

        if self.config.blocking && outcome.has_kind(FindingKind::Bug) {
            if skip_confirmation {
                return Err(blocked(&outcome, FindingKind::Bug));
            }
            return match self.operator.choose_review_action(&outcome)? {
                ReviewAction::Continue => {
                    info!("Operator marked review findings as false positives");
                    Ok(ReviewDecision::primary(outcome))
                }
                ReviewAction::Stop => Err(blocked(&outcome, FindingKind::Bug)),
                ReviewAction::Escalate => self.escalate(&filtered, skip_confirmation).await,
            };
        }

        self.accept_remaining(outcome, skip_confirmation)
            .map(ReviewDecision::primary)
    }

    /// Re-run the same review on the judge backend.
    async fn escalate(
        &self,
        filtered: &str,
        skip_confirmation: bool,
    ) -> Result<ReviewDecision, PipelineError> {
        let (judge, model) = self.judge.ok_or_else(|| {
            PipelineError::Config(
                "review escalation requires a [review.judge] backend".to_string(),
            )
        })?;

        self.report(Stage::Escalating);
        info!("Escalating review to {}", judge.name());
        let raw = judge
            .generate_review(filtered, model, self.custom_prompt())
            .await?;
        let mut outcome = parse_review(&raw);

        if outcome.has_kind(FindingKind::Security) {
            return Err(blocked(&outcome, FindingKind::Security));
        }

        if outcome.has_kind(FindingKind::Bug) {
            let confirmed = !skip_confirmation
                && self.operator.confirm(&format!(
                    "{} still reports a bug. Commit anyway?",
                    judge.name()
                ))?;
            if !confirmed {
                return Err(blocked(&outcome, FindingKind::Bug));
            }
        } else if outcome.has_issues {
            outcome = self.accept_remaining(outcome, skip_confirmation)?;
        }

        Ok(ReviewDecision {
            outcome,
            use_judge: true,
        })
    }

    fn accept_remaining(
        &self,
        outcome: ReviewOutcome,
        skip_confirmation: bool,
    ) -> Result<ReviewOutcome, PipelineError> {
        if skip_confirmation {
            for finding in &outcome.findings {
                warn!(
                    "Review finding [{}/{}]: {}",
                    finding.kind, finding.severity, finding.description
                );
            }
            return Ok(outcome);
        }

        let prompt = format!("{}\nContinue with the commit?", outcome);
        if self.operator.confirm(&prompt)? {
            Ok(outcome)
        } else {
            Err(PipelineError::ReviewBlocked(
                "declined after review".to_string(),
            ))
        }
    }

    fn custom_prompt(&self) -> Option<&'a str> {
        self.config.custom_prompt.as_deref()
    }
}

fn blocked(outcome: &ReviewOutcome, kind: FindingKind) -> PipelineError {
    let details: Vec<&str> = outcome
        .findings
        .iter()
        .filter(|f| f.kind == kind)
        .map(|f| f.description.as_str())
        .collect();
    PipelineError::ReviewBlocked(format!("{} finding: {}", kind, details.join("; ")))
}
