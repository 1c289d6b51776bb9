//! The human in the loop.
//!
//! Every interactive decision the pipeline needs goes through [`Operator`],
//! so tests and automated runs can answer without a terminal.

use dialoguer::{Confirm, Select};

use crate::error::OperatorError;
use crate::review::ReviewOutcome;

/// Choice offered when a blocking review flags a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    /// Treat the findings as false positives and commit anyway.
    Continue,
    Stop,
    /// Ask the judge backend for a second opinion.
    Escalate,
}

#[cfg_attr(test, mockall::automock)]
pub trait Operator: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool, OperatorError>;

    fn choose_review_action(&self, outcome: &ReviewOutcome) -> Result<ReviewAction, OperatorError>;
}

/// Terminal prompts via dialoguer.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerOperator;

impl Operator for DialoguerOperator {
    fn confirm(&self, prompt: &str) -> Result<bool, OperatorError> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| OperatorError::Interaction(e.to_string()))
    }

    fn choose_review_action(&self, outcome: &ReviewOutcome) -> Result<ReviewAction, OperatorError> {
        eprintln!("{}", outcome);

        let choices = [
            "Continue (the findings are false positives)",
            "Stop",
            "Escalate to the judge backend",
        ];
        let selection = Select::new()
            .with_prompt("Code review flagged a bug. What now?")
            .items(&choices)
            .default(1)
            .interact()
            .map_err(|e| OperatorError::Interaction(e.to_string()))?;

        Ok(match selection {
            0 => ReviewAction::Continue,
            2 => ReviewAction::Escalate,
            _ => ReviewAction::Stop,
        })
    }
}

/// Answers every prompt the same way. Used for `--yes` runs where a prompt
/// should never be reached but must not hang if it is.
#[derive(Debug, Clone, Copy)]
pub struct FixedOperator {
    pub confirm: bool,
    pub review_action: ReviewAction,
}

impl FixedOperator {
    pub fn declining() -> Self {
        Self {
            confirm: false,
            review_action: ReviewAction::Stop,
        }
    }
}

impl Operator for FixedOperator {
    fn confirm(&self, _prompt: &str) -> Result<bool, OperatorError> {
        Ok(self.confirm)
    }

    fn choose_review_action(&self, _outcome: &ReviewOutcome) -> Result<ReviewAction, OperatorError> {
        Ok(self.review_action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declining_operator() {
        let operator = FixedOperator::declining();
        assert!(!operator.confirm("Proceed?").unwrap());
        assert_eq!(
            operator.choose_review_action(&ReviewOutcome::clean()).unwrap(),
            ReviewAction::Stop
        );
    }
}
