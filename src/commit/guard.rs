//! Diff size limits.

use tracing::{info, warn};

use crate::config::DiffConfig;
use crate::error::PipelineError;
use crate::operator::Operator;

/// Outcome of measuring a diff against the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffVerdict {
    /// At or below the warn threshold.
    Ok,
    /// Above warn, at or below max. Advisory only.
    Warn,
    /// Above max.
    Block,
}

#[derive(Debug, Clone, Copy)]
pub struct DiffGuard {
    warn_size: usize,
    max_size: usize,
}

impl DiffGuard {
    pub fn new(warn_size: usize, max_size: usize) -> Self {
        Self { warn_size, max_size }
    }

    pub fn from_config(config: &DiffConfig) -> Self {
        Self::new(config.warn_size, config.max_size)
    }

    pub fn assess(&self, size: usize) -> DiffVerdict {
        if size > self.max_size {
            DiffVerdict::Block
        } else if size > self.warn_size {
            DiffVerdict::Warn
        } else {
            DiffVerdict::Ok
        }
    }

    /// Check `diff` against the limits.
    ///
    /// Over the hard limit, `skip_confirmation` lets the diff through with a
    /// warning; otherwise the operator must explicitly accept it or the run
    /// stops with [`PipelineError::DiffTooLarge`].
    pub fn validate(
        &self,
        diff: &str,
        skip_confirmation: bool,
        operator: &dyn Operator,
    ) -> Result<(), PipelineError> {
        let size = diff.chars().count();

        match self.assess(size) {
            DiffVerdict::Ok => Ok(()),
            DiffVerdict::Warn => {
                info!(
                    "Diff is {} characters (advisory limit {}); smaller commits are easier to review",
                    size, self.warn_size
                );
                Ok(())
            }
            DiffVerdict::Block if skip_confirmation => {
                warn!(
                    "Diff is {} characters, above the {} limit; continuing because confirmation is skipped",
                    size, self.max_size
                );
                Ok(())
            }
            DiffVerdict::Block => {
                let prompt = format!(
                    "Diff has {} characters (limit {}). Consider splitting it into smaller commits. Continue anyway?",
                    size, self.max_size
                );
                if operator.confirm(&prompt)? {
                    Ok(())
                } else {
                    Err(PipelineError::DiffTooLarge {
                        size,
                        max: self.max_size,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::MockOperator;

    fn guard() -> DiffGuard {
        DiffGuard::new(2500, 3000)
    }

    #[test]
    fn test_assess_thresholds() {
        let g = guard();
        assert_eq!(g.assess(0), DiffVerdict::Ok);
        assert_eq!(g.assess(2500), DiffVerdict::Ok);
        assert_eq!(g.assess(2501), DiffVerdict::Warn);
        assert_eq!(g.assess(3000), DiffVerdict::Warn);
        assert_eq!(g.assess(3001), DiffVerdict::Block);
    }

    #[test]
    fn test_small_diffs_never_prompt() {
        let mut operator = MockOperator::new();
        operator.expect_confirm().never();

        for size in [0, 1, 100, 2500] {
            let diff = "x".repeat(size);
            assert!(guard().validate(&diff, false, &operator).is_ok());
        }
    }

    #[test]
    fn test_warn_range_never_prompts() {
        let mut operator = MockOperator::new();
        operator.expect_confirm().never();

        let diff = "x".repeat(2800);
        assert!(guard().validate(&diff, false, &operator).is_ok());
    }

    #[test]
    fn test_oversized_diff_with_skip_never_blocks() {
        let mut operator = MockOperator::new();
        operator.expect_confirm().never();

        for size in [3001, 10_000, 100_000] {
            let diff = "x".repeat(size);
            assert!(guard().validate(&diff, true, &operator).is_ok());
        }
    }

    #[test]
    fn test_oversized_diff_accepted_by_operator() {
        let mut operator = MockOperator::new();
        operator.expect_confirm().times(1).returning(|_| Ok(true));

        let diff = "x".repeat(3500);
        assert!(guard().validate(&diff, false, &operator).is_ok());
    }

    #[test]
    fn test_oversized_diff_declined_by_operator() {
        let mut operator = MockOperator::new();
        operator.expect_confirm().times(1).returning(|_| Ok(false));

        let diff = "x".repeat(3500);
        let err = guard().validate(&diff, false, &operator).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DiffTooLarge {
                size: 3500,
                max: 3000
            }
        ));
    }
}
