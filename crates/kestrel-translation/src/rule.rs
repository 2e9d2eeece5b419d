//! Translation rules.

use crate::action::{ExecutionContext, TranslationAction};
use crate::condition::TranslationCondition;
use crate::error::TranslationError;
use crate::result::MappingResult;

/// What applying a rule did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    NotMatched,
    Applied,
    /// Applied, and the action asked to stop processing the profile.
    Break,
}

/// A condition guarding an action.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRule {
    condition: TranslationCondition,
    action: TranslationAction,
}

impl TranslationRule {
    pub fn new(condition: TranslationCondition, action: TranslationAction) -> Self {
        Self { condition, action }
    }

    /// A rule whose condition is always true.
    pub fn unconditional(action: TranslationAction) -> Self {
        Self::new(TranslationCondition::default(), action)
    }

    pub fn condition(&self) -> &TranslationCondition {
        &self.condition
    }

    pub fn action(&self) -> &TranslationAction {
        &self.action
    }

    /// Evaluates the condition and, when it holds, invokes the action and
    /// merges its result into `result`. A break is reported after merging.
    pub fn apply(
        &self,
        ctx: &ExecutionContext<'_>,
        result: &mut MappingResult,
    ) -> Result<RuleOutcome, TranslationError> {
        let matched = self.condition.evaluate(ctx.vars).map_err(|source| {
            TranslationError::ConditionEvaluation {
                condition: self.condition.source().to_string(),
                source,
            }
        })?;

        if !matched {
            tracing::debug!(
                rule = ctx.rule_index,
                condition = %self.condition.source(),
                "condition not met"
            );
            return Ok(RuleOutcome::NotMatched);
        }

        tracing::debug!(
            rule = ctx.rule_index,
            action = %self.action.name(),
            "condition met, invoking action"
        );
        let (partial, stop) = self.action.invoke(ctx)?.into_parts();
        result.merge(partial);

        Ok(if stop {
            RuleOutcome::Break
        } else {
            RuleOutcome::Applied
        })
    }
}
