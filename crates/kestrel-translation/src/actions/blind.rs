//! Placeholder for actions that could not be restored.

use crate::action::{ActionInstance, ActionOutcome, ExecutionContext};
use crate::error::TranslationError;
use crate::result::MappingResult;

/// Stands in for an action whose type is unknown or whose parameters are
/// invalid. Invoking it logs an error and contributes nothing.
#[derive(Debug, Clone)]
pub struct BlindAction {
    reason: String,
}

impl BlindAction {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl ActionInstance for BlindAction {
    fn invoke(&self, ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        tracing::error!(
            profile = %ctx.profile_name,
            rule = ctx.rule_index,
            reason = %self.reason,
            "skipping action that could not be restored"
        );
        Ok(ActionOutcome::Continue(MappingResult::new()))
    }
}
