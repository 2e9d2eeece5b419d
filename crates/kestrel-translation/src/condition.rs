//! Rule conditions.

use crate::error::TranslationError;
use kestrel_expr::{ExprError, Expression, Vars};
use std::fmt;

/// Condition text used when a rule does not specify one.
pub const DEFAULT_CONDITION: &str = "true";

/// A rule condition, compiled once.
#[derive(Clone)]
pub struct TranslationCondition {
    source: String,
    /// `None` only for conditions that failed to compile during lenient loading.
    compiled: Option<Expression>,
}

impl TranslationCondition {
    pub fn new(source: impl Into<String>) -> Result<Self, TranslationError> {
        let source = source.into();
        let compiled = kestrel_expr::compile(&source).map_err(|e| {
            TranslationError::InvalidCondition {
                condition: source.clone(),
                source: e,
            }
        })?;
        Ok(Self {
            source,
            compiled: Some(compiled),
        })
    }

    /// Keeps the text of a condition that does not compile; it never matches.
    pub(crate) fn disabled(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the condition; non-boolean results are `false`.
    pub fn evaluate(&self, vars: &Vars) -> Result<bool, ExprError> {
        match &self.compiled {
            Some(expression) => expression.evaluate_condition(vars),
            None => Ok(false),
        }
    }
}

impl Default for TranslationCondition {
    fn default() -> Self {
        Self {
            source: DEFAULT_CONDITION.to_string(),
            compiled: kestrel_expr::compile(DEFAULT_CONDITION).ok(),
        }
    }
}

impl fmt::Debug for TranslationCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TranslationCondition").field(&self.source).finish()
    }
}

impl PartialEq for TranslationCondition {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
