//! Error types for expression compilation and evaluation.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while compiling or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// The source text is not a valid expression.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A variable is not defined in the evaluation context.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// An operator or method was applied to an unsupported value.
    #[error("type error: expected {expected}, found {found}")]
    Type { expected: String, found: String },

    /// A regular expression failed to compile or is too long.
    #[error("invalid regular expression '{pattern}': {message}")]
    Regex { pattern: String, message: String },

    #[error("division by zero")]
    DivisionByZero,

    /// Evaluation or parse nesting exceeded the configured bound.
    #[error("maximum nesting depth ({0}) exceeded")]
    DepthExceeded(usize),
}

impl ExprError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Type {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// True when the error can only come from [`crate::compile`].
    pub fn is_compile_error(&self) -> bool {
        matches!(self, Self::Syntax { .. } | Self::Regex { .. })
    }
}
