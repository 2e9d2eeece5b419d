//! Error types for the translation engine.
//!
//! Errors fall into three categories (see [`ErrorCategory`]):
//! configuration errors are raised while authoring or saving a profile and
//! are permanent; document errors come from malformed serialized profiles;
//! execution errors abort a single profile execution. An execution break is
//! not an error at all.

use crate::types::ProfileType;
use kestrel_expr::ExprError;
use kestrel_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`TranslationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Document,
    Execution,
}

#[derive(Debug, Error)]
pub enum TranslationError {
    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    #[error("unknown action type '{name}'")]
    UnknownActionType { name: String },

    #[error("action type '{name}' is already registered")]
    DuplicateActionType { name: String },

    #[error(
        "too few parameters for action '{action}': requires {} {required}, got {got}",
        arity_word(.exact)
    )]
    TooFewParameters {
        action: String,
        required: usize,
        /// All declared parameters are mandatory.
        exact: bool,
        got: usize,
    },

    #[error("too many parameters for action '{action}': requires max {max}, got {got}")]
    TooManyParameters { action: String, max: usize, got: usize },

    #[error("too many parameters for action '{action}': no parameters accepted, got {got}")]
    NoParametersAccepted { action: String, got: usize },

    #[error("action '{action}': mandatory parameter '{parameter}' (#{index}) is missing")]
    MissingParameter {
        action: String,
        parameter: String,
        index: usize,
    },

    #[error("action '{action}': invalid value of parameter '{parameter}': {reason}")]
    InvalidParameter {
        action: String,
        parameter: String,
        reason: String,
    },

    #[error("invalid condition '{condition}': {source}")]
    InvalidCondition { condition: String, source: ExprError },

    #[error("action '{action}' is for {action_type} profiles and cannot be used in an {profile_type} profile")]
    IncompatibleAction {
        action: String,
        action_type: ProfileType,
        profile_type: ProfileType,
    },

    // =========================================================================
    // DOCUMENT ERRORS
    // =========================================================================
    #[error("malformed profile document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported profile document version '{0}'")]
    UnsupportedVersion(String),

    // =========================================================================
    // EXECUTION ERRORS
    // =========================================================================
    #[error("evaluation of condition '{condition}' failed: {source}")]
    ConditionEvaluation { condition: String, source: ExprError },

    #[error("action '{action}' failed to evaluate its expression: {source}")]
    ActionExpression { action: String, source: ExprError },

    /// Returned by plugin actions when a collaborator they depend on fails.
    #[error("action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("{profile_type} profile '{name}' not found")]
    ProfileNotFound { profile_type: ProfileType, name: String },

    #[error("including profile '{name}' exceeds the maximum nesting depth of {max}")]
    IncludeDepthExceeded { name: String, max: usize },

    /// Any of the above, attributed to a rule position.
    #[error("rule #{index}: {source}")]
    InRule {
        index: usize,
        source: Box<TranslationError>,
    },
}

fn arity_word(exact: &bool) -> &'static str {
    if *exact { "exactly" } else { "min" }
}

impl TranslationError {
    pub(crate) fn in_rule(self, index: usize) -> Self {
        Self::InRule {
            index,
            source: Box::new(self),
        }
    }

    pub(crate) fn invalid_parameter(
        action: &str,
        parameter: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            action: action.to_string(),
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    /// The innermost error, skipping rule attribution.
    pub fn root(&self) -> &TranslationError {
        match self {
            Self::InRule { source, .. } => source.root(),
            other => other,
        }
    }

    /// Position of the outermost rule this error is attributed to.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            Self::InRule { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.root() {
            Self::Json(_) | Self::UnsupportedVersion(_) => ErrorCategory::Document,
            Self::ConditionEvaluation { .. }
            | Self::ActionExpression { .. }
            | Self::ActionFailed { .. }
            | Self::ProfileNotFound { .. }
            | Self::IncludeDepthExceeded { .. } => ErrorCategory::Execution,
            _ => ErrorCategory::Configuration,
        }
    }
}

/// Errors of the profile management layer.
#[derive(Debug, Error)]
pub enum ManagementError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("{profile_type} profile '{name}' not found")]
    NotFound { profile_type: ProfileType, name: String },

    #[error("{profile_type} profile '{name}' already exists")]
    AlreadyExists { profile_type: ProfileType, name: String },

    #[error("profile '{name}' is read-only")]
    ReadOnly { name: String },

    #[error("profile '{name}' is provided by the system and cannot be modified")]
    SystemProfile { name: String },

    #[error("profile '{profile}' includes unknown profile '{include}'")]
    UnknownInclude { profile: String, include: String },

    #[error("include cycle: {}", .0.join(" -> "))]
    IncludeCycle(Vec<String>),

    #[error("profile '{name}' is included by '{by}'")]
    InUse { name: String, by: String },

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid profile document {}: {source}", .path.display())]
    Document {
        path: PathBuf,
        source: TranslationError,
    },
}
