//! Action types, configured actions and the plugin contract.

use crate::error::TranslationError;
use crate::params::ActionParameterDefinition;
use crate::profile::TranslationProfile;
use crate::result::MappingResult;
use crate::types::ProfileType;
use kestrel_core::AuthnContext;
use kestrel_expr::Vars;
use std::fmt;
use std::sync::Arc;

/// Default bound on nested profile includes.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 8;

/// Static description of an action: its name, the profile type it works
/// in, and its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationActionType {
    name: String,
    supported_profile_type: ProfileType,
    description: String,
    parameters: Vec<ActionParameterDefinition>,
}

impl TranslationActionType {
    pub fn new(
        name: impl Into<String>,
        supported_profile_type: ProfileType,
        description: impl Into<String>,
        parameters: Vec<ActionParameterDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            supported_profile_type,
            description: description.into(),
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supported_profile_type(&self) -> ProfileType {
        self.supported_profile_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ActionParameterDefinition] {
        &self.parameters
    }

    pub fn mandatory_count(&self) -> usize {
        self.parameters.iter().filter(|p| p.mandatory).count()
    }
}

/// What an action invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Merge and go on with the next rule.
    Continue(MappingResult),
    /// Merge, then stop processing the profile.
    Break(MappingResult),
}

impl ActionOutcome {
    pub fn into_parts(self) -> (MappingResult, bool) {
        match self {
            Self::Continue(result) => (result, false),
            Self::Break(result) => (result, true),
        }
    }
}

/// Executable part of a configured action.
///
/// Instances are immutable and must be pure functions of their parameters
/// and the execution context.
pub trait ActionInstance: Send + Sync + fmt::Debug {
    fn invoke(&self, ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError>;
}

/// Plugin contract: builds instances of one action type.
///
/// Arity and generic parameter kinds are validated by the registry before
/// [`TranslationActionFactory::new_instance`] is called.
pub trait TranslationActionFactory: Send + Sync {
    fn action_type(&self) -> &TranslationActionType;

    fn new_instance(
        &self,
        parameters: &[Option<String>],
    ) -> Result<Arc<dyn ActionInstance>, TranslationError>;
}

/// A named action with its positional parameter values, ready to invoke.
#[derive(Clone)]
pub struct TranslationAction {
    name: String,
    parameters: Vec<Option<String>>,
    supported_profile_type: Option<ProfileType>,
    instance: Arc<dyn ActionInstance>,
}

impl TranslationAction {
    pub(crate) fn new(
        name: impl Into<String>,
        parameters: Vec<Option<String>>,
        supported_profile_type: Option<ProfileType>,
        instance: Arc<dyn ActionInstance>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            supported_profile_type,
            instance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Option<String>] {
        &self.parameters
    }

    /// Parameter value at `index`, when present and non-empty.
    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters
            .get(index)
            .and_then(|p| p.as_deref())
            .filter(|p| !p.is_empty())
    }

    /// `None` for placeholder actions that fit any profile.
    pub fn supported_profile_type(&self) -> Option<ProfileType> {
        self.supported_profile_type
    }

    pub fn invoke(&self, ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        self.instance.invoke(ctx)
    }
}

impl fmt::Debug for TranslationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationAction")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl PartialEq for TranslationAction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.parameters == other.parameters
    }
}

/// Looks up profiles referenced by include actions.
pub trait ProfileResolver: Send + Sync {
    fn resolve(&self, profile_type: ProfileType, name: &str) -> Option<Arc<TranslationProfile>>;
}

/// Per-execution settings.
#[derive(Clone, Copy)]
pub struct ExecutionOptions<'a> {
    pub resolver: Option<&'a dyn ProfileResolver>,
    pub max_include_depth: usize,
}

impl Default for ExecutionOptions<'_> {
    fn default() -> Self {
        Self {
            resolver: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl<'a> ExecutionOptions<'a> {
    pub fn with_resolver(mut self, resolver: &'a dyn ProfileResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}

/// Everything an action can see while it runs.
pub struct ExecutionContext<'a> {
    pub input: &'a AuthnContext,
    pub vars: &'a Vars,
    pub profile_name: &'a str,
    pub profile_type: ProfileType,
    pub rule_index: usize,
    /// Accumulated state so far (output profiles only).
    pub(crate) mapped: Option<&'a MappingResult>,
    pub(crate) options: &'a ExecutionOptions<'a>,
    pub(crate) depth: usize,
}

impl ExecutionContext<'_> {
    /// Executes another profile of the same type against the same input and
    /// returns its result.
    pub fn execute_included(&self, name: &str) -> Result<MappingResult, TranslationError> {
        let not_found = || TranslationError::ProfileNotFound {
            profile_type: self.profile_type,
            name: name.to_string(),
        };
        let resolver = self.options.resolver.ok_or_else(not_found)?;
        let profile = resolver
            .resolve(self.profile_type, name)
            .ok_or_else(not_found)?;

        if self.depth + 1 > self.options.max_include_depth {
            return Err(TranslationError::IncludeDepthExceeded {
                name: name.to_string(),
                max: self.options.max_include_depth,
            });
        }

        let seed = self.mapped.cloned().unwrap_or_default();
        profile.run(self.input, self.vars, self.options, self.depth + 1, &seed)
    }
}
