//! Translation profiles and their execution.

use crate::action::{ExecutionContext, ExecutionOptions};
use crate::actions::names;
use crate::context;
use crate::error::TranslationError;
use crate::result::MappingResult;
use crate::rule::{RuleOutcome, TranslationRule};
use crate::types::{ProfileMode, ProfileType};
use kestrel_core::AuthnContext;
use kestrel_expr::Vars;

/// An ordered, named list of rules.
///
/// Profiles are immutable; use [`TranslationProfile::with_rules`] to derive
/// one with a replaced rule list.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationProfile {
    name: String,
    description: String,
    profile_type: ProfileType,
    mode: ProfileMode,
    rules: Vec<TranslationRule>,
}

impl TranslationProfile {
    /// Creates a profile, rejecting actions meant for the other profile type.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        profile_type: ProfileType,
        rules: Vec<TranslationRule>,
    ) -> Result<Self, TranslationError> {
        check_compatibility(profile_type, &rules)?;
        Ok(Self {
            name: name.into(),
            description: description.into(),
            profile_type,
            mode: ProfileMode::Default,
            rules,
        })
    }

    pub fn with_mode(mut self, mode: ProfileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_rules(&self, rules: Vec<TranslationRule>) -> Result<Self, TranslationError> {
        check_compatibility(self.profile_type, &rules)?;
        Ok(Self {
            rules,
            ..self.clone()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn profile_type(&self) -> ProfileType {
        self.profile_type
    }

    pub fn mode(&self) -> ProfileMode {
        self.mode
    }

    pub fn rules(&self) -> &[TranslationRule] {
        &self.rules
    }

    /// Names of profiles referenced by include actions, in rule order.
    pub fn included_profiles(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(TranslationRule::action)
            .filter(|a| {
                a.name() == names::INCLUDE_INPUT_PROFILE || a.name() == names::INCLUDE_OUTPUT_PROFILE
            })
            .filter_map(|a| a.parameter(0))
            .collect()
    }

    /// Executes all rules against `input` without include support.
    pub fn execute(&self, input: &AuthnContext) -> Result<MappingResult, TranslationError> {
        self.execute_with(input, &ExecutionOptions::default())
    }

    /// Executes all rules against `input`.
    ///
    /// Each call starts from an empty result. A rule that signals a break
    /// stops processing after its result was merged; any error aborts the
    /// execution.
    pub fn execute_with(
        &self,
        input: &AuthnContext,
        options: &ExecutionOptions<'_>,
    ) -> Result<MappingResult, TranslationError> {
        let vars = context::input_vars(input);
        self.run(input, &vars, options, 0, &MappingResult::new())
    }

    pub(crate) fn run(
        &self,
        input: &AuthnContext,
        base_vars: &Vars,
        options: &ExecutionOptions<'_>,
        depth: usize,
        seed: &MappingResult,
    ) -> Result<MappingResult, TranslationError> {
        let span = tracing::debug_span!(
            "translation_profile",
            profile = %self.name,
            profile_type = %self.profile_type,
            depth
        );
        let _guard = span.enter();

        let mut result = MappingResult::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let outcome = match self.profile_type {
                ProfileType::Input => {
                    let ctx = ExecutionContext {
                        input,
                        vars: base_vars,
                        profile_name: &self.name,
                        profile_type: self.profile_type,
                        rule_index: index,
                        mapped: None,
                        options,
                        depth,
                    };
                    rule.apply(&ctx, &mut result)
                }
                ProfileType::Output => {
                    let mut mapped = seed.clone();
                    mapped.merge(result.clone());
                    let vars = context::with_mapped_state(base_vars, &mapped);
                    let ctx = ExecutionContext {
                        input,
                        vars: &vars,
                        profile_name: &self.name,
                        profile_type: self.profile_type,
                        rule_index: index,
                        mapped: Some(&mapped),
                        options,
                        depth,
                    };
                    rule.apply(&ctx, &mut result)
                }
            }
            .map_err(|e| e.in_rule(index))?;

            if outcome == RuleOutcome::Break {
                tracing::debug!(rule = index, "rule requested to stop processing");
                break;
            }
        }

        tracing::debug!(
            identities = result.identities().len(),
            attributes = result.attributes().len(),
            groups = result.groups().len(),
            "profile execution finished"
        );
        Ok(result)
    }
}

fn check_compatibility(
    profile_type: ProfileType,
    rules: &[TranslationRule],
) -> Result<(), TranslationError> {
    for (index, rule) in rules.iter().enumerate() {
        let action = rule.action();
        if let Some(action_type) = action.supported_profile_type() {
            if action_type != profile_type {
                return Err(TranslationError::IncompatibleAction {
                    action: action.name().to_string(),
                    action_type,
                    profile_type,
                }
                .in_rule(index));
            }
        }
    }
    Ok(())
}
