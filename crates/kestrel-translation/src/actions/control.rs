//! Flow control: profile includes and early stop.

use super::{BuiltinFactory, names};
use crate::action::{ActionInstance, ActionOutcome, ExecutionContext, TranslationActionType};
use crate::error::TranslationError;
use crate::params::{ActionParameterDefinition, ParameterKind};
use crate::result::MappingResult;
use crate::types::ProfileType;
use std::sync::Arc;

pub(crate) fn include_input_profile() -> BuiltinFactory {
    include(names::INCLUDE_INPUT_PROFILE, ProfileType::Input)
}

pub(crate) fn include_output_profile() -> BuiltinFactory {
    include(names::INCLUDE_OUTPUT_PROFILE, ProfileType::Output)
}

pub(crate) fn stop_processing() -> BuiltinFactory {
    stop(names::STOP_PROCESSING, ProfileType::Input)
}

pub(crate) fn stop_output_processing() -> BuiltinFactory {
    stop(names::STOP_OUTPUT_PROCESSING, ProfileType::Output)
}

fn include(name: &'static str, profile_type: ProfileType) -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            name,
            profile_type,
            format!("Runs another {profile_type} profile and merges its result"),
            vec![ActionParameterDefinition::mandatory(
                "profile",
                ParameterKind::ProfileReference,
            )],
        ),
        |params| {
            Ok(Arc::new(IncludeProfile {
                profile: params.required(0)?.to_string(),
            }))
        },
    )
}

fn stop(name: &'static str, profile_type: ProfileType) -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            name,
            profile_type,
            "Stops processing of the remaining rules",
            Vec::new(),
        ),
        |_| Ok(Arc::new(StopProcessing)),
    )
}

#[derive(Debug)]
struct IncludeProfile {
    profile: String,
}

impl ActionInstance for IncludeProfile {
    fn invoke(&self, ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        tracing::debug!(included = %self.profile, "including profile");
        let result = ctx.execute_included(&self.profile)?;
        Ok(ActionOutcome::Continue(result))
    }
}

#[derive(Debug)]
struct StopProcessing;

impl ActionInstance for StopProcessing {
    fn invoke(&self, _ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        Ok(ActionOutcome::Break(MappingResult::new()))
    }
}
