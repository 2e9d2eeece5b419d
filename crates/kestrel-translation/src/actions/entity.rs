//! Entity-level directives: scheduled changes, credential requirement and
//! stale data removal.

use super::{BuiltinFactory, Params, names};
use crate::action::{ActionInstance, ActionOutcome, ExecutionContext, TranslationActionType};
use crate::error::TranslationError;
use crate::params::{ActionParameterDefinition, ParameterKind};
use crate::result::{EntityDirective, MappingResult, ScheduledOperation};
use crate::types::ProfileType;
use std::sync::Arc;

pub(crate) fn entity_change() -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            names::ENTITY_CHANGE,
            ProfileType::Input,
            "Schedules a change of the entity's state",
            vec![
                ActionParameterDefinition::mandatory(
                    "operation",
                    ParameterKind::enumeration(ScheduledOperation::VALUES),
                ),
                ActionParameterDefinition::optional("days", ParameterKind::Numeric)
                    .with_description("Days until the change takes effect, 0 when empty"),
            ],
        ),
        |params| {
            let operation = params
                .enumeration::<ScheduledOperation>(0)?
                .ok_or_else(|| params.invalid(0, "missing operation"))?;
            let after_days = match params.get(1) {
                Some(days) => days
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| params.invalid(1, format!("'{days}' is not a non-negative integer")))?,
                None => 0,
            };
            Ok(directive(EntityDirective::ScheduledChange {
                operation,
                after_days,
            }))
        },
    )
}

pub(crate) fn assign_credential_requirement() -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            names::ASSIGN_CREDENTIAL_REQUIREMENT,
            ProfileType::Input,
            "Sets the credential requirement of the entity",
            vec![ActionParameterDefinition::mandatory(
                "credentialRequirement",
                ParameterKind::CredentialRequirement,
            )],
        ),
        |params| {
            Ok(directive(EntityDirective::CredentialRequirement {
                name: params.required(0)?.to_string(),
            }))
        },
    )
}

pub(crate) fn remove_stale_data() -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            names::REMOVE_STALE_DATA,
            ProfileType::Input,
            "Removes previously imported data the identity provider no longer asserts",
            Vec::new(),
        ),
        |_| Ok(directive(EntityDirective::RemoveStaleData)),
    )
}

fn directive(directive: EntityDirective) -> Arc<dyn ActionInstance> {
    Arc::new(SetDirective { directive })
}

#[derive(Debug)]
struct SetDirective {
    directive: EntityDirective,
}

impl ActionInstance for SetDirective {
    fn invoke(&self, _ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        let mut result = MappingResult::new();
        result.set_directive(self.directive.clone());
        Ok(ActionOutcome::Continue(result))
    }
}
