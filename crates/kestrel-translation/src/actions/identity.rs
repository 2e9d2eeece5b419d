//! `mapIdentity`.

use super::values::{evaluate_values, quote, split_confirmation};
use super::{BuiltinFactory, Params, names};
use crate::action::{ActionInstance, ActionOutcome, ExecutionContext, TranslationActionType};
use crate::error::TranslationError;
use crate::params::{ActionParameterDefinition, ParameterKind};
use crate::result::{IdentityEffectMode, MappedIdentity, MappingResult};
use crate::types::ProfileType;
use kestrel_expr::Expression;
use std::sync::Arc;

pub(crate) fn map_identity() -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            names::MAP_IDENTITY,
            ProfileType::Input,
            "Maps remote values to local identities of the given type",
            vec![
                ActionParameterDefinition::mandatory("identityType", ParameterKind::IdentityType),
                ActionParameterDefinition::mandatory(
                    "effectMode",
                    ParameterKind::enumeration(IdentityEffectMode::VALUES),
                ),
                ActionParameterDefinition::optional("expression", ParameterKind::Expression)
                    .with_description(
                        "Defaults to remote identities of the same type, then the same-named remote attribute",
                    ),
                ActionParameterDefinition::optional(
                    "credentialRequirement",
                    ParameterKind::CredentialRequirement,
                ),
            ],
        ),
        build,
    )
}

fn build(params: &Params<'_>) -> Result<Arc<dyn ActionInstance>, TranslationError> {
    let identity_type = params.required(0)?.to_string();
    let mode = params
        .enumeration::<IdentityEffectMode>(1)?
        .ok_or_else(|| params.invalid(1, "missing effect mode"))?;
    let expression = match params.expression(2)? {
        Some(expression) => expression,
        None => default_expression(&identity_type)
            .map_err(|e| params.invalid(0, e.to_string()))?,
    };
    Ok(Arc::new(MapIdentity {
        identity_type,
        mode,
        expression,
        credential_requirement: params.get(3).map(str::to_string),
    }))
}

fn default_expression(identity_type: &str) -> Result<Expression, kestrel_expr::ExprError> {
    let key = quote(identity_type);
    kestrel_expr::compile(&format!(
        "idsByType[{key}] != null ? idsByType[{key}] : attrs[{key}]"
    ))
}

#[derive(Debug)]
struct MapIdentity {
    identity_type: String,
    mode: IdentityEffectMode,
    expression: Expression,
    credential_requirement: Option<String>,
}

impl ActionInstance for MapIdentity {
    fn invoke(&self, ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        let values = evaluate_values(names::MAP_IDENTITY, &self.expression, ctx.vars)?;
        let mut result = MappingResult::new();

        if values.is_empty() {
            tracing::debug!(
                identity_type = %self.identity_type,
                "identity expression produced no values, skipping"
            );
            return Ok(ActionOutcome::Continue(result));
        }

        for raw in &values {
            let (value, confirmation) = split_confirmation(raw);
            if value.is_empty() {
                continue;
            }
            result.add_identity(MappedIdentity {
                identity_type: self.identity_type.clone(),
                value: value.to_string(),
                mode: self.mode,
                credential_requirement: self.credential_requirement.clone(),
                confirmation,
                idp: ctx.input.idp.clone(),
                profile: ctx.profile_name.to_string(),
            });
        }
        Ok(ActionOutcome::Continue(result))
    }
}
