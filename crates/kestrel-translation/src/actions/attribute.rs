//! `mapAttribute`.

use super::values::{evaluate_values, quote, split_confirmation};
use super::{BuiltinFactory, Params, names};
use crate::action::{ActionInstance, ActionOutcome, ExecutionContext, TranslationActionType};
use crate::error::TranslationError;
use crate::params::{ActionParameterDefinition, ParameterKind};
use crate::result::{AttributeEffectMode, Confirmation, MappedAttribute, MappingResult};
use crate::types::ProfileType;
use kestrel_expr::Expression;
use std::sync::Arc;

pub(crate) fn map_attribute() -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            names::MAP_ATTRIBUTE,
            ProfileType::Input,
            "Maps remote values to a local attribute in a group",
            vec![
                ActionParameterDefinition::mandatory("attribute", ParameterKind::AttributeType),
                ActionParameterDefinition::mandatory("group", ParameterKind::GroupPath),
                ActionParameterDefinition::mandatory(
                    "effectMode",
                    ParameterKind::enumeration(AttributeEffectMode::VALUES),
                ),
                ActionParameterDefinition::optional("expression", ParameterKind::Expression)
                    .with_description("Defaults to all values of the same-named remote attribute"),
            ],
        ),
        build,
    )
}

fn build(params: &Params<'_>) -> Result<Arc<dyn ActionInstance>, TranslationError> {
    let name = params.required(0)?.to_string();
    let group = params.required(1)?.to_string();
    let mode = params
        .enumeration::<AttributeEffectMode>(2)?
        .ok_or_else(|| params.invalid(2, "missing effect mode"))?;
    let expression = match params.expression(3)? {
        Some(expression) => expression,
        None => kestrel_expr::compile(&format!("attrs[{}]", quote(&name)))
            .map_err(|e| params.invalid(0, e.to_string()))?,
    };
    Ok(Arc::new(MapAttribute {
        name,
        group,
        mode,
        expression,
    }))
}

#[derive(Debug)]
struct MapAttribute {
    name: String,
    group: String,
    mode: AttributeEffectMode,
    expression: Expression,
}

impl ActionInstance for MapAttribute {
    fn invoke(&self, ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        let raw_values = evaluate_values(names::MAP_ATTRIBUTE, &self.expression, ctx.vars)?;
        let mut result = MappingResult::new();

        if raw_values.is_empty() {
            tracing::debug!(attribute = %self.name, "attribute expression produced no values, skipping");
            return Ok(ActionOutcome::Continue(result));
        }

        // the first marked value decides the attribute's confirmation
        let mut confirmation = Confirmation::Default;
        let mut values = Vec::with_capacity(raw_values.len());
        for raw in &raw_values {
            let (value, marked) = split_confirmation(raw);
            if confirmation == Confirmation::Default {
                confirmation = marked;
            }
            values.push(value.to_string());
        }

        result.add_attribute(MappedAttribute {
            name: self.name.clone(),
            group: self.group.clone(),
            values,
            mode: self.mode,
            confirmation,
            idp: ctx.input.idp.clone(),
            profile: ctx.profile_name.to_string(),
        });
        Ok(ActionOutcome::Continue(result))
    }
}
