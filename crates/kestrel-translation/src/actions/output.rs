//! Output profile actions: released attributes and filters.

use super::values::evaluate_values;
use super::{BuiltinFactory, Params, names};
use crate::action::{ActionInstance, ActionOutcome, ExecutionContext, TranslationActionType};
use crate::error::TranslationError;
use crate::params::{ActionParameterDefinition, ParameterKind};
use crate::result::{AttributeEffectMode, Confirmation, MappedAttribute, MappingResult};
use crate::types::ProfileType;
use kestrel_expr::Expression;
use regex::Regex;
use std::sync::Arc;

const ROOT_GROUP: &str = "/";

pub(crate) fn create_attribute() -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            names::CREATE_ATTRIBUTE,
            ProfileType::Output,
            "Releases an attribute with values computed by an expression",
            vec![
                ActionParameterDefinition::mandatory("attribute", ParameterKind::AttributeType),
                ActionParameterDefinition::mandatory("expression", ParameterKind::Expression),
                ActionParameterDefinition::optional("group", ParameterKind::GroupPath)
                    .with_description("Defaults to the root group"),
            ],
        ),
        build_create,
    )
}

fn build_create(params: &Params<'_>) -> Result<Arc<dyn ActionInstance>, TranslationError> {
    let name = params.required(0)?.to_string();
    let expression = params
        .expression(1)?
        .ok_or_else(|| params.invalid(1, "missing expression"))?;
    let group = params.get(2).unwrap_or(ROOT_GROUP).to_string();
    Ok(Arc::new(CreateAttribute {
        name,
        group,
        expression,
    }))
}

#[derive(Debug)]
struct CreateAttribute {
    name: String,
    group: String,
    expression: Expression,
}

impl ActionInstance for CreateAttribute {
    fn invoke(&self, ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        let values = evaluate_values(names::CREATE_ATTRIBUTE, &self.expression, ctx.vars)?;
        let mut result = MappingResult::new();
        if values.is_empty() {
            tracing::debug!(attribute = %self.name, "attribute expression produced no values, skipping");
            return Ok(ActionOutcome::Continue(result));
        }
        result.add_attribute(MappedAttribute {
            name: self.name.clone(),
            group: self.group.clone(),
            values,
            mode: AttributeEffectMode::CreateOrUpdate,
            confirmation: Confirmation::Default,
            idp: ctx.input.idp.clone(),
            profile: ctx.profile_name.to_string(),
        });
        Ok(ActionOutcome::Continue(result))
    }
}

pub(crate) fn filter_attribute() -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            names::FILTER_ATTRIBUTE,
            ProfileType::Output,
            "Hides released attributes whose name matches a pattern",
            vec![ActionParameterDefinition::mandatory(
                "attribute",
                ParameterKind::RegularExpression,
            )
            .with_description("Anchored regular expression over attribute names")],
        ),
        |params| {
            let pattern = params.required(0)?;
            Regex::new(&format!("^(?:{pattern})$")).map_err(|e| params.invalid(0, e.to_string()))?;
            Ok(Arc::new(FilterAttribute {
                pattern: pattern.to_string(),
            }))
        },
    )
}

#[derive(Debug)]
struct FilterAttribute {
    pattern: String,
}

impl ActionInstance for FilterAttribute {
    fn invoke(&self, _ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        let mut result = MappingResult::new();
        result.add_attribute_filter(self.pattern.clone());
        Ok(ActionOutcome::Continue(result))
    }
}
