//! `mapGroup`.

use super::values::evaluate_values;
use super::{BuiltinFactory, Params, names};
use crate::action::{ActionInstance, ActionOutcome, ExecutionContext, TranslationActionType};
use crate::error::TranslationError;
use crate::params::{ActionParameterDefinition, ParameterKind};
use crate::result::{GroupEffectMode, MappedGroup, MappingResult};
use crate::types::ProfileType;
use kestrel_expr::Expression;
use std::sync::Arc;

pub(crate) fn map_group() -> BuiltinFactory {
    BuiltinFactory::new(
        TranslationActionType::new(
            names::MAP_GROUP,
            ProfileType::Input,
            "Adds the entity to the groups the expression evaluates to",
            vec![
                ActionParameterDefinition::mandatory("expression", ParameterKind::Expression)
                    .with_description("Group path or list of group paths"),
                ActionParameterDefinition::optional(
                    "effectMode",
                    ParameterKind::enumeration(GroupEffectMode::VALUES),
                )
                .with_description("Defaults to ADD_IF_EXISTS"),
            ],
        ),
        build,
    )
}

fn build(params: &Params<'_>) -> Result<Arc<dyn ActionInstance>, TranslationError> {
    let expression = params
        .expression(0)?
        .ok_or_else(|| params.invalid(0, "missing expression"))?;
    let mode = params
        .enumeration::<GroupEffectMode>(1)?
        .unwrap_or(GroupEffectMode::AddIfExists);
    Ok(Arc::new(MapGroup { expression, mode }))
}

#[derive(Debug)]
struct MapGroup {
    expression: Expression,
    mode: GroupEffectMode,
}

impl ActionInstance for MapGroup {
    fn invoke(&self, ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        let paths = evaluate_values(names::MAP_GROUP, &self.expression, ctx.vars)?;
        let mut result = MappingResult::new();

        for path in paths {
            if !path.starts_with('/') {
                tracing::warn!(group = %path, "ignoring mapped group that is not an absolute path");
                continue;
            }
            result.add_group(MappedGroup {
                group: path,
                mode: self.mode,
                idp: ctx.input.idp.clone(),
                profile: ctx.profile_name.to_string(),
            });
        }
        Ok(ActionOutcome::Continue(result))
    }
}
