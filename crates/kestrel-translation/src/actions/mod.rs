//! Built-in action types.
//!
//! | Action | Profile | Effect |
//! |--------|---------|--------|
//! | `mapIdentity` | input | identity proposal per value |
//! | `mapAttribute` | input | attribute proposal |
//! | `mapGroup` | input | group membership per path |
//! | `entityChange` | input | schedule disable/remove of the entity |
//! | `assignCredentialRequirement` | input | credential requirement directive |
//! | `removeStaleData` | input | drop data no longer asserted by the idp |
//! | `includeInputProfile` | input | run another input profile |
//! | `stopProcessing` | input | stop the profile |
//! | `createAttribute` | output | released attribute |
//! | `filterAttribute` | output | hide attributes by name pattern |
//! | `includeOutputProfile` | output | run another output profile |
//! | `stopOutputProcessing` | output | stop the profile |

mod attribute;
mod blind;
mod control;
mod entity;
mod group;
mod identity;
mod output;
mod values;

pub use blind::BlindAction;

use crate::action::{ActionInstance, TranslationActionFactory, TranslationActionType};
use crate::error::TranslationError;
use crate::params::ActionParameterDefinition;
use crate::registry::ActionTypeRegistry;
use kestrel_expr::Expression;
use std::str::FromStr;
use std::sync::Arc;

/// Names of the built-in action types.
pub mod names {
    pub const MAP_IDENTITY: &str = "mapIdentity";
    pub const MAP_ATTRIBUTE: &str = "mapAttribute";
    pub const MAP_GROUP: &str = "mapGroup";
    pub const ENTITY_CHANGE: &str = "entityChange";
    pub const ASSIGN_CREDENTIAL_REQUIREMENT: &str = "assignCredentialRequirement";
    pub const REMOVE_STALE_DATA: &str = "removeStaleData";
    pub const INCLUDE_INPUT_PROFILE: &str = "includeInputProfile";
    pub const STOP_PROCESSING: &str = "stopProcessing";
    pub const CREATE_ATTRIBUTE: &str = "createAttribute";
    pub const FILTER_ATTRIBUTE: &str = "filterAttribute";
    pub const INCLUDE_OUTPUT_PROFILE: &str = "includeOutputProfile";
    pub const STOP_OUTPUT_PROCESSING: &str = "stopOutputProcessing";
}

/// Registers every built-in action type.
pub fn register_builtin_actions(registry: &ActionTypeRegistry) -> Result<(), TranslationError> {
    let factories = [
        identity::map_identity(),
        attribute::map_attribute(),
        group::map_group(),
        entity::entity_change(),
        entity::assign_credential_requirement(),
        entity::remove_stale_data(),
        control::include_input_profile(),
        control::stop_processing(),
        output::create_attribute(),
        output::filter_attribute(),
        control::include_output_profile(),
        control::stop_output_processing(),
    ];
    for factory in factories {
        registry.register(Arc::new(factory))?;
    }
    Ok(())
}

type BuildFn = fn(&Params<'_>) -> Result<Arc<dyn ActionInstance>, TranslationError>;

/// Factory of a built-in action: a type description plus a constructor.
pub(crate) struct BuiltinFactory {
    action_type: TranslationActionType,
    build: BuildFn,
}

impl BuiltinFactory {
    pub(crate) fn new(action_type: TranslationActionType, build: BuildFn) -> Self {
        Self { action_type, build }
    }
}

impl TranslationActionFactory for BuiltinFactory {
    fn action_type(&self) -> &TranslationActionType {
        &self.action_type
    }

    fn new_instance(
        &self,
        parameters: &[Option<String>],
    ) -> Result<Arc<dyn ActionInstance>, TranslationError> {
        (self.build)(&Params::new(&self.action_type, parameters))
    }
}

/// Typed access to positional parameter values.
pub(crate) struct Params<'a> {
    action: &'a str,
    definitions: &'a [ActionParameterDefinition],
    values: &'a [Option<String>],
}

impl<'a> Params<'a> {
    pub(crate) fn new(action_type: &'a TranslationActionType, values: &'a [Option<String>]) -> Self {
        Self {
            action: action_type.name(),
            definitions: action_type.parameters(),
            values,
        }
    }

    pub(crate) fn action(&self) -> &'a str {
        self.action
    }

    fn parameter_name(&self, index: usize) -> &'a str {
        self.definitions
            .get(index)
            .map_or("?", |d| d.name.as_str())
    }

    pub(crate) fn invalid(&self, index: usize, reason: impl Into<String>) -> TranslationError {
        TranslationError::invalid_parameter(self.action, self.parameter_name(index), reason)
    }

    /// Non-empty value at `index`.
    pub(crate) fn get(&self, index: usize) -> Option<&'a str> {
        self.values
            .get(index)
            .and_then(|v| v.as_deref())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn required(&self, index: usize) -> Result<&'a str, TranslationError> {
        self.get(index)
            .ok_or_else(|| TranslationError::MissingParameter {
                action: self.action.to_string(),
                parameter: self.parameter_name(index).to_string(),
                index,
            })
    }

    pub(crate) fn enumeration<T>(&self, index: usize) -> Result<Option<T>, TranslationError>
    where
        T: FromStr<Err = String>,
    {
        self.get(index)
            .map(|v| v.parse::<T>().map_err(|reason| self.invalid(index, reason)))
            .transpose()
    }

    pub(crate) fn expression(&self, index: usize) -> Result<Option<Expression>, TranslationError> {
        self.get(index)
            .map(|v| kestrel_expr::compile(v).map_err(|e| self.invalid(index, e.to_string())))
            .transpose()
    }
}
