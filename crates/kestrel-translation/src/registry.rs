//! Registry of action types.
//!
//! The factory map is copy-on-write: lookups load the current map without
//! locking, registrations clone it and swap the new map in.

use crate::action::{TranslationAction, TranslationActionFactory, TranslationActionType};
use crate::actions::{BlindAction, register_builtin_actions};
use crate::error::TranslationError;
use crate::types::ProfileType;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

type FactoryMap = HashMap<String, Arc<dyn TranslationActionFactory>>;

/// Maps action type names to their factories.
pub struct ActionTypeRegistry {
    factories: ArcSwap<FactoryMap>,
    /// Serializes writers; readers never take it.
    write_lock: Mutex<()>,
}

impl Default for ActionTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: ArcSwap::from_pointee(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a registry holding every built-in action type.
    pub fn with_builtin_actions() -> Result<Self, TranslationError> {
        let registry = Self::new();
        register_builtin_actions(&registry)?;
        Ok(registry)
    }

    pub fn register(&self, factory: Arc<dyn TranslationActionFactory>) -> Result<(), TranslationError> {
        let name = factory.action_type().name().to_string();
        self.modify(|factories| {
            if factories.contains_key(&name) {
                return Err(TranslationError::DuplicateActionType { name: name.clone() });
            }
            factories.insert(name.clone(), factory);
            Ok(())
        })?;
        tracing::debug!(action = %name, "registered action type");
        Ok(())
    }

    /// Removes an action type. Returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.modify(|factories| Ok::<_, TranslationError>(factories.remove(name).is_some()))
            .unwrap_or(false)
    }

    fn modify<T, E>(&self, f: impl FnOnce(&mut FactoryMap) -> Result<T, E>) -> Result<T, E> {
        // a poisoned lock only means another writer panicked; the map itself is intact
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut factories = FactoryMap::clone(&self.factories.load());
        let value = f(&mut factories)?;
        self.factories.store(Arc::new(factories));
        Ok(value)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn TranslationActionFactory>> {
        self.factories.load().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.load().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.load().is_empty()
    }

    /// Registered action types, optionally restricted to one profile type,
    /// sorted by name.
    pub fn action_types(&self, profile_type: Option<ProfileType>) -> Vec<TranslationActionType> {
        let mut types: Vec<TranslationActionType> = self
            .factories
            .load()
            .values()
            .map(|f| f.action_type().clone())
            .filter(|t| profile_type.is_none_or(|p| t.supported_profile_type() == p))
            .collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        types
    }

    /// Builds a configured action, validating its parameters first.
    pub fn instantiate(
        &self,
        name: &str,
        parameters: Vec<Option<String>>,
    ) -> Result<TranslationAction, TranslationError> {
        let factory = self
            .lookup(name)
            .ok_or_else(|| TranslationError::UnknownActionType {
                name: name.to_string(),
            })?;
        let action_type = factory.action_type();
        validate_parameters(action_type, &parameters)?;
        let instance = factory.new_instance(&parameters)?;
        Ok(TranslationAction::new(
            name,
            parameters,
            Some(action_type.supported_profile_type()),
            instance,
        ))
    }

    /// Like [`ActionTypeRegistry::instantiate`], but degrades to a blind
    /// action that keeps the name and parameters when building fails.
    pub fn instantiate_lenient(&self, name: &str, parameters: Vec<Option<String>>) -> TranslationAction {
        match self.instantiate(name, parameters.clone()) {
            Ok(action) => action,
            Err(e) => {
                tracing::error!(
                    action = %name,
                    error = %e,
                    "cannot restore action, replacing it with a blind action"
                );
                blind_action(name, parameters, e.to_string())
            }
        }
    }
}

impl fmt::Debug for ActionTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factories = self.factories.load();
        let mut names: Vec<&str> = factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ActionTypeRegistry")
            .field("action_types", &names)
            .finish()
    }
}

pub(crate) fn blind_action(
    name: &str,
    parameters: Vec<Option<String>>,
    reason: impl Into<String>,
) -> TranslationAction {
    TranslationAction::new(name, parameters, None, Arc::new(BlindAction::new(reason)))
}

/// Checks arity, mandatory slots and generic parameter kinds.
pub fn validate_parameters(
    action_type: &TranslationActionType,
    parameters: &[Option<String>],
) -> Result<(), TranslationError> {
    let action = action_type.name();
    let definitions = action_type.parameters();
    let declared = definitions.len();
    let mandatory = action_type.mandatory_count();
    let got = parameters.len();

    if got < mandatory {
        return Err(TranslationError::TooFewParameters {
            action: action.to_string(),
            required: mandatory,
            exact: mandatory == declared,
            got,
        });
    }
    if got > declared {
        return Err(if declared == 0 {
            TranslationError::NoParametersAccepted {
                action: action.to_string(),
                got,
            }
        } else {
            TranslationError::TooManyParameters {
                action: action.to_string(),
                max: declared,
                got,
            }
        });
    }

    for (index, definition) in definitions.iter().enumerate() {
        let value = parameters
            .get(index)
            .and_then(|v| v.as_deref())
            .filter(|v| !v.is_empty());
        match value {
            None if definition.mandatory => {
                return Err(TranslationError::MissingParameter {
                    action: action.to_string(),
                    parameter: definition.name.clone(),
                    index,
                });
            }
            None => {}
            Some(value) => definition
                .kind
                .validate(value)
                .map_err(|reason| TranslationError::invalid_parameter(action, &definition.name, reason))?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionInstance, ActionOutcome, ExecutionContext};
    use crate::actions::names;
    use crate::params::{ActionParameterDefinition, ParameterKind};
    use crate::result::MappingResult;

    #[derive(Debug)]
    struct Noop;

    impl ActionInstance for Noop {
        fn invoke(&self, _ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
            Ok(ActionOutcome::Continue(MappingResult::new()))
        }
    }

    struct TestFactory(TranslationActionType);

    impl TranslationActionFactory for TestFactory {
        fn action_type(&self) -> &TranslationActionType {
            &self.0
        }

        fn new_instance(
            &self,
            _parameters: &[Option<String>],
        ) -> Result<Arc<dyn ActionInstance>, TranslationError> {
            Ok(Arc::new(Noop))
        }
    }

    fn factory(name: &str, parameters: Vec<ActionParameterDefinition>) -> Arc<dyn TranslationActionFactory> {
        Arc::new(TestFactory(TranslationActionType::new(
            name,
            ProfileType::Input,
            "test",
            parameters,
        )))
    }

    fn values(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn two_plus_one() -> ActionTypeRegistry {
        let registry = ActionTypeRegistry::new();
        registry
            .register(factory(
                "twoPlusOne",
                vec![
                    ActionParameterDefinition::mandatory("first", ParameterKind::Text),
                    ActionParameterDefinition::mandatory("second", ParameterKind::Text),
                    ActionParameterDefinition::optional("third", ParameterKind::Text),
                ],
            ))
            .unwrap();
        registry
    }

    #[test]
    fn test_too_few_parameters_says_min() {
        let err = two_plus_one().instantiate("twoPlusOne", values(&["a"])).unwrap_err();
        assert!(matches!(err, TranslationError::TooFewParameters { required: 2, exact: false, got: 1, .. }));
        assert!(err.to_string().contains("requires min 2"), "{err}");
    }

    #[test]
    fn test_too_few_parameters_says_exactly() {
        let registry = ActionTypeRegistry::new();
        registry
            .register(factory(
                "two",
                vec![
                    ActionParameterDefinition::mandatory("first", ParameterKind::Text),
                    ActionParameterDefinition::mandatory("second", ParameterKind::Text),
                ],
            ))
            .unwrap();
        let err = registry.instantiate("two", values(&["a"])).unwrap_err();
        assert!(err.to_string().contains("requires exactly 2"), "{err}");
    }

    #[test]
    fn test_too_many_parameters() {
        let err = two_plus_one()
            .instantiate("twoPlusOne", values(&["a", "b", "c", "d"]))
            .unwrap_err();
        assert!(err.to_string().contains("requires max 3"), "{err}");
    }

    #[test]
    fn test_no_parameters_accepted() {
        let registry = ActionTypeRegistry::new();
        registry.register(factory("none", Vec::new())).unwrap();
        let err = registry.instantiate("none", values(&["a"])).unwrap_err();
        assert!(matches!(err, TranslationError::NoParametersAccepted { got: 1, .. }));
        assert!(err.to_string().contains("no parameters accepted"));
    }

    #[test]
    fn test_exact_mandatory_count_succeeds() {
        let action = two_plus_one().instantiate("twoPlusOne", values(&["a", "b"])).unwrap();
        assert_eq!(action.name(), "twoPlusOne");
        assert_eq!(action.supported_profile_type(), Some(ProfileType::Input));
    }

    #[test]
    fn test_empty_mandatory_value_names_parameter() {
        let err = two_plus_one()
            .instantiate("twoPlusOne", vec![Some("a".into()), Some(String::new())])
            .unwrap_err();
        assert!(matches!(err, TranslationError::MissingParameter { index: 1, .. }));
        assert!(err.to_string().contains("'second'"));
    }

    #[test]
    fn test_generic_kind_validation() {
        let registry = ActionTypeRegistry::with_builtin_actions().unwrap();
        let err = registry
            .instantiate(names::MAP_ATTRIBUTE, values(&["email", "no-slash", "CREATE_ONLY"]))
            .unwrap_err();
        assert!(err.to_string().contains("must start with '/'"), "{err}");

        let err = registry
            .instantiate(names::MAP_IDENTITY, values(&["email", "SOMETIMES"]))
            .unwrap_err();
        assert!(err.to_string().contains("is not one of"), "{err}");

        let err = registry
            .instantiate(names::ENTITY_CHANGE, values(&["DISABLE", "ten"]))
            .unwrap_err();
        assert!(err.to_string().contains("is not a number"), "{err}");
    }

    #[test]
    fn test_unknown_action_type() {
        let registry = ActionTypeRegistry::new();
        assert!(matches!(
            registry.instantiate("nope", Vec::new()),
            Err(TranslationError::UnknownActionType { .. })
        ));
    }

    #[test]
    fn test_instantiate_lenient_keeps_name_and_parameters() {
        let registry = ActionTypeRegistry::new();
        let action = registry.instantiate_lenient("pluginAction", vec![Some("x".into()), None]);
        assert_eq!(action.name(), "pluginAction");
        assert_eq!(action.parameters(), &[Some("x".to_string()), None]);
        assert_eq!(action.supported_profile_type(), None);
    }

    #[test]
    fn test_unregister() {
        let registry = two_plus_one();
        assert!(registry.unregister("twoPlusOne"));
        assert!(!registry.unregister("twoPlusOne"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_action_types_are_sorted() {
        let registry = ActionTypeRegistry::with_builtin_actions().unwrap();
        let output: Vec<String> = registry
            .action_types(Some(ProfileType::Output))
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(
            output,
            vec!["createAttribute", "filterAttribute", "includeOutputProfile", "stopOutputProcessing"]
        );
    }
}
