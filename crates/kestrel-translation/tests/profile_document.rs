//! Profile document tests: serialization round-trips, lenient rehydration
//! and schema conformance of emitted documents.

use kestrel_core::AuthnContext;
use kestrel_translation::actions::names;
use kestrel_translation::{
    ActionInstance, ActionOutcome, ActionParameterDefinition, ActionTypeRegistry,
    ExecutionContext, MappingResult, ParameterKind, ProfileMode, ProfileType,
    TranslationActionFactory, TranslationActionType, TranslationCondition, TranslationError,
    TranslationProfile, TranslationRule,
};
use serde_json::{Value, json};
use std::sync::Arc;

const SCHEMA: &str = include_str!("../../../schemas/TranslationProfile.schema.json");

fn registry() -> ActionTypeRegistry {
    ActionTypeRegistry::with_builtin_actions().unwrap()
}

fn sample_profile(registry: &ActionTypeRegistry) -> TranslationProfile {
    let rules = vec![
        TranslationRule::new(
            TranslationCondition::new("attr['email'] != null").unwrap(),
            registry
                .instantiate(
                    names::MAP_ATTRIBUTE,
                    vec![
                        Some("email".into()),
                        Some("/".into()),
                        Some("CREATE_OR_UPDATE".into()),
                        None,
                    ],
                )
                .unwrap(),
        ),
        TranslationRule::unconditional(
            registry
                .instantiate(names::MAP_IDENTITY, vec![Some("email".into()), Some("MATCH".into())])
                .unwrap(),
        ),
    ];
    TranslationProfile::new("sample", "Maps e-mail", ProfileType::Input, rules).unwrap()
}

fn assert_valid(instance: &Value) {
    let schema: Value = serde_json::from_str(SCHEMA).expect("schema must parse");
    let validator = jsonschema::draft202012::options()
        .build(&schema)
        .expect("schema must compile");

    if !validator.is_valid(instance) {
        let msgs: Vec<String> = validator
            .iter_errors(instance)
            .take(20)
            .enumerate()
            .map(|(idx, err)| format!("{}: {}", idx + 1, err))
            .collect();
        panic!("profile document did not validate: {}", msgs.join("; "));
    }
}

#[test]
fn test_round_trip_keeps_null_trailing_parameter() {
    let registry = registry();
    let profile = sample_profile(&registry);

    let json = profile.to_json().unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["ver"], "2");
    assert_eq!(value["type"], "INPUT");
    assert_eq!(value["mode"], "DEFAULT");
    assert_eq!(value["rules"][0]["condition"], "attr['email'] != null");
    assert_eq!(
        value["rules"][0]["action"]["parameters"],
        json!(["email", "/", "CREATE_OR_UPDATE", null])
    );

    let restored = TranslationProfile::from_json(&json, &registry).unwrap();
    assert_eq!(restored, profile);
    assert_eq!(restored.to_json().unwrap(), json);
}

#[test]
fn test_emitted_document_matches_schema() {
    let registry = registry();
    let profile = sample_profile(&registry).with_mode(ProfileMode::ReadOnly);
    let value: Value = serde_json::from_str(&profile.to_json().unwrap()).unwrap();
    assert_valid(&value);

    let output = TranslationProfile::from_json(
        r#"{"name": "out", "type": "OUTPUT", "rules": [
            {"condition": "true", "action": {"name": "createAttribute", "parameters": ["a", "'x'"]}},
            {"condition": "true", "action": {"name": "stopOutputProcessing", "parameters": []}}
        ]}"#,
        &registry,
    )
    .unwrap();
    let value: Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();
    assert_valid(&value);
}

#[test]
fn test_legacy_condition_form_is_accepted() {
    let registry = registry();
    let legacy = json!({
        "ver": "2",
        "name": "legacy",
        "description": "",
        "type": "INPUT",
        "mode": "DEFAULT",
        "rules": [
            {"condition": {"conditionValue": "idp == 'x'"}, "action": {"name": "mapGroup", "parameters": ["'/x'"]}}
        ]
    });
    assert_valid(&legacy);

    let profile = TranslationProfile::from_json(&legacy.to_string(), &registry).unwrap();
    assert_eq!(profile.rules()[0].condition().source(), "idp == 'x'");

    let written: Value = serde_json::from_str(&profile.to_json().unwrap()).unwrap();
    assert_eq!(written["rules"][0]["condition"], "idp == 'x'");
}

#[derive(Debug)]
struct TagAction(String);

impl ActionInstance for TagAction {
    fn invoke(&self, _ctx: &ExecutionContext<'_>) -> Result<ActionOutcome, TranslationError> {
        let mut result = MappingResult::new();
        result.add_attribute_filter(self.0.clone());
        Ok(ActionOutcome::Continue(result))
    }
}

struct TagFactory(TranslationActionType);

impl TranslationActionFactory for TagFactory {
    fn action_type(&self) -> &TranslationActionType {
        &self.0
    }

    fn new_instance(&self, parameters: &[Option<String>]) -> Result<Arc<dyn ActionInstance>, TranslationError> {
        let tag = parameters[0].clone().unwrap_or_default();
        Ok(Arc::new(TagAction(tag)))
    }
}

fn tag_factory() -> Arc<dyn TranslationActionFactory> {
    Arc::new(TagFactory(TranslationActionType::new(
        "tag",
        ProfileType::Input,
        "plugin action",
        vec![ActionParameterDefinition::mandatory("tag", ParameterKind::Text)],
    )))
}

#[test]
fn test_rehydration_degrades_unknown_action() {
    let with_plugin = registry();
    with_plugin.register(tag_factory()).unwrap();

    let json = json!({
        "name": "p",
        "rules": [
            {"condition": "true", "action": {"name": "tag", "parameters": ["t1"]}},
            {"condition": "true", "action": {"name": "mapGroup", "parameters": ["'/kept'"]}}
        ]
    })
    .to_string();
    let original = TranslationProfile::from_json(&json, &with_plugin).unwrap();
    let stored = original.to_json().unwrap();

    // the plugin is gone: strict loading fails, rehydration degrades the rule
    let without_plugin = registry();
    let err = TranslationProfile::from_json(&stored, &without_plugin).unwrap_err();
    assert!(matches!(err.root(), TranslationError::UnknownActionType { .. }));

    let restored = TranslationProfile::rehydrate(&stored, &without_plugin).unwrap();
    assert_eq!(restored.rules().len(), 2);
    assert_eq!(restored.rules()[0].action().name(), "tag");
    assert_eq!(restored.rules()[0].action().parameters(), &[Some("t1".to_string())]);

    let result = restored.execute(&AuthnContext::new("idp")).unwrap();
    assert!(result.attribute_filters().is_empty());
    assert!(result.group("/kept").is_some());

    // re-saving keeps the degraded rule intact
    assert_eq!(restored.to_json().unwrap(), stored);
}

#[test]
fn test_rehydration_degrades_invalid_parameters() {
    let registry = registry();
    let stored = json!({
        "ver": "2",
        "name": "p",
        "rules": [
            {"condition": "true", "action": {"name": "mapIdentity", "parameters": ["email"]}},
            {"condition": "idp ==", "action": {"name": "mapGroup", "parameters": ["'/never'"]}},
            {"condition": "true", "action": {"name": "mapGroup", "parameters": ["'/ok'"]}}
        ]
    })
    .to_string();

    let profile = TranslationProfile::rehydrate(&stored, &registry).unwrap();
    let result = profile.execute(&AuthnContext::new("idp").with_identity("email", "a@b.c")).unwrap();
    assert!(result.identities().is_empty());
    assert!(result.group("/never").is_none());
    assert!(result.group("/ok").is_some());
}

#[test]
fn test_overlong_condition_rejected_when_saved() {
    let registry = registry();
    let condition = (0..300).map(|i| format!("idp == 'idp{i}'")).collect::<Vec<_>>().join(" || ");
    let document = json!({
        "name": "many-idps",
        "rules": [
            {"condition": condition, "action": {"name": "mapGroup", "parameters": ["'/never'"]}},
            {"condition": "true", "action": {"name": "mapGroup", "parameters": ["'/ok'"]}}
        ]
    })
    .to_string();

    let err = TranslationProfile::from_json(&document, &registry).unwrap_err();
    assert_eq!(err.rule_index(), Some(0));
    assert!(matches!(err.root(), TranslationError::InvalidCondition { .. }));

    let profile = TranslationProfile::rehydrate(&document, &registry).unwrap();
    let result = profile.execute(&AuthnContext::new("idp0")).unwrap();
    assert!(result.group("/never").is_none());
    assert!(result.group("/ok").is_some());
}
