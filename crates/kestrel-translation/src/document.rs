//! Versioned JSON representation of translation profiles.
//!
//! ```json
//! {
//!   "ver": "2",
//!   "name": "saml-default",
//!   "description": "",
//!   "type": "INPUT",
//!   "mode": "DEFAULT",
//!   "rules": [
//!     {"condition": "true", "action": {"name": "mapAttribute", "parameters": ["email", "/", "CREATE_OR_UPDATE", null]}}
//!   ]
//! }
//! ```
//!
//! Missing `ver`, `type` and `mode` default to the current version, INPUT
//! and DEFAULT. Conditions are also accepted in the object form
//! `{"conditionValue": "..."}`.

use crate::action::TranslationAction;
use crate::condition::{DEFAULT_CONDITION, TranslationCondition};
use crate::error::TranslationError;
use crate::profile::TranslationProfile;
use crate::registry::{ActionTypeRegistry, blind_action};
use crate::rule::TranslationRule;
use crate::types::{ProfileMode, ProfileType};
use serde::{Deserialize, Deserializer, Serialize};

/// Version written by [`TranslationProfile::to_document`].
pub const DOCUMENT_VERSION: &str = "2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default)]
    pub ver: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub profile_type: ProfileType,
    #[serde(default)]
    pub mode: ProfileMode,
    #[serde(default)]
    pub rules: Vec<RuleDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default = "default_condition", deserialize_with = "deserialize_condition")]
    pub condition: String,
    pub action: ActionDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDocument {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Option<String>>,
}

fn default_condition() -> String {
    DEFAULT_CONDITION.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConditionForm {
    Text(String),
    Legacy {
        #[serde(rename = "conditionValue")]
        condition_value: Option<String>,
    },
}

fn deserialize_condition<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let form = Option::<ConditionForm>::deserialize(deserializer)?;
    let text = match form {
        Some(ConditionForm::Text(text)) => Some(text),
        Some(ConditionForm::Legacy { condition_value }) => condition_value,
        None => None,
    };
    Ok(text
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(default_condition))
}

/// How failures are handled while turning a document into a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Any invalid rule fails the whole document.
    Strict,
    /// Invalid rules degrade to blind actions, logged at error level.
    Lenient,
}

impl ProfileDocument {
    pub fn from_json(json: &str) -> Result<Self, TranslationError> {
        let document: Self = serde_json::from_str(json)?;
        if let Some(ver) = &document.ver {
            if ver != DOCUMENT_VERSION {
                return Err(TranslationError::UnsupportedVersion(ver.clone()));
            }
        }
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String, TranslationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the profile, instantiating every action through `registry`.
    pub fn into_profile(
        self,
        registry: &ActionTypeRegistry,
        mode: LoadMode,
    ) -> Result<TranslationProfile, TranslationError> {
        let profile_type = self.profile_type;
        let mut rules = Vec::with_capacity(self.rules.len());
        for (index, rule) in self.rules.into_iter().enumerate() {
            let rule = match mode {
                LoadMode::Strict => strict_rule(rule, registry).map_err(|e| e.in_rule(index))?,
                LoadMode::Lenient => lenient_rule(rule, registry, profile_type, &self.name, index),
            };
            rules.push(rule);
        }
        Ok(TranslationProfile::new(self.name, self.description, profile_type, rules)?
            .with_mode(self.mode))
    }
}

fn strict_rule(rule: RuleDocument, registry: &ActionTypeRegistry) -> Result<TranslationRule, TranslationError> {
    let condition = TranslationCondition::new(rule.condition)?;
    let action = registry.instantiate(&rule.action.name, rule.action.parameters)?;
    Ok(TranslationRule::new(condition, action))
}

fn lenient_rule(
    rule: RuleDocument,
    registry: &ActionTypeRegistry,
    profile_type: ProfileType,
    profile: &str,
    index: usize,
) -> TranslationRule {
    let ActionDocument { name, parameters } = rule.action;

    let condition = match TranslationCondition::new(rule.condition.clone()) {
        Ok(condition) => condition,
        Err(e) => {
            tracing::error!(
                profile = %profile,
                rule = index,
                error = %e,
                "cannot restore rule condition, the rule is disabled"
            );
            let action = blind_action(&name, parameters, e.to_string());
            return TranslationRule::new(TranslationCondition::disabled(rule.condition), action);
        }
    };

    let action = registry.instantiate_lenient(&name, parameters);
    TranslationRule::new(condition, fit_profile_type(action, profile_type, profile, index))
}

/// Replaces an action meant for the other profile type with a blind one.
fn fit_profile_type(
    action: TranslationAction,
    profile_type: ProfileType,
    profile: &str,
    index: usize,
) -> TranslationAction {
    match action.supported_profile_type() {
        Some(action_type) if action_type != profile_type => {
            let reason = TranslationError::IncompatibleAction {
                action: action.name().to_string(),
                action_type,
                profile_type,
            }
            .to_string();
            tracing::error!(profile = %profile, rule = index, error = %reason, "cannot restore action");
            blind_action(action.name(), action.parameters().to_vec(), reason)
        }
        _ => action,
    }
}

impl TranslationProfile {
    /// Parses a document, rejecting any invalid rule.
    pub fn from_json(json: &str, registry: &ActionTypeRegistry) -> Result<Self, TranslationError> {
        ProfileDocument::from_json(json)?.into_profile(registry, LoadMode::Strict)
    }

    /// Parses a stored document. Rules that cannot be restored are kept as
    /// blind actions so the rest of the profile stays usable.
    pub fn rehydrate(json: &str, registry: &ActionTypeRegistry) -> Result<Self, TranslationError> {
        ProfileDocument::from_json(json)?.into_profile(registry, LoadMode::Lenient)
    }

    pub fn to_document(&self) -> ProfileDocument {
        ProfileDocument {
            ver: Some(DOCUMENT_VERSION.to_string()),
            name: self.name().to_string(),
            description: self.description().to_string(),
            profile_type: self.profile_type(),
            mode: self.mode(),
            rules: self
                .rules()
                .iter()
                .map(|rule| RuleDocument {
                    condition: rule.condition().source().to_string(),
                    action: ActionDocument {
                        name: rule.action().name().to_string(),
                        parameters: rule.action().parameters().to_vec(),
                    },
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, TranslationError> {
        self.to_document().to_json()
    }
}
