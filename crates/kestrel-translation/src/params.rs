//! Action parameter definitions.

use std::fmt;

/// The kind of value an action parameter holds.
///
/// Kinds drive authoring UIs and the generic checks in
/// [`ParameterKind::validate`]; type-specific parsing happens in the factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    Text,
    LargeText,
    LocalizedText,
    Numeric,
    Boolean,
    /// One of a fixed set of values.
    Enumeration(Vec<String>),
    Expression,
    GroupPath,
    AttributeType,
    IdentityType,
    CredentialRequirement,
    /// Name of another translation profile.
    ProfileReference,
    RegularExpression,
}

impl ParameterKind {
    pub fn enumeration(values: &[&str]) -> Self {
        Self::Enumeration(values.iter().map(|v| v.to_string()).collect())
    }

    /// Checks a non-empty value against this kind.
    pub fn validate(&self, value: &str) -> Result<(), String> {
        match self {
            Self::Enumeration(allowed) => {
                if allowed.iter().any(|a| a == value) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not one of {}", value, allowed.join(", ")))
                }
            }
            Self::Numeric => value
                .trim()
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("'{value}' is not a number")),
            Self::Boolean => match value {
                "true" | "false" => Ok(()),
                _ => Err(format!("'{value}' is not a boolean")),
            },
            Self::GroupPath => {
                if value.starts_with('/') {
                    Ok(())
                } else {
                    Err(format!("group path '{value}' must start with '/'"))
                }
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::LargeText => write!(f, "large text"),
            Self::LocalizedText => write!(f, "localized text"),
            Self::Numeric => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Enumeration(values) => write!(f, "one of [{}]", values.join(", ")),
            Self::Expression => write!(f, "expression"),
            Self::GroupPath => write!(f, "group path"),
            Self::AttributeType => write!(f, "attribute type"),
            Self::IdentityType => write!(f, "identity type"),
            Self::CredentialRequirement => write!(f, "credential requirement"),
            Self::ProfileReference => write!(f, "profile name"),
            Self::RegularExpression => write!(f, "regular expression"),
        }
    }
}

/// One positional parameter of an action type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionParameterDefinition {
    pub name: String,
    pub kind: ParameterKind,
    pub mandatory: bool,
    pub description: String,
}

impl ActionParameterDefinition {
    pub fn mandatory(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mandatory: true,
            description: String::new(),
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mandatory: false,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
