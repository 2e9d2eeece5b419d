//! Remote authentication input.
//!
//! An [`AuthnContext`] is what a protocol adapter (SAML, OAuth, LDAP, local
//! credentials) hands to the translation engine after a successful remote
//! authentication. For output profiles the same structure carries the local
//! entity data that is about to be released to a relying party.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An identity asserted by the remote party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    /// Identity type name, e.g. `userName`, `email`, `x500Name`.
    #[serde(rename = "type")]
    pub identity_type: String,
    pub value: String,
}

/// A (possibly multi-valued) attribute asserted by the remote party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAttribute {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl RemoteAttribute {
    /// First value, if any.
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// A group membership asserted by the remote party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGroupMembership {
    pub group: String,
}

/// Input of a translation profile execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthnContext {
    /// Name of the identity provider (or requester, for output profiles).
    pub idp: String,

    #[serde(default)]
    pub identities: Vec<RemoteIdentity>,

    #[serde(default)]
    pub attributes: Vec<RemoteAttribute>,

    #[serde(default)]
    pub groups: Vec<RemoteGroupMembership>,

    /// Free-form request metadata (protocol, requester, session details).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl AuthnContext {
    pub fn new(idp: impl Into<String>) -> Self {
        Self {
            idp: idp.into(),
            ..Self::default()
        }
    }

    pub fn with_identity(mut self, identity_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.identities.push(RemoteIdentity {
            identity_type: identity_type.into(),
            value: value.into(),
        });
        self
    }

    /// Adds values to an attribute, creating it when absent.
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let name = name.into();
        let values = values.into_iter().map(Into::into);
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.values.extend(values),
            None => self.attributes.push(RemoteAttribute {
                name,
                values: values.collect(),
            }),
        }
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(RemoteGroupMembership {
            group: group.into(),
        });
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&RemoteAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// All remote identity values of the given type, in assertion order.
    pub fn identities_of_type<'a>(&'a self, identity_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.identities
            .iter()
            .filter(move |id| id.identity_type == identity_type)
            .map(|id| id.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_attribute_merges_same_name() {
        let ctx = AuthnContext::new("idp")
            .with_attribute("mail", ["a@example.com"])
            .with_attribute("mail", ["b@example.com"]);

        assert_eq!(ctx.attributes.len(), 1);
        assert_eq!(
            ctx.attribute("mail").unwrap().values,
            vec!["a@example.com", "b@example.com"]
        );
        assert_eq!(ctx.attribute("mail").unwrap().first_value(), Some("a@example.com"));
    }

    #[test]
    fn test_identities_of_type() {
        let ctx = AuthnContext::new("idp")
            .with_identity("email", "a@example.com")
            .with_identity("userName", "alice")
            .with_identity("email", "b@example.com");

        let emails: Vec<_> = ctx.identities_of_type("email").collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
        assert_eq!(ctx.identities_of_type("x500Name").count(), 0);
    }

    #[test]
    fn test_deserialize_minimal() {
        let ctx: AuthnContext = serde_json::from_str(r#"{"idp": "saml-idp"}"#).unwrap();
        assert_eq!(ctx.idp, "saml-idp");
        assert!(ctx.identities.is_empty());
        assert!(ctx.metadata.is_empty());
    }

    #[test]
    fn test_deserialize_full() {
        let json = r#"{
            "idp": "oauth",
            "identities": [{"type": "email", "value": "a@b.com"}],
            "attributes": [{"name": "cn", "values": ["Alice"]}],
            "groups": [{"group": "staff"}],
            "metadata": {"protocol": "OAuth2"}
        }"#;
        let ctx: AuthnContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.identities[0].identity_type, "email");
        assert_eq!(ctx.groups[0].group, "staff");
        assert_eq!(ctx.metadata["protocol"], "OAuth2");
    }
}
