//! Expression variables exposed to conditions and actions.
//!
//! | Variable | Content |
//! |----------|---------|
//! | `idp` | identity provider (or requester) name |
//! | `id`, `idType` | first remote identity value and type, `null` if none |
//! | `idsByType` | identity type → list of values |
//! | `attr`, `remoteAttr` | attribute name → first value (`""` when valueless) |
//! | `attrs` | attribute name → list of values |
//! | `groups` | list of remote group names |
//! | `metadata` | request metadata object |
//! | `mappedAttrs` | output profiles: attribute name → values mapped so far |
//! | `mappedIds` | output profiles: identity type → values mapped so far |

use crate::result::MappingResult;
use kestrel_core::AuthnContext;
use kestrel_expr::Vars;
use serde_json::{Map, Value};

pub const VAR_IDP: &str = "idp";
pub const VAR_ID: &str = "id";
pub const VAR_ID_TYPE: &str = "idType";
pub const VAR_IDS_BY_TYPE: &str = "idsByType";
pub const VAR_ATTR: &str = "attr";
pub const VAR_REMOTE_ATTR: &str = "remoteAttr";
pub const VAR_ATTRS: &str = "attrs";
pub const VAR_GROUPS: &str = "groups";
pub const VAR_METADATA: &str = "metadata";
pub const VAR_MAPPED_ATTRS: &str = "mappedAttrs";
pub const VAR_MAPPED_IDS: &str = "mappedIds";

/// Builds the variables derived from the execution input.
pub fn input_vars(input: &AuthnContext) -> Vars {
    let mut vars = Vars::new();
    vars.insert(VAR_IDP, input.idp.clone());

    let first = input.identities.first();
    vars.insert(VAR_ID, first.map_or(Value::Null, |i| Value::from(i.value.clone())));
    vars.insert(
        VAR_ID_TYPE,
        first.map_or(Value::Null, |i| Value::from(i.identity_type.clone())),
    );

    let mut ids_by_type: Map<String, Value> = Map::new();
    for identity in &input.identities {
        push_value(&mut ids_by_type, &identity.identity_type, &identity.value);
    }
    vars.insert(VAR_IDS_BY_TYPE, Value::Object(ids_by_type));

    // repeated names (possible in deserialized input) merge in order
    let mut attrs = Map::new();
    for attribute in &input.attributes {
        attrs
            .entry(attribute.name.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        for value in &attribute.values {
            push_value(&mut attrs, &attribute.name, value);
        }
    }
    let attr: Map<String, Value> = attrs
        .iter()
        .map(|(name, values)| {
            let first = values
                .as_array()
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_else(|| Value::from(""));
            (name.clone(), first)
        })
        .collect();
    let attr = Value::Object(attr);
    vars.insert(VAR_ATTR, attr.clone());
    vars.insert(VAR_REMOTE_ATTR, attr);
    vars.insert(VAR_ATTRS, Value::Object(attrs));

    let groups: Vec<Value> = input
        .groups
        .iter()
        .map(|g| Value::from(g.group.clone()))
        .collect();
    vars.insert(VAR_GROUPS, Value::Array(groups));
    vars.insert(VAR_METADATA, Value::Object(input.metadata.clone()));

    vars
}

/// Copies `base` and adds the mapped-state variables of output profiles.
pub fn with_mapped_state(base: &Vars, mapped: &MappingResult) -> Vars {
    let mut vars = base.clone();

    let mut mapped_attrs = Map::new();
    for attribute in mapped.attributes() {
        // first group wins for the name-only view
        if !mapped_attrs.contains_key(&attribute.name) {
            mapped_attrs.insert(
                attribute.name.clone(),
                Value::from(attribute.values.clone()),
            );
        }
    }
    vars.insert(VAR_MAPPED_ATTRS, Value::Object(mapped_attrs));

    let mut mapped_ids = Map::new();
    for identity in mapped.identities() {
        push_value(&mut mapped_ids, &identity.identity_type, &identity.value);
    }
    vars.insert(VAR_MAPPED_IDS, Value::Object(mapped_ids));

    vars
}

fn push_value(map: &mut Map<String, Value>, key: &str, value: &str) {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(values) = entry {
        values.push(Value::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input() -> AuthnContext {
        AuthnContext::new("saml-idp")
            .with_identity("email", "a@b.com")
            .with_identity("userName", "alice")
            .with_identity("email", "c@d.com")
            .with_attribute("cn", ["Alice", "Al"])
            .with_attribute("empty", Vec::<String>::new())
            .with_group("staff")
            .with_metadata("protocol", "SAML2")
    }

    #[test]
    fn test_repeated_attribute_entries_merge() {
        let input: AuthnContext = serde_json::from_value(json!({
            "idp": "saml-idp",
            "attributes": [
                {"name": "mail", "values": []},
                {"name": "mail", "values": ["a@example.com"]},
                {"name": "cn", "values": ["Alice"]},
                {"name": "mail", "values": ["b@example.com"]}
            ]
        }))
        .unwrap();

        let vars = input_vars(&input);
        assert_eq!(
            vars.get("attrs"),
            Some(&json!({"mail": ["a@example.com", "b@example.com"], "cn": ["Alice"]}))
        );
        assert_eq!(vars.get("attr"), Some(&json!({"mail": "a@example.com", "cn": "Alice"})));
    }

    #[test]
    fn test_input_vars() {
        let vars = input_vars(&input());

        assert_eq!(vars.get("idp"), Some(&json!("saml-idp")));
        assert_eq!(vars.get("id"), Some(&json!("a@b.com")));
        assert_eq!(vars.get("idType"), Some(&json!("email")));
        assert_eq!(
            vars.get("idsByType"),
            Some(&json!({"email": ["a@b.com", "c@d.com"], "userName": ["alice"]}))
        );
        assert_eq!(vars.get("attr"), Some(&json!({"cn": "Alice", "empty": ""})));
        assert_eq!(vars.get("remoteAttr"), vars.get("attr"));
        assert_eq!(vars.get("attrs"), Some(&json!({"cn": ["Alice", "Al"], "empty": []})));
        assert_eq!(vars.get("groups"), Some(&json!(["staff"])));
        assert_eq!(vars.get("metadata"), Some(&json!({"protocol": "SAML2"})));
        assert!(!vars.contains("mappedAttrs"));
    }

    #[test]
    fn test_no_identities_gives_null_id() {
        let vars = input_vars(&AuthnContext::new("idp"));
        assert_eq!(vars.get("id"), Some(&Value::Null));
        assert_eq!(vars.get("idType"), Some(&Value::Null));
        assert_eq!(vars.get("idsByType"), Some(&json!({})));
    }

    #[test]
    fn test_with_mapped_state() {
        let mapped: MappingResult = serde_json::from_value(json!({
            "identities": [{"type": "email", "value": "a@b.com", "mode": "MATCH", "idp": "i", "profile": "p"}],
            "attributes": [{"name": "cn", "group": "/", "values": ["Alice"], "mode": "CREATE_OR_UPDATE", "idp": "i", "profile": "p"}],
            "groups": []
        }))
        .unwrap();

        let vars = with_mapped_state(&input_vars(&input()), &mapped);
        assert_eq!(vars.get("mappedAttrs"), Some(&json!({"cn": ["Alice"]})));
        assert_eq!(vars.get("mappedIds"), Some(&json!({"email": ["a@b.com"]})));
        assert_eq!(vars.get("idp"), Some(&json!("saml-idp")));
    }
}
