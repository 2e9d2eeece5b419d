//! Mapping results and their merge semantics.
//!
//! A [`MappingResult`] accumulates what a profile proposes to do with the
//! local entity. It is never applied here: the caller owns persistence.
//!
//! Conflicts inside one category are resolved per key:
//!
//! | Category | Key | Conflict rule |
//! |----------|-----|---------------|
//! | identities | (type, value) | more restrictive mode wins, ties go to the later proposal |
//! | attributes | (name, group) | `CREATE_OR_UPDATE` never overrides an earlier specific mode, otherwise the later proposal wins |
//! | groups | path | more restrictive mode wins, ties go to the later proposal |
//! | directives | kind | last write wins |
//!
//! Replacements keep the position of the first proposal for that key, so
//! merging is associative and order-preserving.

use crate::types::wire_enum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

wire_enum! {
    /// How a proposed identity relates to existing local identities.
    pub enum IdentityEffectMode {
        /// Match an existing identity or create a new entity with it.
        CreateOrMatch => "CREATE_OR_MATCH",
        /// Match an existing identity or add it to the entity matched by
        /// another identity.
        UpdateOrMatch => "UPDATE_OR_MATCH",
        /// Only match; never create.
        Match => "MATCH",
        /// Must match an existing identity, otherwise the login is refused.
        RequireMatch => "REQUIRE_MATCH",
    }
}

impl IdentityEffectMode {
    fn restrictiveness(self) -> u8 {
        match self {
            Self::CreateOrMatch => 0,
            Self::UpdateOrMatch => 1,
            Self::Match => 2,
            Self::RequireMatch => 3,
        }
    }
}

wire_enum! {
    /// How a proposed attribute relates to the entity's existing attribute.
    pub enum AttributeEffectMode {
        CreateOrUpdate => "CREATE_OR_UPDATE",
        UpdateOnly => "UPDATE_ONLY",
        CreateOnly => "CREATE_ONLY",
    }
}

impl AttributeEffectMode {
    /// `UPDATE_ONLY` and `CREATE_ONLY` constrain existence; `CREATE_OR_UPDATE` does not.
    pub fn is_specific(self) -> bool {
        !matches!(self, Self::CreateOrUpdate)
    }
}

wire_enum! {
    /// What to do when a proposed group does not exist.
    pub enum GroupEffectMode {
        /// Fail the mapping if the group is missing.
        RequireExistingGroup => "REQUIRE_EXISTING_GROUP",
        /// Silently skip a missing group.
        AddIfExists => "ADD_IF_EXISTS",
        CreateGroupIfMissing => "CREATE_GROUP_IF_MISSING",
    }
}

impl GroupEffectMode {
    fn restrictiveness(self) -> u8 {
        match self {
            Self::CreateGroupIfMissing => 0,
            Self::AddIfExists => 1,
            Self::RequireExistingGroup => 2,
        }
    }
}

wire_enum! {
    /// Entity-level operation scheduled by `entityChange`.
    pub enum ScheduledOperation {
        Disable => "DISABLE",
        Remove => "REMOVE",
        /// Cancel a previously scheduled operation.
        Clear => "CLEAR",
    }
}

wire_enum! {
    /// Confirmation state requested for a mapped value.
    pub enum Confirmation {
        /// Let the store decide (usually: unconfirmed when verifiable).
        Default => "DEFAULT",
        Confirmed => "CONFIRMED",
        Unconfirmed => "UNCONFIRMED",
    }
}

impl Default for Confirmation {
    fn default() -> Self {
        Self::Default
    }
}

impl Confirmation {
    fn is_default(&self) -> bool {
        *self == Self::Default
    }
}

wire_enum! {
    /// Key under which an [`EntityDirective`] is stored.
    pub enum DirectiveKey {
        CredentialRequirement => "CREDENTIAL_REQUIREMENT",
        ScheduledChange => "SCHEDULED_CHANGE",
        RemoveStaleData => "REMOVE_STALE_DATA",
    }
}

/// A proposed identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedIdentity {
    #[serde(rename = "type")]
    pub identity_type: String,
    pub value: String,
    pub mode: IdentityEffectMode,
    /// Credential requirement for an entity created from this identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_requirement: Option<String>,
    #[serde(default, skip_serializing_if = "Confirmation::is_default")]
    pub confirmation: Confirmation,
    pub idp: String,
    pub profile: String,
}

/// A proposed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedAttribute {
    pub name: String,
    pub group: String,
    pub values: Vec<String>,
    pub mode: AttributeEffectMode,
    #[serde(default, skip_serializing_if = "Confirmation::is_default")]
    pub confirmation: Confirmation,
    pub idp: String,
    pub profile: String,
}

/// A proposed group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedGroup {
    pub group: String,
    pub mode: GroupEffectMode,
    pub idp: String,
    pub profile: String,
}

/// Entity-level directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntityDirective {
    CredentialRequirement { name: String },
    ScheduledChange {
        operation: ScheduledOperation,
        after_days: u32,
    },
    RemoveStaleData,
}

impl EntityDirective {
    pub fn key(&self) -> DirectiveKey {
        match self {
            Self::CredentialRequirement { .. } => DirectiveKey::CredentialRequirement,
            Self::ScheduledChange { .. } => DirectiveKey::ScheduledChange,
            Self::RemoveStaleData => DirectiveKey::RemoveStaleData,
        }
    }
}

/// Accumulated proposals of a profile execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingResult {
    #[serde(default)]
    identities: Vec<MappedIdentity>,
    #[serde(default)]
    attributes: Vec<MappedAttribute>,
    #[serde(default)]
    groups: Vec<MappedGroup>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    directives: BTreeMap<DirectiveKey, EntityDirective>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attribute_filters: Vec<String>,
}

impl MappingResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identities(&self) -> &[MappedIdentity] {
        &self.identities
    }

    pub fn attributes(&self) -> &[MappedAttribute] {
        &self.attributes
    }

    pub fn groups(&self) -> &[MappedGroup] {
        &self.groups
    }

    pub fn directives(&self) -> impl Iterator<Item = &EntityDirective> {
        self.directives.values()
    }

    pub fn directive(&self, key: DirectiveKey) -> Option<&EntityDirective> {
        self.directives.get(&key)
    }

    /// Regular expressions naming attributes that must not be released.
    pub fn attribute_filters(&self) -> &[String] {
        &self.attribute_filters
    }

    pub fn identity(&self, identity_type: &str, value: &str) -> Option<&MappedIdentity> {
        self.identities
            .iter()
            .find(|i| i.identity_type == identity_type && i.value == value)
    }

    pub fn attribute(&self, name: &str, group: &str) -> Option<&MappedAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.group == group)
    }

    pub fn group(&self, path: &str) -> Option<&MappedGroup> {
        self.groups.iter().find(|g| g.group == path)
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
            && self.attributes.is_empty()
            && self.groups.is_empty()
            && self.directives.is_empty()
            && self.attribute_filters.is_empty()
    }

    pub fn add_identity(&mut self, identity: MappedIdentity) {
        let existing = self
            .identities
            .iter_mut()
            .find(|i| i.identity_type == identity.identity_type && i.value == identity.value);
        match existing {
            Some(existing) => {
                if identity.mode.restrictiveness() >= existing.mode.restrictiveness() {
                    *existing = identity;
                }
            }
            None => self.identities.push(identity),
        }
    }

    pub fn add_attribute(&mut self, attribute: MappedAttribute) {
        let existing = self
            .attributes
            .iter_mut()
            .find(|a| a.name == attribute.name && a.group == attribute.group);
        match existing {
            Some(existing) => {
                if existing.mode.is_specific() && !attribute.mode.is_specific() {
                    tracing::debug!(
                        attribute = %attribute.name,
                        kept = %existing.mode,
                        ignored = %attribute.mode,
                        "keeping earlier attribute proposal"
                    );
                } else {
                    *existing = attribute;
                }
            }
            None => self.attributes.push(attribute),
        }
    }

    pub fn add_group(&mut self, group: MappedGroup) {
        match self.groups.iter_mut().find(|g| g.group == group.group) {
            Some(existing) => {
                if group.mode.restrictiveness() >= existing.mode.restrictiveness() {
                    *existing = group;
                }
            }
            None => self.groups.push(group),
        }
    }

    pub fn set_directive(&mut self, directive: EntityDirective) {
        self.directives.insert(directive.key(), directive);
    }

    pub fn add_attribute_filter(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if !self.attribute_filters.contains(&pattern) {
            self.attribute_filters.push(pattern);
        }
    }

    /// Merges `other` into `self` as if its proposals were added after ours.
    pub fn merge(&mut self, other: MappingResult) {
        for identity in other.identities {
            self.add_identity(identity);
        }
        for attribute in other.attributes {
            self.add_attribute(attribute);
        }
        for group in other.groups {
            self.add_group(group);
        }
        for (_, directive) in other.directives {
            self.set_directive(directive);
        }
        for filter in other.attribute_filters {
            self.add_attribute_filter(filter);
        }
    }

    /// Attributes not matched by any attribute filter.
    pub fn released_attributes(&self) -> Vec<&MappedAttribute> {
        let filters: Vec<Regex> = self
            .attribute_filters
            .iter()
            .filter_map(|pattern| Regex::new(&format!("^(?:{pattern})$")).ok())
            .collect();
        self.attributes
            .iter()
            .filter(|a| !filters.iter().any(|f| f.is_match(&a.name)))
            .collect()
    }
}
