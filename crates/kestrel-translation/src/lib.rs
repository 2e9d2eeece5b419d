//! # kestrel-translation
//!
//! Translation profile engine: maps remotely authenticated principals to
//! proposed local identities, attributes and group memberships.
//!
//! A [`TranslationProfile`] is an ordered list of [`TranslationRule`]s. Each
//! rule pairs a [`TranslationCondition`] with a [`TranslationAction`];
//! executing a profile evaluates every condition against the
//! [`AuthnContext`](kestrel_core::AuthnContext) and merges the proposals of
//! matching actions into one [`MappingResult`].
//!
//! Actions are created by name through the [`ActionTypeRegistry`], which
//! validates their parameters. Stored profiles are managed by the
//! [`ProfileManager`].
//!
//! ```rust
//! use kestrel_core::AuthnContext;
//! use kestrel_translation::{ActionTypeRegistry, TranslationProfile};
//!
//! let registry = ActionTypeRegistry::with_builtin_actions().unwrap();
//! let profile = TranslationProfile::from_json(
//!     r#"{"name": "demo", "rules": [
//!         {"condition": "true", "action": {"name": "mapAttribute", "parameters": ["email", "/", "CREATE_OR_UPDATE"]}}
//!     ]}"#,
//!     &registry,
//! )
//! .unwrap();
//!
//! let input = AuthnContext::new("idp").with_attribute("email", ["a@example.com"]);
//! let result = profile.execute(&input).unwrap();
//! assert_eq!(result.attribute("email", "/").unwrap().values, vec!["a@example.com"]);
//! ```

pub mod action;
pub mod actions;
pub mod condition;
pub mod context;
pub mod document;
pub mod error;
pub mod manager;
pub mod params;
pub mod profile;
pub mod provider;
pub mod registry;
pub mod result;
pub mod rule;
pub mod types;

pub use action::{
    ActionInstance, ActionOutcome, ExecutionContext, ExecutionOptions, ProfileResolver,
    TranslationAction, TranslationActionFactory, TranslationActionType,
};
pub use condition::TranslationCondition;
pub use document::{LoadMode, ProfileDocument};
pub use error::{ErrorCategory, ManagementError, TranslationError};
pub use manager::ProfileManager;
pub use params::{ActionParameterDefinition, ParameterKind};
pub use profile::TranslationProfile;
pub use provider::{ProfileCatalog, SystemProfileProvider};
pub use registry::ActionTypeRegistry;
pub use result::{
    AttributeEffectMode, Confirmation, DirectiveKey, EntityDirective, GroupEffectMode,
    IdentityEffectMode, MappedAttribute, MappedGroup, MappedIdentity, MappingResult,
    ScheduledOperation,
};
pub use rule::{RuleOutcome, TranslationRule};
pub use types::{ProfileMode, ProfileType};
