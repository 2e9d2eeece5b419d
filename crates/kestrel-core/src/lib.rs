//! Shared types for the Kestrel identity translation engine.

pub mod authn;

// Configuration types shared across all Kestrel crates
pub mod config;

pub use authn::{AuthnContext, RemoteAttribute, RemoteGroupMembership, RemoteIdentity};
pub use config::{
    ConfigError, KestrelConfig, LogFormat, LoggingConfig, StoreBackend, StoreConfig,
    TranslationConfig,
};
