//! In-memory profile collections and system-provided profiles.

use crate::action::ProfileResolver;
use crate::error::ManagementError;
use crate::profile::TranslationProfile;
use crate::registry::ActionTypeRegistry;
use crate::types::{ProfileMode, ProfileType};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source of profiles that are not stored and cannot be modified.
pub trait SystemProfileProvider: Send + Sync {
    fn profiles(&self, profile_type: ProfileType) -> BTreeMap<String, Arc<TranslationProfile>>;
}

/// Profiles of both types, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    input: BTreeMap<String, Arc<TranslationProfile>>,
    output: BTreeMap<String, Arc<TranslationProfile>>,
}

impl ProfileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` document of `dir` as a read-only profile.
    ///
    /// Documents are loaded strictly; the first invalid one fails the load.
    pub fn from_directory(dir: &Path, registry: &ActionTypeRegistry) -> Result<Self, ManagementError> {
        let io_error = |source| ManagementError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_error)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            let json = std::fs::read_to_string(&path).map_err(|source| ManagementError::Io {
                path: path.clone(),
                source,
            })?;
            let profile = TranslationProfile::from_json(&json, registry)
                .map_err(|source| ManagementError::Document {
                    path: path.clone(),
                    source,
                })?
                .with_mode(ProfileMode::ReadOnly);

            tracing::debug!(
                profile = %profile.name(),
                profile_type = %profile.profile_type(),
                path = %path.display(),
                "loaded system profile"
            );
            if let Some(previous) = catalog.insert(profile) {
                tracing::warn!(
                    profile = %previous.name(),
                    path = %path.display(),
                    "duplicate system profile name, the later document wins"
                );
            }
        }
        Ok(catalog)
    }

    fn of(&self, profile_type: ProfileType) -> &BTreeMap<String, Arc<TranslationProfile>> {
        match profile_type {
            ProfileType::Input => &self.input,
            ProfileType::Output => &self.output,
        }
    }

    fn of_mut(&mut self, profile_type: ProfileType) -> &mut BTreeMap<String, Arc<TranslationProfile>> {
        match profile_type {
            ProfileType::Input => &mut self.input,
            ProfileType::Output => &mut self.output,
        }
    }

    /// Adds a profile, returning the one it replaced.
    pub fn insert(&mut self, profile: TranslationProfile) -> Option<Arc<TranslationProfile>> {
        self.insert_shared(Arc::new(profile))
    }

    pub fn insert_shared(&mut self, profile: Arc<TranslationProfile>) -> Option<Arc<TranslationProfile>> {
        self.of_mut(profile.profile_type())
            .insert(profile.name().to_string(), profile)
    }

    pub fn remove(&mut self, profile_type: ProfileType, name: &str) -> Option<Arc<TranslationProfile>> {
        self.of_mut(profile_type).remove(name)
    }

    pub fn get(&self, profile_type: ProfileType, name: &str) -> Option<&Arc<TranslationProfile>> {
        self.of(profile_type).get(name)
    }

    pub fn contains(&self, profile_type: ProfileType, name: &str) -> bool {
        self.of(profile_type).contains_key(name)
    }

    /// Profiles of one type, ordered by name.
    pub fn iter(&self, profile_type: ProfileType) -> impl Iterator<Item = &Arc<TranslationProfile>> {
        self.of(profile_type).values()
    }

    pub fn len(&self) -> usize {
        self.input.len() + self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.output.is_empty()
    }
}

impl SystemProfileProvider for ProfileCatalog {
    fn profiles(&self, profile_type: ProfileType) -> BTreeMap<String, Arc<TranslationProfile>> {
        self.of(profile_type).clone()
    }
}

impl ProfileResolver for ProfileCatalog {
    fn resolve(&self, profile_type: ProfileType, name: &str) -> Option<Arc<TranslationProfile>> {
        self.get(profile_type, name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> ActionTypeRegistry {
        ActionTypeRegistry::with_builtin_actions().unwrap()
    }

    #[test]
    fn test_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"name": "sys-in", "rules": [{"condition": "true", "action": {"name": "stopProcessing"}}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("b.json"), r#"{"name": "sys-out", "type": "OUTPUT"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = ProfileCatalog::from_directory(dir.path(), &registry()).unwrap();
        assert_eq!(catalog.len(), 2);

        let input = catalog.get(ProfileType::Input, "sys-in").unwrap();
        assert_eq!(input.mode(), ProfileMode::ReadOnly);
        assert_eq!(input.rules().len(), 1);
        assert!(catalog.contains(ProfileType::Output, "sys-out"));
        assert!(!catalog.contains(ProfileType::Input, "sys-out"));
    }

    #[test]
    fn test_from_directory_rejects_invalid_document() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("bad.json"),
            r#"{"name": "bad", "rules": [{"condition": "true", "action": {"name": "nope"}}]}"#,
        )
        .unwrap();

        let err = ProfileCatalog::from_directory(dir.path(), &registry()).unwrap_err();
        assert!(matches!(err, ManagementError::Document { .. }));
    }

    #[test]
    fn test_from_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = ProfileCatalog::from_directory(&dir.path().join("missing"), &registry()).unwrap_err();
        assert!(matches!(err, ManagementError::Io { .. }));
    }

    #[test]
    fn test_catalog_resolves_by_type() {
        let mut catalog = ProfileCatalog::new();
        catalog.insert(TranslationProfile::new("p", "", ProfileType::Output, Vec::new()).unwrap());

        assert!(catalog.resolve(ProfileType::Output, "p").is_some());
        assert!(catalog.resolve(ProfileType::Input, "p").is_none());
        assert_eq!(catalog.profiles(ProfileType::Output).len(), 1);
        assert!(catalog.remove(ProfileType::Output, "p").is_some());
        assert!(catalog.is_empty());
    }
}
