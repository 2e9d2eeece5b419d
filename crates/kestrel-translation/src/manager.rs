//! Profile management: CRUD over the named-object store, save-time
//! validation and a lock-free snapshot for execution.

use crate::action::{ExecutionOptions, ProfileResolver};
use crate::document::LoadMode;
use crate::error::ManagementError;
use crate::profile::TranslationProfile;
use crate::provider::{ProfileCatalog, SystemProfileProvider};
use crate::registry::ActionTypeRegistry;
use crate::result::MappingResult;
use crate::types::{ProfileMode, ProfileType};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use kestrel_core::AuthnContext;
use kestrel_core::config::TranslationConfig;
use kestrel_store::{NamedObjectStore, StoreError};
use std::collections::HashSet;
use std::sync::Arc;

/// Store key of a profile: `"<TYPE>/<name>"`.
pub fn store_key(profile_type: ProfileType, name: &str) -> String {
    format!("{profile_type}/{name}")
}

/// Immutable view of all known profiles.
#[derive(Debug, Default)]
struct ProfileSnapshot {
    stored: ProfileCatalog,
    system: ProfileCatalog,
    loaded_at: Option<DateTime<Utc>>,
}

impl ProfileSnapshot {
    fn get(&self, profile_type: ProfileType, name: &str) -> Option<&Arc<TranslationProfile>> {
        self.system
            .get(profile_type, name)
            .or_else(|| self.stored.get(profile_type, name))
    }
}

impl ProfileResolver for ProfileSnapshot {
    fn resolve(&self, profile_type: ProfileType, name: &str) -> Option<Arc<TranslationProfile>> {
        self.get(profile_type, name).cloned()
    }
}

/// Known profiles as they would be after saving `candidate`.
struct CandidateView<'a> {
    snapshot: &'a ProfileSnapshot,
    candidate: &'a TranslationProfile,
}

impl<'a> CandidateView<'a> {
    fn get(&self, name: &str) -> Option<&'a TranslationProfile> {
        if name == self.candidate.name() {
            Some(self.candidate)
        } else {
            self.snapshot
                .get(self.candidate.profile_type(), name)
                .map(Arc::as_ref)
        }
    }

    /// First include cycle reachable from the candidate, as a name path.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut path = vec![self.candidate.name().to_string()];
        let mut done = HashSet::new();
        self.visit(self.candidate, &mut path, &mut done)
    }

    fn visit(
        &self,
        profile: &'a TranslationProfile,
        path: &mut Vec<String>,
        done: &mut HashSet<String>,
    ) -> Option<Vec<String>> {
        for name in profile.included_profiles() {
            if let Some(start) = path.iter().position(|p| p == name) {
                let mut cycle = path[start..].to_vec();
                cycle.push(name.to_string());
                return Some(cycle);
            }
            if done.contains(name) {
                continue;
            }
            if let Some(next) = self.get(name) {
                path.push(name.to_string());
                if let Some(cycle) = self.visit(next, path, done) {
                    return Some(cycle);
                }
                path.pop();
                done.insert(name.to_string());
            }
        }
        None
    }
}

/// Manages stored translation profiles and merges them with system profiles.
///
/// Readers work on an immutable snapshot swapped atomically after every
/// change, so executions never wait on writers.
pub struct ProfileManager {
    store: Arc<dyn NamedObjectStore>,
    registry: Arc<ActionTypeRegistry>,
    providers: Vec<Arc<dyn SystemProfileProvider>>,
    snapshot: ArcSwap<ProfileSnapshot>,
    load_mode: LoadMode,
    max_include_depth: usize,
}

impl ProfileManager {
    /// Creates a manager with an empty snapshot; call [`ProfileManager::load`]
    /// before use.
    pub fn new(
        store: Arc<dyn NamedObjectStore>,
        registry: Arc<ActionTypeRegistry>,
        config: &TranslationConfig,
    ) -> Self {
        Self {
            store,
            registry,
            providers: Vec::new(),
            snapshot: ArcSwap::from_pointee(ProfileSnapshot::default()),
            load_mode: if config.lenient_rehydration {
                LoadMode::Lenient
            } else {
                LoadMode::Strict
            },
            max_include_depth: config.max_include_depth,
        }
    }

    pub fn with_system_provider(mut self, provider: Arc<dyn SystemProfileProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn registry(&self) -> &Arc<ActionTypeRegistry> {
        &self.registry
    }

    /// Rehydrates all stored profiles and swaps in a new snapshot.
    ///
    /// In lenient mode documents that cannot be parsed at all are logged and
    /// skipped; in strict mode they fail the load.
    pub async fn load(&self) -> Result<(), ManagementError> {
        let loaded_at = self.store.last_update().await?;
        let objects = self.store.get_all().await?;
        let system = self.system_profiles();

        let mut stored = ProfileCatalog::new();
        for object in objects {
            let profile = match self.load_mode {
                LoadMode::Strict => TranslationProfile::from_json(&object.content, &self.registry)?,
                LoadMode::Lenient => match TranslationProfile::rehydrate(&object.content, &self.registry) {
                    Ok(profile) => profile,
                    Err(e) => {
                        tracing::error!(key = %object.name, error = %e, "skipping unreadable stored profile");
                        continue;
                    }
                },
            };
            if store_key(profile.profile_type(), profile.name()) != object.name {
                tracing::warn!(key = %object.name, profile = %profile.name(), "stored profile key does not match its content");
            }
            if system.contains(profile.profile_type(), profile.name()) {
                tracing::warn!(profile = %profile.name(), "stored profile is shadowed by a system profile");
            }
            stored.insert(profile);
        }

        tracing::info!(
            stored = stored.len(),
            system = system.len(),
            "translation profiles loaded"
        );
        self.snapshot.store(Arc::new(ProfileSnapshot {
            stored,
            system,
            loaded_at,
        }));
        Ok(())
    }

    fn system_profiles(&self) -> ProfileCatalog {
        let mut system = ProfileCatalog::new();
        for provider in &self.providers {
            for profile_type in [ProfileType::Input, ProfileType::Output] {
                for profile in provider.profiles(profile_type).into_values() {
                    system.insert_shared(profile);
                }
            }
        }
        system
    }

    /// Reloads when the store changed since the last load. Returns whether a
    /// reload happened.
    pub async fn refresh(&self) -> Result<bool, ManagementError> {
        let last_update = self.store.last_update().await?;
        let loaded_at = self.snapshot.load().loaded_at;
        if last_update > loaded_at {
            tracing::debug!("profile store changed, reloading");
            self.load().await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Runs the save-time checks against the current snapshot.
    pub fn validate(&self, profile: &TranslationProfile) -> Result<(), ManagementError> {
        if profile.mode() == ProfileMode::ReadOnly {
            return Err(ManagementError::ReadOnly {
                name: profile.name().to_string(),
            });
        }

        let snapshot = self.snapshot.load();
        if snapshot.system.contains(profile.profile_type(), profile.name()) {
            return Err(ManagementError::SystemProfile {
                name: profile.name().to_string(),
            });
        }

        let view = CandidateView {
            snapshot: &**snapshot,
            candidate: profile,
        };
        for include in profile.included_profiles() {
            if view.get(include).is_none() {
                return Err(ManagementError::UnknownInclude {
                    profile: profile.name().to_string(),
                    include: include.to_string(),
                });
            }
        }
        if let Some(cycle) = view.find_cycle() {
            return Err(ManagementError::IncludeCycle(cycle));
        }
        Ok(())
    }

    pub async fn add_profile(&self, profile: TranslationProfile) -> Result<(), ManagementError> {
        self.validate(&profile)?;
        let key = store_key(profile.profile_type(), profile.name());
        let json = profile.to_json()?;

        self.store.insert(&key, json).await.map_err(|e| match e {
            StoreError::AlreadyExists(_) => ManagementError::AlreadyExists {
                profile_type: profile.profile_type(),
                name: profile.name().to_string(),
            },
            other => other.into(),
        })?;
        tracing::info!(profile = %profile.name(), profile_type = %profile.profile_type(), "profile added");
        self.load().await
    }

    /// Replaces an existing stored profile.
    pub async fn update_profile(&self, profile: TranslationProfile) -> Result<(), ManagementError> {
        self.validate(&profile)?;
        let key = store_key(profile.profile_type(), profile.name());
        let json = profile.to_json()?;

        self.store
            .update(&key, json)
            .await
            .map_err(|e| not_found(e, profile.profile_type(), profile.name()))?;
        tracing::info!(profile = %profile.name(), profile_type = %profile.profile_type(), "profile updated");
        self.load().await
    }

    /// Removes a stored profile that no other profile includes.
    pub async fn remove_profile(&self, profile_type: ProfileType, name: &str) -> Result<(), ManagementError> {
        {
            let snapshot = self.snapshot.load();
            if snapshot.system.contains(profile_type, name) {
                return Err(ManagementError::SystemProfile {
                    name: name.to_string(),
                });
            }
            let includer = snapshot
                .stored
                .iter(profile_type)
                .chain(snapshot.system.iter(profile_type))
                .find(|p| p.name() != name && p.included_profiles().contains(&name));
            if let Some(includer) = includer {
                return Err(ManagementError::InUse {
                    name: name.to_string(),
                    by: includer.name().to_string(),
                });
            }
        }

        self.store
            .remove(&store_key(profile_type, name))
            .await
            .map_err(|e| not_found(e, profile_type, name))?;
        tracing::info!(profile = %name, profile_type = %profile_type, "profile removed");
        self.load().await
    }

    /// A stored or system profile; system profiles take precedence.
    pub fn get_profile(&self, profile_type: ProfileType, name: &str) -> Option<Arc<TranslationProfile>> {
        self.snapshot.load().get(profile_type, name).cloned()
    }

    /// Stored and system profiles of one type, ordered by name.
    pub fn list_profiles(&self, profile_type: ProfileType) -> Vec<Arc<TranslationProfile>> {
        let snapshot = self.snapshot.load();
        let mut profiles: Vec<Arc<TranslationProfile>> = snapshot
            .system
            .iter(profile_type)
            .cloned()
            .chain(
                snapshot
                    .stored
                    .iter(profile_type)
                    .filter(|p| !snapshot.system.contains(profile_type, p.name()))
                    .cloned(),
            )
            .collect();
        profiles.sort_by(|a, b| a.name().cmp(b.name()));
        profiles
    }

    pub fn is_system_profile(&self, profile_type: ProfileType, name: &str) -> bool {
        self.snapshot.load().system.contains(profile_type, name)
    }

    /// Executes a profile, resolving includes against one consistent snapshot.
    pub fn execute(
        &self,
        profile_type: ProfileType,
        name: &str,
        input: &AuthnContext,
    ) -> Result<MappingResult, ManagementError> {
        let snapshot = self.snapshot.load_full();
        let profile = snapshot
            .get(profile_type, name)
            .ok_or_else(|| ManagementError::NotFound {
                profile_type,
                name: name.to_string(),
            })?;
        let options = ExecutionOptions::default()
            .with_resolver(snapshot.as_ref())
            .with_max_include_depth(self.max_include_depth);
        Ok(profile.execute_with(input, &options)?)
    }
}

impl ProfileResolver for ProfileManager {
    fn resolve(&self, profile_type: ProfileType, name: &str) -> Option<Arc<TranslationProfile>> {
        self.get_profile(profile_type, name)
    }
}

fn not_found(error: StoreError, profile_type: ProfileType, name: &str) -> ManagementError {
    match error {
        StoreError::NotFound(_) => ManagementError::NotFound {
            profile_type,
            name: name.to_string(),
        },
        other => other.into(),
    }
}
