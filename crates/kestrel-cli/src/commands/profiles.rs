//! `kestrel profiles` - manage translation profiles in the configured store.

use super::TypeArg;
use anyhow::{Context, Result};
use kestrel_core::KestrelConfig;
use kestrel_translation::{
    ActionTypeRegistry, ManagementError, ProfileCatalog, ProfileManager, ProfileType,
    TranslationProfile,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Opens the configured store, attaches system profiles and loads everything.
pub async fn open_manager(config: &KestrelConfig, registry: Arc<ActionTypeRegistry>) -> Result<ProfileManager> {
    let store = kestrel_store::create_store(&config.store).context("Failed to open profile store")?;
    let mut manager = ProfileManager::new(store, registry.clone(), &config.translation);

    if let Some(dir) = &config.translation.system_profiles_dir {
        let system = ProfileCatalog::from_directory(dir, &registry)
            .with_context(|| format!("Failed to load system profiles from {:?}", dir))?;
        tracing::debug!(count = system.len(), "system profiles loaded");
        manager = manager.with_system_provider(Arc::new(system));
    }

    manager.load().await.context("Failed to load stored profiles")?;
    Ok(manager)
}

pub fn list(manager: &ProfileManager, profile_type: Option<TypeArg>) -> Result<()> {
    let types = match profile_type {
        Some(t) => vec![t.into()],
        None => vec![ProfileType::Input, ProfileType::Output],
    };

    for profile_type in types {
        let profiles = manager.list_profiles(profile_type);
        println!("\n📋 {} profiles ({}):", profile_type, profiles.len());
        for profile in &profiles {
            let source = if manager.is_system_profile(profile_type, profile.name()) {
                "system"
            } else {
                "stored"
            };
            println!(
                "  {:<32} {:<10} {:>3} rule(s)  [{}]",
                profile.name(),
                profile.mode().as_str(),
                profile.rules().len(),
                source
            );
        }
    }
    Ok(())
}

pub fn show(manager: &ProfileManager, profile_type: TypeArg, name: &str) -> Result<()> {
    let profile_type = ProfileType::from(profile_type);
    let profile = manager
        .get_profile(profile_type, name)
        .ok_or_else(|| ManagementError::NotFound {
            profile_type,
            name: name.to_string(),
        })?;
    println!("{}", profile.to_json()?);
    Ok(())
}

/// Validates a document strictly and saves it. With `replace`, an existing
/// profile of the same name is updated.
pub async fn import(manager: &ProfileManager, file: &Path, replace: bool) -> Result<()> {
    let json = fs::read_to_string(file).with_context(|| format!("Failed to read profile file: {:?}", file))?;
    let profile = TranslationProfile::from_json(&json, manager.registry())
        .with_context(|| format!("Invalid profile document: {:?}", file))?;
    let (name, profile_type) = (profile.name().to_string(), profile.profile_type());

    let exists = manager.get_profile(profile_type, &name).is_some()
        && !manager.is_system_profile(profile_type, &name);
    if exists && replace {
        manager.update_profile(profile).await?;
        println!("✔ Updated {} profile '{}'", profile_type, name);
    } else {
        manager.add_profile(profile).await?;
        println!("✔ Imported {} profile '{}'", profile_type, name);
    }
    Ok(())
}

pub async fn remove(manager: &ProfileManager, profile_type: TypeArg, name: &str) -> Result<()> {
    let profile_type = ProfileType::from(profile_type);
    manager.remove_profile(profile_type, name).await?;
    println!("✔ Removed {} profile '{}'", profile_type, name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::config::StoreBackend;
    use tempfile::TempDir;

    fn file_config(dir: &TempDir) -> KestrelConfig {
        let mut config = KestrelConfig::default();
        config.store.backend = StoreBackend::File;
        config.store.directory = dir.path().join("store");
        config
    }

    #[tokio::test]
    async fn test_import_persists_across_managers() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("p.json");
        fs::write(
            &file,
            r#"{"name": "p", "rules": [{"condition": "true", "action": {"name": "mapGroup", "parameters": ["'/a'"]}}]}"#,
        )
        .unwrap();

        let config = file_config(&dir);
        let registry = Arc::new(ActionTypeRegistry::with_builtin_actions().unwrap());

        let manager = open_manager(&config, registry.clone()).await.unwrap();
        import(&manager, &file, false).await.unwrap();
        assert!(import(&manager, &file, false).await.is_err());
        import(&manager, &file, true).await.unwrap();

        let reopened = open_manager(&config, registry.clone()).await.unwrap();
        assert!(reopened.get_profile(ProfileType::Input, "p").is_some());

        remove(&reopened, TypeArg::Input, "p").await.unwrap();
        assert!(reopened.list_profiles(ProfileType::Input).is_empty());
    }

    #[tokio::test]
    async fn test_system_profiles_from_directory() {
        let dir = TempDir::new().unwrap();
        let system_dir = dir.path().join("system");
        fs::create_dir(&system_dir).unwrap();
        fs::write(system_dir.join("sys.json"), r#"{"name": "sys", "type": "OUTPUT"}"#).unwrap();

        let mut config = file_config(&dir);
        config.translation.system_profiles_dir = Some(system_dir);
        let registry = Arc::new(ActionTypeRegistry::with_builtin_actions().unwrap());

        let manager = open_manager(&config, registry).await.unwrap();
        assert!(manager.is_system_profile(ProfileType::Output, "sys"));
        assert!(remove(&manager, TypeArg::Output, "sys").await.is_err());
    }
}
