//! `kestrel run` - execute a profile document against an input file.

use anyhow::{Context, Result};
use kestrel_core::AuthnContext;
use kestrel_core::config::TranslationConfig;
use kestrel_translation::{
    ActionTypeRegistry, ExecutionOptions, MappingResult, ProfileCatalog, TranslationProfile,
};
use std::fs;
use std::path::{Path, PathBuf};

pub struct RunArgs {
    pub profile: PathBuf,
    pub input: PathBuf,
    pub include: Vec<PathBuf>,
}

/// Execute the profile and print the mapping result as JSON.
pub fn run(args: &RunArgs, registry: &ActionTypeRegistry, config: &TranslationConfig) -> Result<()> {
    let result = execute(args, registry, config)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn execute(
    args: &RunArgs,
    registry: &ActionTypeRegistry,
    config: &TranslationConfig,
) -> Result<MappingResult> {
    let profile = load_profile(&args.profile, registry)?;

    let mut catalog = ProfileCatalog::new();
    for path in &args.include {
        catalog.insert(load_profile(path, registry)?);
    }

    let input_json = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {:?}", args.input))?;
    let input: AuthnContext = serde_json::from_str(&input_json)
        .with_context(|| format!("Failed to parse input file: {:?}", args.input))?;

    tracing::info!(
        profile = %profile.name(),
        profile_type = %profile.profile_type(),
        includes = catalog.len(),
        "executing profile"
    );
    let options = ExecutionOptions::default()
        .with_resolver(&catalog)
        .with_max_include_depth(config.max_include_depth);
    profile
        .execute_with(&input, &options)
        .with_context(|| format!("Execution of profile '{}' failed", profile.name()))
}

fn load_profile(path: &Path, registry: &ActionTypeRegistry) -> Result<TranslationProfile> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile file: {:?}", path))?;
    TranslationProfile::from_json(&json, registry)
        .with_context(|| format!("Invalid profile document: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_with_include() {
        let dir = TempDir::new().unwrap();
        let profile = dir.path().join("main.json");
        let include = dir.path().join("base.json");
        let input = dir.path().join("input.json");
        fs::write(
            &profile,
            r#"{"name": "main", "rules": [
                {"condition": "true", "action": {"name": "includeInputProfile", "parameters": ["base"]}},
                {"condition": "attr['email'] != null", "action": {"name": "mapIdentity", "parameters": ["email", "MATCH"]}}
            ]}"#,
        )
        .unwrap();
        fs::write(
            &include,
            r#"{"name": "base", "rules": [{"condition": "true", "action": {"name": "mapGroup", "parameters": ["'/users'"]}}]}"#,
        )
        .unwrap();
        fs::write(
            &input,
            r#"{"idp": "saml", "attributes": [{"name": "email", "values": ["a@b.org"]}]}"#,
        )
        .unwrap();

        let registry = ActionTypeRegistry::with_builtin_actions().unwrap();
        let args = RunArgs {
            profile,
            input,
            include: vec![include],
        };
        let result = execute(&args, &registry, &TranslationConfig::default()).unwrap();
        assert!(result.group("/users").is_some());
        assert!(result.identity("email", "a@b.org").is_some());
    }

    #[test]
    fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let profile = dir.path().join("p.json");
        fs::write(&profile, r#"{"name": "p"}"#).unwrap();

        let registry = ActionTypeRegistry::with_builtin_actions().unwrap();
        let args = RunArgs {
            profile,
            input: dir.path().join("missing.json"),
            include: Vec::new(),
        };
        let err = execute(&args, &registry, &TranslationConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to read input file"));
    }
}
