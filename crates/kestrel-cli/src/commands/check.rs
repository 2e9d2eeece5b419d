//! `kestrel check` command implementation.
//!
//! Validates translation profile documents:
//! - JSON Schema validation against `schemas/TranslationProfile.schema.json`
//! - Strict loading: conditions compile, actions exist and their parameters are valid
//! - Cross-file checks: duplicate names, includes of profiles not among the files
//! - Warning detection for rules that can never run

use anyhow::Result;
use kestrel_translation::actions::names;
use kestrel_translation::{ActionTypeRegistry, ProfileType, TranslationProfile};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Embedded so validation works without the source tree.
const PROFILE_SCHEMA: &str = include_str!("../../../../schemas/TranslationProfile.schema.json");

// ============================================================================
// Check Result Types
// ============================================================================

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Check that produced this finding.
    pub category: String,
    pub message: String,
    pub file: Option<PathBuf>,
    /// Location within the document (e.g. "rules[2]").
    pub location: Option<String>,
}

impl CheckFinding {
    fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category: category.into(),
            message: message.into(),
            file: None,
            location: None,
        }
    }

    fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category: category.into(),
            message: message.into(),
            file: None,
            location: None,
        }
    }

    fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn extend(&mut self, findings: impl IntoIterator<Item = CheckFinding>) {
        self.findings.extend(findings);
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        for (severity, title) in [(Severity::Error, "❌ Errors"), (Severity::Warning, "⚠️  Warnings")] {
            let mut findings: Vec<_> = self.findings.iter().filter(|f| f.severity == severity).collect();
            if findings.is_empty() {
                continue;
            }
            findings.sort_by(|a, b| a.category.cmp(&b.category));
            println!("\n{} ({}):", title, findings.len());
            println!("{}", "─".repeat(60));
            for finding in findings {
                print_finding(finding);
            }
        }

        println!();
        println!("{}", "═".repeat(60));
        if self.findings.is_empty() {
            println!("✅ All checks passed!");
        } else {
            println!(
                "Summary: {} error(s), {} warning(s)",
                self.error_count(),
                self.warning_count()
            );
        }
    }
}

fn print_finding(finding: &CheckFinding) {
    let icon = match finding.severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
    };

    let location = match (&finding.file, &finding.location) {
        (Some(f), Some(l)) => format!(" [{}:{}]", f.display(), l),
        (Some(f), None) => format!(" [{}]", f.display()),
        (None, Some(l)) => format!(" [{}]", l),
        (None, None) => String::new(),
    };

    println!("  {} [{}]{}: {}", icon, finding.category, location, finding.message);
}

// ============================================================================
// Main Check Runner
// ============================================================================

/// Check profile documents and print a summary. Fails if any error was found.
pub fn run(files: &[PathBuf], registry: &ActionTypeRegistry) -> Result<()> {
    println!("🔍 Checking {} translation profile(s)...", files.len());

    let results = run_quiet(files, registry)?;
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!(
            "Profile check failed with {} error(s)",
            results.error_count()
        );
    }
    Ok(())
}

/// Run all checks without printing.
pub fn run_quiet(files: &[PathBuf], registry: &ActionTypeRegistry) -> Result<CheckResults> {
    let schema: JsonValue = serde_json::from_str(PROFILE_SCHEMA)?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("Failed to compile profile schema: {}", e))?;

    let mut results = CheckResults::default();
    let mut loaded = Vec::new();

    for path in files {
        let (findings, profile) = check_document(path, &validator, registry);
        results.extend(findings);
        if let Some(profile) = profile {
            results.extend(check_reachability(path, &profile));
            loaded.push((path.clone(), profile));
        }
    }

    results.extend(check_cross_file(&loaded));
    Ok(results)
}

// ============================================================================
// Check 1: Document validation
// ============================================================================

fn check_document(
    path: &Path,
    validator: &jsonschema::Validator,
    registry: &ActionTypeRegistry,
) -> (Vec<CheckFinding>, Option<TranslationProfile>) {
    let mut findings = Vec::new();

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            findings.push(CheckFinding::error("io", format!("Failed to read file: {}", e)).with_file(path));
            return (findings, None);
        }
    };

    let value: JsonValue = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            findings.push(CheckFinding::error("json", format!("Failed to parse JSON: {}", e)).with_file(path));
            return (findings, None);
        }
    };

    for error in validator.iter_errors(&value) {
        let instance_path = error.instance_path().to_string();
        let location = if instance_path.is_empty() {
            "(root)".to_string()
        } else {
            instance_path
        };
        findings.push(
            CheckFinding::error("json-schema", error.to_string())
                .with_file(path)
                .with_location(location),
        );
    }

    match TranslationProfile::from_json(&content, registry) {
        Ok(profile) => (findings, Some(profile)),
        Err(e) => {
            let mut finding = CheckFinding::error("profile", e.root().to_string()).with_file(path);
            if let Some(index) = e.rule_index() {
                finding = finding.with_location(format!("rules[{index}]"));
            }
            findings.push(finding);
            (findings, None)
        }
    }
}

// ============================================================================
// Check 2: Unreachable rules
// ============================================================================

fn check_reachability(path: &Path, profile: &TranslationProfile) -> Vec<CheckFinding> {
    let stop = match profile.profile_type() {
        ProfileType::Input => names::STOP_PROCESSING,
        ProfileType::Output => names::STOP_OUTPUT_PROCESSING,
    };
    let unconditional_stop = profile
        .rules()
        .iter()
        .position(|r| r.action().name() == stop && r.condition().source().trim() == "true");

    match unconditional_stop {
        Some(index) if index + 1 < profile.rules().len() => vec![
            CheckFinding::warning(
                "reachability",
                format!(
                    "{} rule(s) after an unconditional '{}' never run",
                    profile.rules().len() - index - 1,
                    stop
                ),
            )
            .with_file(path)
            .with_location(format!("rules[{}]", index + 1)),
        ],
        _ => Vec::new(),
    }
}

// ============================================================================
// Check 3: Cross-file consistency
// ============================================================================

fn check_cross_file(loaded: &[(PathBuf, TranslationProfile)]) -> Vec<CheckFinding> {
    let mut findings = Vec::new();
    let mut seen: HashMap<(ProfileType, &str), &Path> = HashMap::new();

    for (path, profile) in loaded {
        let key = (profile.profile_type(), profile.name());
        if let Some(first) = seen.insert(key, path.as_path()) {
            findings.push(
                CheckFinding::error(
                    "duplicate",
                    format!(
                        "{} profile '{}' is also defined in {}",
                        profile.profile_type(),
                        profile.name(),
                        first.display()
                    ),
                )
                .with_file(path),
            );
        }
    }

    let known: HashSet<(ProfileType, &str)> = seen.keys().copied().collect();
    for (path, profile) in loaded {
        for include in profile.included_profiles() {
            if !known.contains(&(profile.profile_type(), include)) {
                findings.push(
                    CheckFinding::warning(
                        "include",
                        format!(
                            "included profile '{}' is not among the checked files and must exist at runtime",
                            include
                        ),
                    )
                    .with_file(path),
                );
            }
        }
    }

    findings
}
