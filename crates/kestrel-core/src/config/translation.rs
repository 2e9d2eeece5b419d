//! Translation engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Maximum nesting of included profiles.
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,

    /// Replace rules that fail to instantiate during loading from storage
    /// with a no-op action instead of failing the whole profile.
    #[serde(default = "default_true")]
    pub lenient_rehydration: bool,

    /// Directory of read-only system profile documents (`*.json`).
    #[serde(default)]
    pub system_profiles_dir: Option<PathBuf>,
}

fn default_max_include_depth() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_include_depth: default_max_include_depth(),
            lenient_rehydration: true,
            system_profiles_dir: None,
        }
    }
}
