//! Profile store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where translation profiles are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory holding the file backend's data.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

/// Store backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Volatile, process-local store.
    Memory,
    /// JSON Lines file in `directory`.
    #[default]
    File,
}

fn default_directory() -> PathBuf {
    PathBuf::from("data/profiles")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            directory: default_directory(),
        }
    }
}
