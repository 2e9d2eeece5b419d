//! # kestrel-store
//!
//! Persistence contract for named objects (translation profile documents)
//! plus two backends:
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`MemoryStore`] | process-local, lost on exit |
//! | [`FileStore`] | JSON Lines file (`objects.jsonl`) in a directory |
//!
//! Every object carries creation and update timestamps. The store-wide
//! [`NamedObjectStore::last_update`] lets callers detect changes made by
//! other writers and reload cached state.

pub mod error;
pub mod file;
pub mod memory;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kestrel_core::config::{StoreBackend, StoreConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A named object with its serialized content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CRUD over uniquely named objects.
#[async_trait]
pub trait NamedObjectStore: Send + Sync {
    /// Get an object by name.
    async fn get(&self, name: &str) -> Result<StoredObject, StoreError>;

    /// All objects, ordered by name.
    async fn get_all(&self) -> Result<Vec<StoredObject>, StoreError>;

    /// Insert a new object. Fails if the name is taken.
    async fn insert(&self, name: &str, content: String) -> Result<(), StoreError>;

    /// Replace an existing object's content.
    async fn update(&self, name: &str, content: String) -> Result<(), StoreError>;

    async fn remove(&self, name: &str) -> Result<(), StoreError>;

    /// Time of the most recent insert, update or removal.
    async fn last_update(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
}

/// Create a store backend based on configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn NamedObjectStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::File => Ok(Arc::new(FileStore::new(&config.directory)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_store_memory() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        };
        let store = create_store(&config).unwrap();
        store.insert("x", "1".to_string()).await.unwrap();
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_store_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::File,
            directory: dir.path().join("profiles"),
        };
        let store = create_store(&config).unwrap();
        store.insert("x", "1".to_string()).await.unwrap();
        assert!(dir.path().join("profiles").join("objects.jsonl").exists());
    }
}
