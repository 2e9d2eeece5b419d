//! In-memory store.

use crate::error::StoreError;
use crate::{NamedObjectStore, StoredObject};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Object map plus change tracking, shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct ObjectTable {
    pub(crate) objects: BTreeMap<String, StoredObject>,
    pub(crate) last_update: Option<DateTime<Utc>>,
}

impl ObjectTable {
    pub(crate) fn from_objects(objects: impl IntoIterator<Item = StoredObject>) -> Self {
        let objects: BTreeMap<_, _> = objects
            .into_iter()
            .map(|object| (object.name.clone(), object))
            .collect();
        let last_update = objects.values().map(|o| o.updated_at).max();
        Self {
            objects,
            last_update,
        }
    }

    pub(crate) fn get(&self, name: &str) -> Result<StoredObject, StoreError> {
        self.objects
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub(crate) fn insert(&mut self, name: &str, content: String) -> Result<(), StoreError> {
        if self.objects.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        let now = self.touch();
        self.objects.insert(
            name.to_string(),
            StoredObject {
                name: name.to_string(),
                content,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    pub(crate) fn update(&mut self, name: &str, content: String) -> Result<(), StoreError> {
        if !self.objects.contains_key(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let now = self.touch();
        if let Some(object) = self.objects.get_mut(name) {
            object.content = content;
            object.updated_at = now;
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, name: &str) -> Result<StoredObject, StoreError> {
        let removed = self
            .objects
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        self.touch();
        Ok(removed)
    }

    /// Advances the change timestamp; never moves backwards.
    fn touch(&mut self) -> DateTime<Utc> {
        let now = match self.last_update {
            Some(previous) if previous >= Utc::now() => previous + chrono::Duration::microseconds(1),
            _ => Utc::now(),
        };
        self.last_update = Some(now);
        now
    }
}

/// Volatile store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<ObjectTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NamedObjectStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<StoredObject, StoreError> {
        self.table.read().map_err(|_| StoreError::LockError)?.get(name)
    }

    async fn get_all(&self) -> Result<Vec<StoredObject>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::LockError)?;
        Ok(table.objects.values().cloned().collect())
    }

    async fn insert(&self, name: &str, content: String) -> Result<(), StoreError> {
        self.table
            .write()
            .map_err(|_| StoreError::LockError)?
            .insert(name, content)?;
        tracing::debug!(object = name, "inserted object");
        Ok(())
    }

    async fn update(&self, name: &str, content: String) -> Result<(), StoreError> {
        self.table
            .write()
            .map_err(|_| StoreError::LockError)?
            .update(name, content)?;
        tracing::debug!(object = name, "updated object");
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.table
            .write()
            .map_err(|_| StoreError::LockError)?
            .remove(name)?;
        tracing::debug!(object = name, "removed object");
        Ok(())
    }

    async fn last_update(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.table.read().map_err(|_| StoreError::LockError)?.last_update)
    }
}
