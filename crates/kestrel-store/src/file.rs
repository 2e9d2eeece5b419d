//! File-based store.
//!
//! Objects live in a single JSON Lines file (`objects.jsonl`) inside the
//! configured directory, one [`StoredObject`] per line. The whole file is
//! loaded into memory on open and rewritten (via a temporary file and an
//! atomic rename) after every change.

use crate::error::StoreError;
use crate::memory::ObjectTable;
use crate::{NamedObjectStore, StoredObject};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const OBJECTS_FILE: &str = "objects.jsonl";

/// Persistent store in a directory.
pub struct FileStore {
    directory: PathBuf,
    table: RwLock<ObjectTable>,
}

impl FileStore {
    /// Open (or create) a store in `directory`, loading existing objects.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self, StoreError> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            fs::create_dir_all(&directory)?;
        }

        let objects = Self::load_from_file(&directory.join(OBJECTS_FILE))?;
        tracing::info!(
            directory = %directory.display(),
            "Loaded {} stored objects",
            objects.len()
        );

        Ok(Self {
            directory,
            table: RwLock::new(ObjectTable::from_objects(objects)),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn objects_path(&self) -> PathBuf {
        self.directory.join(OBJECTS_FILE)
    }

    fn load_from_file(path: &Path) -> Result<Vec<StoredObject>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(path)?);
        let mut objects = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<StoredObject>(line) {
                Ok(object) => objects.push(object),
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse stored object on line {} of {}: {}",
                        line_num + 1,
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok(objects)
    }

    fn rewrite_file(&self, table: &ObjectTable) -> Result<(), StoreError> {
        let path = self.objects_path();
        let tmp_path = path.with_extension("jsonl.tmp");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            for object in table.objects.values() {
                let json = serde_json::to_string(object)?;
                writeln!(file, "{}", json)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Applies `change` to a copy of the table and commits it only when the
    /// file was rewritten successfully.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut ObjectTable) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::LockError)?;
        let mut next = ObjectTable {
            objects: table.objects.clone(),
            last_update: table.last_update,
        };
        let result = change(&mut next)?;
        self.rewrite_file(&next)?;
        *table = next;
        Ok(result)
    }
}

#[async_trait]
impl NamedObjectStore for FileStore {
    async fn get(&self, name: &str) -> Result<StoredObject, StoreError> {
        self.table.read().map_err(|_| StoreError::LockError)?.get(name)
    }

    async fn get_all(&self) -> Result<Vec<StoredObject>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::LockError)?;
        Ok(table.objects.values().cloned().collect())
    }

    async fn insert(&self, name: &str, content: String) -> Result<(), StoreError> {
        self.mutate(|table| table.insert(name, content))?;
        tracing::debug!(object = name, "Stored new object");
        Ok(())
    }

    async fn update(&self, name: &str, content: String) -> Result<(), StoreError> {
        self.mutate(|table| table.update(name, content))?;
        tracing::debug!(object = name, "Updated object");
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.mutate(|table| table.remove(name))?;
        tracing::debug!(object = name, "Removed object");
        Ok(())
    }

    async fn last_update(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.table.read().map_err(|_| StoreError::LockError)?.last_update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::new(dir.path()).unwrap();
            store.insert("INPUT/a", r#"{"name":"a"}"#.to_string()).await.unwrap();
            store.insert("INPUT/b", r#"{"name":"b"}"#.to_string()).await.unwrap();
            store.update("INPUT/a", r#"{"name":"a2"}"#.to_string()).await.unwrap();
            store.remove("INPUT/b").await.unwrap();
        }

        let store = FileStore::new(dir.path()).unwrap();
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "INPUT/a");
        assert_eq!(all[0].content, r#"{"name":"a2"}"#);
        assert_eq!(store.last_update().await.unwrap(), Some(all[0].updated_at));
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::new(&nested).unwrap();
        store.insert("x", "1".to_string()).await.unwrap();
        assert!(nested.join(OBJECTS_FILE).exists());
        assert_eq!(store.directory(), nested.as_path());
    }

    #[tokio::test]
    async fn test_skips_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store.insert("good", "1".to_string()).await.unwrap();
        drop(store);

        let path = dir.path().join(OBJECTS_FILE);
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("{not json\n\n");
        fs::write(&path, content).unwrap();

        let store = FileStore::new(dir.path()).unwrap();
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "good");
    }

    #[tokio::test]
    async fn test_failed_change_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store.insert("a", "1".to_string()).await.unwrap();

        assert!(matches!(
            store.insert("a", "2".to_string()).await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert_eq!(store.get("a").await.unwrap().content, "1");

        let reopened = FileStore::new(dir.path()).unwrap();
        assert_eq!(reopened.get("a").await.unwrap().content, "1");
    }
}
