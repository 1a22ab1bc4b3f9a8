//! JSON file storage engine

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::entity::{EntityClass, Record};
use crate::domain::storage::{RecordMap, StorageEngine};
use crate::domain::DomainError;

/// Storage engine keeping every entity in one JSON document on disk.
///
/// The in-memory index is mutated directly by `new` and `delete`; `save`
/// writes the whole index out and `reload` replaces the index with the file
/// contents. Saves are serialized, so the file always holds the snapshot of
/// the last `save` to finish.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    objects: RwLock<RecordMap>,
    save_lock: Mutex<()>,
}

impl FileStorage {
    /// Creates an engine backed by `path`. Nothing is read until `reload`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            objects: RwLock::new(RecordMap::new()),
            save_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RecordMap>, DomainError> {
        self.objects
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RecordMap>, DomainError> {
        self.objects
            .write()
            .map_err(|e| DomainError::storage(format!("Failed to acquire write lock: {}", e)))
    }


    /// Reads and fully decodes the backing file; `None` when it does not exist
    async fn read_store(&self) -> Result<Option<RecordMap>, DomainError> {
        let path = self.path.display().to_string();

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DomainError::corrupt_store(&path, e.to_string())),
        };

        let document: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::corrupt_store(&path, e.to_string()))?;

        let mut objects = RecordMap::with_capacity(document.len());

        for (key, value) in document {
            let record = Record::from_dict(value)
                .map_err(|e| DomainError::corrupt_store(&path, format!("{}: {}", key, e)))?;

            if record.storage_key() != key {
                return Err(DomainError::corrupt_store(
                    &path,
                    format!("key '{}' does not match record {}", key, record.storage_key()),
                ));
            }

            objects.insert(key, record);
        }

        Ok(Some(objects))
    }
}

/// Writes `bytes` to a uniquely named sibling file and renames it over `path`,
/// so readers see either the old document or the new one
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), DomainError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_failed =
        |e: std::io::Error| DomainError::storage(format!("Failed to write {}: {}", path.display(), e));

    let mut temp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    temp.write_all(bytes).map_err(write_failed)?;
    temp.as_file().sync_all().map_err(write_failed)?;

    temp.persist(path).map_err(|e| {
        DomainError::storage(format!("Failed to replace {}: {}", path.display(), e))
    })?;
    Ok(())
}

#[async_trait]
impl StorageEngine for FileStorage {
    async fn all(&self, class: Option<EntityClass>) -> Result<RecordMap, DomainError> {
        let objects = self.read()?;

        Ok(objects
            .iter()
            .filter(|(_, record)| class.is_none_or(|c| record.class() == c))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect())
    }

    async fn new(&self, record: Record) -> Result<(), DomainError> {
        let key = record.storage_key();
        debug!(key = %key, "Registering entity");

        self.write()?.insert(key, record);
        Ok(())
    }

    async fn save(&self) -> Result<(), DomainError> {
        // Held across snapshot and rename so an older snapshot never lands last
        let _guard = self.save_lock.lock().await;

        let document = {
            let objects = self.read()?;
            let mut document = Map::with_capacity(objects.len());

            for (key, record) in objects.iter() {
                document.insert(key.clone(), record.to_dict()?);
            }
            document
        };

        let count = document.len();
        let bytes = serde_json::to_vec(&Value::Object(document))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| DomainError::storage(format!("Save task failed: {}", e)))??;

        info!(path = %self.path.display(), entities = count, "Saved file storage");
        Ok(())
    }

    async fn delete(&self, record: Option<&Record>) -> Result<(), DomainError> {
        let Some(record) = record else {
            return Ok(());
        };

        let key = record.storage_key();
        if self.write()?.remove(&key).is_some() {
            debug!(key = %key, "Removed entity");
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), DomainError> {
        match self.read_store().await? {
            Some(objects) => {
                info!(
                    path = %self.path.display(),
                    entities = objects.len(),
                    "Reloaded file storage"
                );
                *self.write()? = objects;
            }
            None => {
                debug!(path = %self.path.display(), "No storage file yet, nothing to reload");
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), DomainError> {
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Amenity, City, State, User};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn storage_in(dir: &TempDir) -> FileStorage {
        FileStorage::from_path(dir.path().join("file.json"))
    }

    #[tokio::test]
    async fn test_reload_without_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        storage.reload().await.unwrap();
        storage.reload().await.unwrap();
        assert!(storage.all(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();

        let user = User::new("poppy@holberton.com", "betty").with_name("Poppy", "Seed");
        let record = Record::from(user);
        storage.new(record.clone()).await.unwrap();
        storage.save().await.unwrap();

        let fresh = storage_in(&dir);
        fresh.reload().await.unwrap();
        let users = fresh.all(Some(EntityClass::User)).await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users.get(&record.storage_key()), Some(&record));
    }

    #[tokio::test]
    async fn test_new_is_visible_before_save() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();

        let record = Record::from(State::new("California"));
        storage.new(record.clone()).await.unwrap();

        let states = storage.all(Some(EntityClass::State)).await.unwrap();
        assert!(states.contains_key(&record.storage_key()));
    }

    #[tokio::test]
    async fn test_delete_removes_immediately_and_persists_on_save() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();

        let record = Record::from(Amenity::new("Wifi"));
        storage.new(record.clone()).await.unwrap();
        storage.save().await.unwrap();

        storage.delete(Some(&record)).await.unwrap();
        assert!(storage.all(None).await.unwrap().is_empty());

        storage.save().await.unwrap();
        storage.reload().await.unwrap();
        assert!(storage.all(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_none_is_noop() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();
        storage.new(State::new("Texas").into()).await.unwrap();

        storage.delete(None).await.unwrap();
        assert_eq!(storage.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reload_discards_unsaved_changes() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();

        let kept = Record::from(State::new("Oregon"));
        storage.new(kept.clone()).await.unwrap();
        storage.save().await.unwrap();

        storage.new(State::new("Nevada").into()).await.unwrap();
        storage.reload().await.unwrap();
        storage.reload().await.unwrap();

        let all = storage.all(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key(&kept.storage_key()));
    }

    #[tokio::test]
    async fn test_class_filter_and_unknown_class() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();

        let state = State::new("California");
        let state_id = state.base.id().to_string();
        storage.new(state.into()).await.unwrap();
        storage.new(City::new(&state_id, "San_Jose").into()).await.unwrap();
        storage.new(City::new(&state_id, "Fresno").into()).await.unwrap();

        assert_eq!(storage.count(Some(EntityClass::City)).await.unwrap(), 2);
        assert_eq!(storage.count(Some(EntityClass::State)).await.unwrap(), 1);
        assert_eq!(storage.count(None).await.unwrap(), 3);
        assert_eq!(storage.all_named("City").await.unwrap().len(), 2);

        let err = storage.all_named("NotARealClass").await.unwrap_err();
        assert!(matches!(err, DomainError::UnknownClass { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_reload_and_keeps_index() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();
        storage.new(State::new("Utah").into()).await.unwrap();

        std::fs::write(storage.path(), b"{ not json").unwrap();

        let err = storage.reload().await.unwrap_err();
        assert!(matches!(err, DomainError::CorruptStore { .. }));
        assert_eq!(storage.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_untagged_record_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        std::fs::write(
            storage.path(),
            br#"{"State.1": {"id": "1", "name": "Ohio"}}"#,
        )
        .unwrap();

        let err = storage.reload().await.unwrap_err();
        assert!(matches!(err, DomainError::CorruptStore { .. }));
    }

    #[tokio::test]
    async fn test_mismatched_key_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();

        let record = Record::from(State::new("Maine"));
        storage.new(record.clone()).await.unwrap();
        storage.save().await.unwrap();

        let contents = std::fs::read_to_string(storage.path()).unwrap();
        let tampered = contents.replace(&record.storage_key(), "City.other");
        std::fs::write(storage.path(), tampered).unwrap();

        assert!(storage.reload().await.is_err());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();
        storage.new(State::new("Idaho").into()).await.unwrap();
        storage.save().await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("file.json")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_keep_file_readable() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(storage_in(&dir));
        storage.reload().await.unwrap();

        for round in 0..20 {
            let tasks: Vec<_> = (0..8)
                .map(|n| {
                    let storage = Arc::clone(&storage);
                    tokio::spawn(async move {
                        let name = format!("State_{}_{}", round, n);
                        storage.new(State::new(name).into()).await?;
                        storage.save().await
                    })
                })
                .collect();

            for task in tasks {
                task.await.unwrap().unwrap();
            }

            let fresh = storage_in(&dir);
            fresh.reload().await.unwrap();
            assert_eq!(fresh.count(None).await.unwrap(), (round + 1) * 8);
        }
    }

    #[tokio::test]
    async fn test_close_keeps_saved_and_drops_unsaved() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.reload().await.unwrap();

        storage.new(State::new("Iowa").into()).await.unwrap();
        storage.save().await.unwrap();
        storage.new(State::new("Kansas").into()).await.unwrap();

        storage.close().await.unwrap();
        assert_eq!(storage.count(None).await.unwrap(), 1);
    }
}
